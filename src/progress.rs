//! Progress events emitted by the throughput engine.

use crate::speedtest::tests::Direction;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    PhaseStarted(Direction),
    /// A transfer job was admitted and is about to run.
    TransferStarted(Direction),
    PhaseComplete(Direction),
}

/// Callback interface for progress updates.
///
/// Called from worker tasks, so implementations must be cheap and must not
/// block.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _event: ProgressEvent) {}
}

/// Prints a dot per started transfer on stdout.
pub struct Dots;

impl ProgressCallback for Dots {
    fn on_progress(&self, event: ProgressEvent) {
        let mut stdout = io::stdout().lock();

        // Progress output is best effort.
        let _ = match event {
            ProgressEvent::PhaseStarted(direction) => {
                write!(stdout, "Testing {} speed: ", direction)
            }
            ProgressEvent::TransferStarted(_) => write!(stdout, "."),
            ProgressEvent::PhaseComplete(_) => writeln!(stdout),
        };
        let _ = stdout.flush();
    }
}
