use crate::speedtest::error::TransportError;
use crate::speedtest::servers::Server;
use crate::speedtest::transport::Transport;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => f.write_str("download"),
            Direction::Upload => f.write_str("upload"),
        }
    }
}

/// One planned transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub url: String,
    /// Payload size for uploads, nominal image size for downloads.
    pub size: u64,
}

/// Wall-clock budget shared by every job of one run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self { started: Instant::now(), budget }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() > self.budget
    }
}

/// A bandwidth test direction.
///
/// `jobs` plans the workload against a server, `run` performs one job and
/// reports how many bytes it moved.
#[async_trait]
pub trait Transfer: Send + Sync {
    fn direction(&self) -> Direction;

    fn jobs(&self, server: &Server) -> Vec<TransferJob>;

    async fn run(
        &self,
        transport: &dyn Transport,
        job: &TransferJob,
        deadline: Deadline,
    ) -> Result<u64, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Download.to_string(), "download");
        assert_eq!(Direction::Upload.to_string(), "upload");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let deadline = Deadline::start(Duration::from_secs(1));
        assert!(!deadline.expired());

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(deadline.expired());
        assert!(deadline.elapsed() >= Duration::from_secs(1));
    }
}
