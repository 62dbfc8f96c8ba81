use crate::speedtest::tests::Direction;
use serde::Serialize;
use std::time::Duration;

/// Aggregate outcome of one bandwidth test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementResult {
    pub direction: Direction,
    pub bytes: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub planned: usize,
    pub started: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl MeasurementResult {
    pub fn new(direction: Direction, planned: usize) -> Self {
        Self {
            direction,
            bytes: 0,
            duration: Duration::ZERO,
            planned,
            started: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub fn bytes_per_second(&self) -> f64 {
        bytes_per_second(self.bytes, self.duration)
    }

    pub fn megabits_per_second(&self) -> f64 {
        calculate_speed_mbps(self.bytes_per_second())
    }
}

/// Transfer rate, zero when nothing was timed.
pub fn bytes_per_second(bytes: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds <= 0.0 {
        return 0.0;
    }

    bytes as f64 / seconds
}

pub fn calculate_speed_mbps(bytes_per_second: f64) -> f64 {
    bytes_per_second * 8.0 / 1_000_000.0
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
