//! Result data structures for speed test output.
//!
//! Everything here implements Serialize for `--json` output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::measurements::MeasurementResult;
use crate::speedtest::requests::config::ClientConfig;
use crate::speedtest::servers::Server;

/// Complete results from a speed test run.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedTestResults {
    /// Timestamp when the test was completed
    pub timestamp: DateTime<Utc>,
    /// The tester as seen by speedtest.net
    pub client: ClientSummary,
    /// Server the test ran against
    pub server: ServerSummary,
    pub download: BandwidthResults,
    pub upload: BandwidthResults,
}

impl SpeedTestResults {
    pub fn new(
        client: ClientSummary,
        server: ServerSummary,
        download: BandwidthResults,
        upload: BandwidthResults,
    ) -> Self {
        Self { timestamp: Utc::now(), client, server, download, upload }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub ip: String,
    pub isp: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&ClientConfig> for ClientSummary {
    fn from(client: &ClientConfig) -> Self {
        Self {
            ip: client.ip.clone(),
            isp: client.isp.clone(),
            country: client.country.clone(),
            latitude: client.latitude,
            longitude: client.longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerSummary {
    pub id: u64,
    pub sponsor: String,
    pub name: String,
    pub country: String,
    pub host: Option<String>,
    pub distance_km: f64,
    /// Best observed round trip, if the server was probed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

impl From<&Server> for ServerSummary {
    fn from(server: &Server) -> Self {
        Self {
            id: server.id,
            sponsor: server.sponsor.clone(),
            name: server.name.clone(),
            country: server.country.clone(),
            host: server.host.clone(),
            distance_km: server.distance_km,
            latency_ms: server.latency.map(|l| l.as_secs_f64() * 1000.0),
        }
    }
}

/// Bandwidth for one direction.
#[derive(Debug, Clone, Serialize)]
pub struct BandwidthResults {
    pub speed_mbps: f64,
    pub bytes: u64,
    pub duration_ms: f64,
    pub jobs_planned: usize,
    pub jobs_started: usize,
    pub jobs_failed: usize,
}

impl From<&MeasurementResult> for BandwidthResults {
    fn from(result: &MeasurementResult) -> Self {
        Self {
            speed_mbps: result.megabits_per_second(),
            bytes: result.bytes,
            duration_ms: result.duration.as_secs_f64() * 1000.0,
            jobs_planned: result.planned,
            jobs_started: result.started,
            jobs_failed: result.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedtest::servers::tests::server;
    use crate::speedtest::tests::Direction;
    use std::time::Duration;

    fn measurement(direction: Direction, bytes: u64, seconds: u64) -> MeasurementResult {
        let mut result = MeasurementResult::new(direction, 50);
        result.bytes = bytes;
        result.duration = Duration::from_secs(seconds);
        result.started = 48;
        result.failed = 1;
        result
    }

    #[test]
    fn test_bandwidth_results_from_measurement() {
        let bandwidth =
            BandwidthResults::from(&measurement(Direction::Download, 125_000_000, 10));

        assert_eq!(bandwidth.speed_mbps, 100.0);
        assert_eq!(bandwidth.duration_ms, 10_000.0);
        assert_eq!(bandwidth.jobs_started, 48);
        assert_eq!(bandwidth.jobs_failed, 1);
    }

    #[test]
    fn test_server_summary_latency() {
        let mut target = server(7, 12.5);
        assert_eq!(ServerSummary::from(&target).latency_ms, None);

        target.latency = Some(Duration::from_micros(23_500));
        assert_eq!(ServerSummary::from(&target).latency_ms, Some(23.5));
    }

    #[test]
    fn test_speed_test_results_serialization() {
        let client = ClientSummary {
            ip: "203.0.113.7".to_string(),
            isp: "Example Telecom".to_string(),
            country: "DE".to_string(),
            latitude: 52.52,
            longitude: 13.405,
        };
        let results = SpeedTestResults::new(
            client,
            ServerSummary::from(&server(7, 12.5)),
            BandwidthResults::from(&measurement(Direction::Download, 125_000_000, 10)),
            BandwidthResults::from(&measurement(Direction::Upload, 12_500_000, 10)),
        );

        let json = serde_json::to_value(&results).unwrap();

        assert!(json["timestamp"].is_string());
        assert_eq!(json["client"]["isp"], "Example Telecom");
        assert_eq!(json["server"]["id"], 7);
        assert!(json["server"].get("latency_ms").is_none());
        assert_eq!(json["download"]["speed_mbps"], 100.0);
        assert_eq!(json["upload"]["speed_mbps"], 10.0);
    }
}
