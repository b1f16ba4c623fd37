pub mod collector;
pub mod exposition;
pub mod live;
pub mod table;

use std::time::Duration;

pub use collector::{EndpointStats, StatsCollector};
pub use exposition::DurationSummary;

/// Status label recorded when the request never produced a response.
pub const TRANSPORT_ERROR_STATUS: &str = "500";

/// A single request outcome produced by a worker.
/// Workers create these and push them into both metric sinks.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Full target URL, e.g. "http://localhost:8000/health"
    pub endpoint: String,
    /// Response status code as text, or `TRANSPORT_ERROR_STATUS`
    pub status: String,
    /// Wall time from just before send to body fully drained
    pub duration: Duration,
    /// true iff the status was in [200, 300)
    pub success: bool,
}

impl Sample {
    /// Build a sample from a received status code.
    pub fn from_status(endpoint: impl Into<String>, status: u16, duration: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: status.to_string(),
            duration,
            success: (200..300).contains(&status),
        }
    }

    /// Build a sample for a request that failed before a response arrived.
    pub fn transport_error(endpoint: impl Into<String>, duration: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: TRANSPORT_ERROR_STATUS.into(),
            duration,
            success: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_range_decides_success() {
        let d = Duration::from_millis(3);
        assert!(Sample::from_status("u", 200, d).success);
        assert!(Sample::from_status("u", 299, d).success);
        assert!(!Sample::from_status("u", 199, d).success);
        assert!(!Sample::from_status("u", 300, d).success);
        assert!(!Sample::from_status("u", 503, d).success);
    }

    #[test]
    fn transport_error_uses_sentinel_status() {
        let s = Sample::transport_error("u", Duration::ZERO);
        assert_eq!(s.status, TRANSPORT_ERROR_STATUS);
        assert!(!s.success);
    }
}
