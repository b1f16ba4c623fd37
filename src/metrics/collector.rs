use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use super::Sample;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe per-endpoint statistics store.
/// Workers call `record()`, the live table and summary call `snapshot()`.
pub struct StatsCollector {
    inner: Mutex<HashMap<String, EndpointStats>>,
}

/// Aggregated counters for one endpoint key.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointStats {
    pub endpoint: String,
    pub total_requests: u64,
    pub success_requests: u64,
    pub error_requests: u64,
    pub min_time: Duration,
    pub max_time: Duration,
    pub total_time: Duration,
    pub last_response: DateTime<Local>,
}

// ─── EndpointStats impl ──────────────────────────────────────────

impl EndpointStats {
    /// A bucket only comes into existence with its first observation.
    fn first(endpoint: &str, duration: Duration) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            total_requests: 0,
            success_requests: 0,
            error_requests: 0,
            min_time: duration,
            max_time: duration,
            total_time: Duration::ZERO,
            last_response: Local::now(),
        }
    }

    fn observe(&mut self, duration: Duration, success: bool) {
        self.total_requests += 1;
        self.total_time += duration;
        self.last_response = Local::now();

        if success {
            self.success_requests += 1;
        } else {
            self.error_requests += 1;
        }

        self.min_time = self.min_time.min(duration);
        self.max_time = self.max_time.max(duration);
    }

    /// Mean duration, zero when nothing was recorded.
    pub fn avg_time(&self) -> Duration {
        if self.total_requests == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / u128::from(self.total_requests);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Percentage of successful requests, 0 when the bucket is empty.
    pub fn success_rate(&self) -> f64 {
        percentage(self.success_requests, self.total_requests)
    }
}

pub(crate) fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

// ─── StatsCollector impl ─────────────────────────────────────────

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Record a single request outcome. Called from every worker.
    pub fn record(&self, sample: &Sample) {
        self.record_request(&sample.endpoint, sample.duration, sample.success);
    }

    pub fn record_request(&self, endpoint: &str, duration: Duration, success: bool) {
        let mut map = self.inner.lock();
        map.entry(endpoint.to_owned())
            .or_insert_with(|| EndpointStats::first(endpoint, duration))
            .observe(duration, success);
    }

    /// Deep copy of every bucket, sorted by endpoint key.
    /// The lock is released before the caller starts formatting.
    pub fn snapshot(&self) -> BTreeMap<String, EndpointStats> {
        let map = self.inner.lock();
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
