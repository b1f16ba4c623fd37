use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::warn;

use crate::metrics::{DurationSummary, Sample, StatsCollector};

/// Performs one timed GET per work item and feeds both metric sinks.
///
/// Shared by every worker; `reqwest::Client` pools connections internally.
pub struct RequestExecutor {
    client: reqwest::Client,
    stats: Arc<StatsCollector>,
    durations: Arc<DurationSummary>,
    /// Upper bound of the pre-request desynchronisation sleep
    max_jitter: Duration,
}

impl RequestExecutor {
    pub fn new(
        client: reqwest::Client,
        stats: Arc<StatsCollector>,
        durations: Arc<DurationSummary>,
        max_jitter: Duration,
    ) -> Self {
        Self {
            client,
            stats,
            durations,
            max_jitter,
        }
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Sleep a random jitter, send the request, record the outcome.
    /// Errors never leave this function.
    pub async fn execute(&self, url: &str) -> Sample {
        tokio::time::sleep(random_below(self.max_jitter)).await;

        let t0 = Instant::now();
        let sample = match self.fetch(url).await {
            Ok(status) => Sample::from_status(url, status, t0.elapsed()),
            Err(e) => {
                let elapsed = t0.elapsed();
                warn!(url, error = %e, "request failed");
                Sample::transport_error(url, elapsed)
            }
        };

        self.stats.record(&sample);
        self.durations
            .record(&sample.endpoint, &sample.status, sample.duration);
        sample
    }

    /// GET and drain the body so the connection goes back to the pool.
    async fn fetch(&self, url: &str) -> Result<u16, reqwest::Error> {
        let res = self.client.get(url).send().await?;
        let status = res.status().as_u16();
        res.bytes().await?;
        Ok(status)
    }
}

/// Uniform duration in `[0, max)`, zero when `max` is zero.
pub(crate) fn random_below(max: Duration) -> Duration {
    let nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}
