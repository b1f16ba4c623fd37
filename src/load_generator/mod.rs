pub mod pool;
pub mod request;

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pool::WorkerPool;
use request::{random_below, RequestExecutor};

/// Paths hit on the target, one chosen uniformly per work item.
pub const TARGET_PATHS: &[&str] = &["/health", "/api/devices", "/api/images"];

/// Absolute URLs for every entry in `TARGET_PATHS`.
pub fn target_endpoints(base_url: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    TARGET_PATHS.iter().map(|p| format!("{base}{p}")).collect()
}

// ─── Configuration ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RampConfig {
    /// Worker count reached at the final step
    pub max_clients: usize,
    /// Sleep between ramp steps
    pub scale_interval: Duration,
    /// Upper bound of the random sleep between two enqueues
    pub random_sleep: Duration,
    /// How long shutdown waits for workers before aborting them
    pub drain_grace: Duration,
}

impl RampConfig {
    /// Work queue capacity: two slots per client at full ramp.
    pub fn queue_capacity(&self) -> usize {
        (self.max_clients * 2).max(1)
    }
}

// ─── Ramp controller ─────────────────────────────────────────────

/// Grows the worker pool one client per step and keeps the queue fed.
///
/// Enqueueing blocks while the queue is full, which is the only
/// backpressure: slow workers slow the ramp down. Every wait is raced
/// against `cancel`. Cancellation closes the queue and joins the pool,
/// aborting workers still busy after `drain_grace`.
pub struct RampController {
    config: RampConfig,
    endpoints: Vec<String>,
    queue: mpsc::Sender<String>,
    pool: WorkerPool,
    rng: StdRng,
    cancel: CancellationToken,
}

impl RampController {
    pub fn new(
        config: RampConfig,
        endpoints: Vec<String>,
        executor: Arc<RequestExecutor>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity());
        Self {
            config,
            endpoints,
            queue: tx,
            pool: WorkerPool::new(rx, executor),
            rng: StdRng::from_entropy(),
            cancel,
        }
    }

    pub fn active_workers(&self) -> usize {
        self.pool.len()
    }

    /// Live worker count, updated at every ramp step that adds workers.
    pub fn worker_count(&self) -> watch::Receiver<usize> {
        self.pool.subscribe()
    }

    /// Ramp from 0 to `max_clients`, then sustain until cancelled.
    /// Returns the number of workers that were running.
    pub async fn run(mut self) -> usize {
        let max = self.config.max_clients;

        for step in 0..=max {
            if step == max {
                self.pool.grow_to(step);
                info!(workers = self.pool.len(), "ramp complete, sustaining load");
                self.sustain().await;
                break;
            }

            if !self.advance(step).await {
                break;
            }
            if !self.pause(self.config.scale_interval).await {
                break;
            }
        }

        self.shutdown().await
    }

    /// One ramp step: exactly `step` workers, `step` new work items.
    /// Returns false once cancelled.
    pub async fn advance(&mut self, step: usize) -> bool {
        let added = self.pool.grow_to(step);
        debug!(step, added, workers = self.pool.len(), "ramp step");

        for _ in 0..step {
            if !self.enqueue_random().await {
                return false;
            }
            if !self.pause(random_below(self.config.random_sleep)).await {
                return false;
            }
        }
        true
    }

    /// Steady load: one item per random sleep, until cancelled.
    pub async fn sustain(&mut self) {
        while self.enqueue_random().await {
            if !self.pause(random_below(self.config.random_sleep)).await {
                break;
            }
        }
    }

    async fn enqueue_random(&mut self) -> bool {
        let Some(url) = self.endpoints.choose(&mut self.rng).cloned() else {
            return false;
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.queue.send(url) => sent.is_ok(),
        }
    }

    async fn pause(&self, d: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(d) => true,
        }
    }

    /// Close the queue and give workers `drain_grace` to empty it.
    async fn shutdown(self) -> usize {
        let Self {
            config, queue, pool, ..
        } = self;
        drop(queue);

        let workers = pool.len();
        info!(
            workers,
            grace_ms = config.drain_grace.as_millis() as u64,
            "stopping, draining queued requests"
        );
        let aborted = pool.join_within(config.drain_grace).await;
        if aborted > 0 {
            warn!(aborted, "workers still busy after grace period, aborted");
        }
        workers
    }
}
