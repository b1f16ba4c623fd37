use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use super::request::RequestExecutor;

/// Consumer side of the work queue, shared by every worker.
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Grow-only set of virtual clients pulling URLs from one queue.
pub struct WorkerPool {
    queue: SharedQueue,
    executor: Arc<RequestExecutor>,
    handles: Vec<JoinHandle<()>>,
    count: watch::Sender<usize>,
}

impl WorkerPool {
    pub fn new(queue: mpsc::Receiver<String>, executor: Arc<RequestExecutor>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(queue)),
            executor,
            handles: Vec::new(),
            count: watch::Sender::new(0),
        }
    }

    /// Observe the worker count; notified only when it changes.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    /// Number of workers spawned so far (never decreases).
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Spawn workers until `target` exist. Returns how many were added.
    pub fn grow_to(&mut self, target: usize) -> usize {
        let added = target.saturating_sub(self.handles.len());
        for _ in 0..added {
            let id = self.handles.len();
            let queue = self.queue.clone();
            let executor = self.executor.clone();
            self.handles.push(tokio::spawn(async move {
                worker(id, queue, executor).await;
            }));
        }

        let len = self.handles.len();
        self.count.send_if_modified(|n| {
            let changed = *n != len;
            *n = len;
            changed
        });
        added
    }

    /// Wait up to `grace` for every worker, then abort the stragglers.
    /// Workers only exit on their own once the queue is closed (all
    /// senders dropped) and drained. Returns how many were aborted.
    pub async fn join_within(mut self, grace: Duration) -> usize {
        let joined = tokio::time::timeout(grace, async {
            for h in self.handles.iter_mut() {
                // A panicked worker is already gone; keep joining the rest
                let _ = h.await;
            }
        })
        .await;

        if joined.is_ok() {
            return 0;
        }
        self.abort_all()
    }

    /// Abort every worker that is still running. Their in-flight
    /// requests are dropped unrecorded.
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        for h in self.handles.iter().filter(|h| !h.is_finished()) {
            h.abort();
            aborted += 1;
        }
        aborted
    }
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: usize, queue: SharedQueue, executor: Arc<RequestExecutor>) {
    loop {
        // Only the receive happens under the lock; the request runs unlocked
        let next = queue.lock().await.recv().await;
        let Some(url) = next else {
            break;
        };
        executor.execute(&url).await;
    }
    debug!(worker = id, "queue closed, worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{executor_for_tests, spawn_hanging_target, spawn_target};

    #[tokio::test]
    async fn grow_to_never_shrinks() {
        let (_tx, rx) = mpsc::channel(4);
        let mut pool = WorkerPool::new(rx, executor_for_tests());

        assert!(pool.is_empty());
        assert_eq!(pool.grow_to(3), 3);
        assert_eq!(pool.grow_to(1), 0);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.grow_to(5), 2);
        assert_eq!(pool.len(), 5);
    }

    #[tokio::test]
    async fn join_waits_for_a_bounded_batch() {
        let base = spawn_target().await;
        let executor = executor_for_tests();
        let stats = executor.stats().clone();

        let (tx, rx) = mpsc::channel(8);
        let mut pool = WorkerPool::new(rx, executor);
        pool.grow_to(4);

        for i in 0..30 {
            let path = if i % 3 == 0 { "fail" } else { "health" };
            tx.send(format!("{base}/{path}")).await.unwrap();
        }
        drop(tx);
        assert_eq!(pool.join_within(Duration::from_secs(5)).await, 0);

        let snap = stats.snapshot();
        let total: u64 = snap.values().map(|s| s.total_requests).sum();
        assert_eq!(total, 30);
        assert_eq!(snap[&format!("{base}/fail")].error_requests, 10);
        assert_eq!(snap[&format!("{base}/health")].success_requests, 20);
    }

    #[tokio::test]
    async fn stuck_workers_are_aborted_after_grace() {
        let base = spawn_hanging_target().await;
        let (tx, rx) = mpsc::channel(4);
        let mut pool = WorkerPool::new(rx, executor_for_tests());
        pool.grow_to(2);

        tx.send(format!("{base}/health")).await.unwrap();
        tx.send(format!("{base}/health")).await.unwrap();
        drop(tx);

        let aborted = tokio::time::timeout(
            Duration::from_secs(5),
            pool.join_within(Duration::from_millis(200)),
        )
        .await
        .expect("join_within ignored its grace period");
        assert_eq!(aborted, 2);
    }

    #[tokio::test]
    async fn subscribers_see_only_changes() {
        let (_tx, rx) = mpsc::channel(1);
        let mut pool = WorkerPool::new(rx, executor_for_tests());
        let mut count = pool.subscribe();

        pool.grow_to(0);
        assert!(!count.has_changed().unwrap());

        pool.grow_to(2);
        assert!(count.has_changed().unwrap());
        assert_eq!(*count.borrow_and_update(), 2);

        pool.grow_to(1);
        assert!(!count.has_changed().unwrap());
    }
}
