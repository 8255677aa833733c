//! Deferred work that must outlive the response it came from.
//!
//! A response is returned as soon as its headers are ready; work spawned
//! here (streaming a body while keeping a copy for the edge cache) keeps
//! running after that. The server drains this set before it exits.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct DeferredTasks {
    tracker: TaskTracker,
    /// Tasks not yet finished. Kept apart from the tracker so that waiting
    /// for idleness never touches its open/closed state.
    running: Arc<watch::Sender<usize>>,
}

/// Counts a task as finished when dropped, even if it panicked.
struct Running(Arc<watch::Sender<usize>>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n -= 1);
    }
}

impl Default for DeferredTasks {
    fn default() -> Self {
        Self {
            tracker: TaskTracker::new(),
            running: Arc::new(watch::Sender::new(0)),
        }
    }
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` detached from the caller. `kind` labels the task in logs.
    pub fn spawn<F>(&self, kind: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let span = tracing::debug_span!("deferred", kind);
        self.running.send_modify(|n| *n += 1);
        let running = Running(self.running.clone());
        self.tracker.spawn(
            async move {
                let _running = running;
                task.await;
            }
            .instrument(span),
        );
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished. New tasks may be
    /// spawned afterwards.
    pub async fn wait_idle(&self) {
        let mut running = self.running.subscribe();
        // the sender lives in self, so this cannot fail
        let _ = running.wait_for(|n| *n == 0).await;
    }

    /// Wait for pending tasks for at most `grace`. Returns false if some were
    /// still running when the grace period ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        let pending = self.pending();
        if pending > 0 {
            tracing::info!(pending, grace = ?grace, "Draining deferred tasks");
        }
        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(pending = self.pending(), "Deferred tasks still running after grace period");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_task_finishes_after_caller_returns() {
        let tasks = DeferredTasks::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = done.clone();
        tasks.spawn("test", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert!(!done.load(Ordering::SeqCst));

        tasks.wait_idle().await;
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let tasks = DeferredTasks::new();
        tasks.spawn("stuck", std::future::pending());
        assert!(!tasks.drain(Duration::from_millis(20)).await);

        let quick = DeferredTasks::new();
        quick.spawn("quick", async {});
        assert!(quick.drain(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_wait_idle_leaves_drain_closed() {
        let tasks = DeferredTasks::new();
        tasks.spawn("slow", tokio::time::sleep(Duration::from_millis(50)));

        let (drained, ()) = tokio::join!(tasks.drain(Duration::from_secs(1)), tasks.wait_idle());
        assert!(drained);
        assert!(tasks.tracker.is_closed());
        assert_eq!(tasks.pending(), 0);
    }
}
