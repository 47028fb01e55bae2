//! `Worker`: a spawned background `tokio` task with stop+join semantics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

static WORKER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Owns one spawned background task.
///
/// `stop` is safe to call multiple times and from outside the worker; the
/// spawned body is expected to watch `stop_signal.notified()` at its
/// suspension points (sleeps, lock waits) and return promptly once woken.
pub struct Worker {
    name: String,
    stop_signal: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns `body(stop_signal)` onto the ambient tokio runtime.
    pub fn spawn<F, Fut>(label: &str, body: F) -> Worker
    where
        F: FnOnce(Arc<Notify>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let n = WORKER_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("Worker-{n}-{label}");
        let stop_signal = Arc::new(Notify::new());
        tracing::debug!(worker = %name, "starting");
        let handle = tokio::spawn(body(stop_signal.clone()));
        Worker {
            name,
            stop_signal,
            handle: Some(handle),
        }
    }

    /// The worker's stable, log-correlatable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals cooperative termination. Idempotent; callable any number of
    /// times, including after the worker has already finished.
    pub fn stop(&self) {
        self.stop_signal.notify_waiters();
    }

    /// Signals termination, then awaits completion.
    ///
    /// Gives the task a short grace period to observe the stop signal at its
    /// next suspension point; if it hasn't exited by then the task is
    /// aborted, and the resulting cancellation is silently absorbed.
    pub async fn finish(mut self) {
        tracing::debug!(worker = %self.name, "finishing");
        self.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("name", &self.name).finish()
    }
}
