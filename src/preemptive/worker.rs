//! `Worker`: a spawned background OS thread with stop+join semantics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

static WORKER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Upper bound `finish` waits for the worker body to observe `stop` and send
/// its completion signal before joining unconditionally.
const FINISH_GRACE: Duration = Duration::from_secs(2);

/// Owns one spawned background OS thread.
///
/// `stop` is safe to call multiple times and from outside the worker; the
/// spawned body is expected to poll the `AtomicBool` at its blocking-sleep
/// boundaries and return promptly once it is set.
pub struct Worker {
    name: String,
    stop_flag: Arc<AtomicBool>,
    done_rx: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns `body(stop_flag)` onto a new daemon-style OS thread.
    pub fn spawn<F>(label: &str, body: F) -> Worker
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let n = WORKER_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("Worker-{n}-{label}");
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        tracing::debug!(worker = %name, "starting");
        let flag = stop_flag.clone();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                body(flag);
                let _ = done_tx.send(());
            })
            .expect("failed to spawn pool worker thread");

        Worker {
            name,
            stop_flag,
            done_rx,
            handle: Some(handle),
        }
    }

    /// The worker's stable, log-correlatable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals cooperative termination. Idempotent.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Signals termination, then joins, with a bounded wait for the body to
    /// notice `stop` before falling back to a blocking join.
    pub fn finish(mut self) {
        tracing::debug!(worker = %self.name, "finishing");
        self.stop();
        let _ = self.done_rx.recv_timeout(FINISH_GRACE);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("name", &self.name).finish()
    }
}
