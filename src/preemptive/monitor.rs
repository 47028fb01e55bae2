//! The preemptive flavour's Monitor loop: a dedicated OS thread polling
//! [`crate::core::classify`] every `check_interval`.

use std::sync::atomic::Ordering;
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;

use crate::core::{classify, Action};

use super::driver::Driver;
use super::pool::{del_conn, put_idle_unchecked, try_lock, Shared};
use super::worker::Worker;

/// Spawns the Monitor thread: a forever loop holding only a weak
/// back-reference to the pool, so a dropped `Pool` lets the loop exit
/// instead of pinning it alive.
pub(crate) fn spawn<D: Driver>(shared: Arc<Shared<D>>) -> Worker {
    let weak = Arc::downgrade(&shared);
    drop(shared);

    Worker::spawn("monitor", move |stop_flag: Arc<AtomicBool>| loop {
        let shared = match weak.upgrade() {
            Some(shared) => shared,
            None => return,
        };
        tick(&shared);
        let check_interval = shared.check_interval;
        let name = shared.name.clone();
        drop(shared);

        if sleep_or_stop(check_interval, &stop_flag) {
            tracing::debug!(pool = %name, "monitor stopping");
            return;
        }
    })
}

/// Sleeps in small increments so `stop` is observed promptly instead of
/// after a full `check_interval`. Returns `true` if stop was observed.
fn sleep_or_stop(total: std::time::Duration, stop_flag: &AtomicBool) -> bool {
    const STEP: std::time::Duration = std::time::Duration::from_millis(50);
    let mut remaining = total;
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            return true;
        }
        if remaining.is_zero() {
            return false;
        }
        let step = remaining.min(STEP);
        thread::sleep(step);
        remaining -= step;
    }
}

/// One Monitor tick: snapshot the idle deque and classify each connection.
///
/// Per spec §4.3 step 2, this only acts when the lock is free for the
/// taking — a held lock means an acquirer or another tick is mid-mutation,
/// so this tick backs off and tries again on the next `check_interval`
/// rather than blocking the Monitor thread on a `ReentrantMutex::lock()`.
fn tick<D: Driver>(shared: &Arc<Shared<D>>) {
    let guard = match try_lock(shared) {
        Some(guard) => guard,
        None => {
            tracing::debug!(pool = %shared.name, "monitor: lock busy, skipping this tick");
            return;
        }
    };
    let mut state = guard.borrow_mut();
    if !(state.opened && state.size > 0) {
        return;
    }

    let snapshot_len = state.idle.len();
    for _ in 0..snapshot_len {
        let conn = match state.idle.pop_front() {
            Some(conn) => conn,
            None => break,
        };

        match classify(&conn, state.size, shared.max_size) {
            Action::EvictUnhealthy => {
                tracing::debug!(conn = %conn.name(), pool = %shared.name, "monitor: evicting unhealthy connection");
                del_conn(shared, &mut state, conn, "unhealthy");
            }
            Action::EvictOverCapacity => {
                tracing::warn!(
                    conn = %conn.name(),
                    pool = %shared.name,
                    size = state.size,
                    max_size = shared.max_size,
                    "monitor: evicting over-capacity connection"
                );
                del_conn(shared, &mut state, conn, "over-capacity");
            }
            Action::Renew => {
                let mut conn = conn;
                conn.renew_expire_at();
                tracing::debug!(conn = %conn.name(), pool = %shared.name, "monitor: renewed expiry");
                put_idle_unchecked(&mut state, conn);
            }
            Action::Readmit => {
                put_idle_unchecked(&mut state, conn);
            }
        }
    }
}
