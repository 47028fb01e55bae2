//! The cooperative flavour's Monitor loop: a `tokio` task polling
//! [`crate::core::classify`] every `check_interval`.

use std::sync::Arc;

use tokio::time::sleep;

use crate::core::{classify, Action};

use super::driver::Driver;
use super::pool::{del_conn, put_idle_unchecked, Shared};
use super::worker::Worker;

/// Spawns the Monitor task: a forever loop holding only a weak back-reference
/// to the pool, so a dropped `Pool` lets the loop exit instead of pinning it
/// in memory.
pub(crate) fn spawn<D: Driver>(shared: Arc<Shared<D>>) -> Worker {
    let weak = Arc::downgrade(&shared);
    drop(shared);

    Worker::spawn("monitor", move |stop_signal| async move {
        loop {
            let shared = match weak.upgrade() {
                Some(shared) => shared,
                None => return,
            };
            tick(&shared).await;
            let check_interval = shared.check_interval;
            let name = shared.name.clone();
            drop(shared);

            tokio::select! {
                _ = stop_signal.notified() => {
                    tracing::debug!(pool = %name, "monitor stopping");
                    return;
                }
                _ = sleep(check_interval) => {}
            }
        }
    })
}

/// One Monitor tick: snapshot the idle deque and classify each connection.
///
/// Per spec §4.3 step 2, this only acts when the lock is free for the
/// taking — a held lock means an acquirer or another tick is mid-mutation,
/// so this tick backs off and tries again on the next `check_interval`
/// rather than blocking the whole Monitor loop on it.
async fn tick<D: Driver>(shared: &Arc<Shared<D>>) {
    let mut state = match shared.state.try_lock() {
        Ok(state) => state,
        Err(_) => {
            tracing::debug!(pool = %shared.name, "monitor: lock busy, skipping this tick");
            return;
        }
    };
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
                del_conn(shared, &mut state, conn, "unhealthy").await;
            }
            Action::EvictOverCapacity => {
                tracing::warn!(
                    conn = %conn.name(),
                    pool = %shared.name,
                    size = state.size,
                    max_size = shared.max_size,
                    "monitor: evicting over-capacity connection"
                );
                del_conn(shared, &mut state, conn, "over-capacity").await;
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
