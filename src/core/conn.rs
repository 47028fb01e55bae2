//! `ConnInfo`: the per-connection lifecycle wrapper shared verbatim by both
//! pool flavours.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;

static CONN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fast, non-throwing liveness checks a driver connection must provide.
///
/// Both pool flavours call these synchronously — `connect`/`close` are the
/// only operations allowed to be asynchronous, per the driver contract.
pub trait Connected {
    /// Cheap health check; must not block on network I/O.
    fn is_healthy(&self) -> bool;
    /// Whether the driver still considers itself connected.
    fn connected(&self) -> bool;
}

/// Adds jitter in the one-sided band `[value * (1 + min_pc), value * (1 + max_pc)]`.
///
/// The pool only ever calls this with `min_pc = -0.05, max_pc = 0.0`, which
/// keeps `expires_at <= start_at + keep_alive` — early recycling, never late.
pub(crate) fn jitter(value: Duration, min_pc: f64, max_pc: f64) -> Duration {
    let value = value.as_secs_f64();
    let factor = 1.0 + min_pc + (max_pc - min_pc) * rand::thread_rng().gen::<f64>();
    Duration::from_secs_f64((value * factor).max(0.0))
}

/// Wraps one physical driver connection with pool lifecycle metadata.
///
/// Shared verbatim between the cooperative and preemptive flavours: nothing
/// here touches an executor or a lock, so the same struct and predicates
/// back both `Pool` implementations.
#[derive(Debug)]
pub struct ConnInfo<C> {
    name: String,
    conn: C,
    keep_alive: Duration,
    start_at: Instant,
    expires_at: Instant,
}

impl<C> ConnInfo<C> {
    /// Wraps a freshly connected driver handle, assigning it the next
    /// process-wide `conn-N` name and an initial, jittered `expires_at`.
    pub fn new(conn: C, keep_alive: Duration) -> Self {
        let start_at = Instant::now();
        let n = CONN_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        ConnInfo {
            name: format!("conn-{n}"),
            conn,
            keep_alive,
            start_at,
            expires_at: start_at + jitter(keep_alive, -0.05, 0.0),
        }
    }

    /// The connection's log-correlation name, stable for its whole life.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time this wrapper was created; never mutated.
    pub fn start_at(&self) -> Instant {
        self.start_at
    }

    /// Soft rotation deadline; past it the Monitor renews, not evicts.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Immutable access to the wrapped driver connection.
    pub fn conn(&self) -> &C {
        &self.conn
    }

    /// Mutable access to the wrapped driver connection, needed for `close`.
    pub fn conn_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Unwraps the driver connection, discarding the lifecycle wrapper.
    pub fn into_conn(self) -> C {
        self.conn
    }

    /// Past the soft `expires_at` deadline.
    pub fn expired(&self) -> bool {
        self.expires_at < Instant::now()
    }

    /// Hard reuse ceiling: `now < start_at + 4 * keep_alive`.
    ///
    /// Monotonically non-increasing over the life of a `ConnInfo` — once
    /// false it never becomes true again.
    pub fn can_reuse(&self) -> bool {
        Instant::now() < self.start_at + self.keep_alive * 4
    }

    /// Recomputes `expires_at` with fresh jitter, desynchronising mass
    /// expiry across connections created at roughly the same instant.
    pub fn renew_expire_at(&mut self) {
        self.expires_at = Instant::now() + jitter(self.keep_alive, -0.05, 0.0);
    }

    /// Marks this wrapper's deadline as "now", for use right after the
    /// driver handle itself has been closed by the caller.
    pub(crate) fn mark_closed(&mut self) {
        self.expires_at = Instant::now();
    }

    /// Age of the connection at the moment of calling, for close-time logging.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.start_at)
    }
}

impl<C: Connected> ConnInfo<C> {
    /// `healthy ∧ connected ∧ can_reuse`.
    pub fn reusable(&self) -> bool {
        self.conn.is_healthy() && self.conn.connected() && self.can_reuse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        healthy: bool,
        connected: bool,
    }

    impl Connected for Fake {
        fn is_healthy(&self) -> bool {
            self.healthy
        }
        fn connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn expires_at_is_within_one_sided_jitter_band() {
        let keep_alive = Duration::from_secs(100);
        let info = ConnInfo::new(
            Fake {
                healthy: true,
                connected: true,
            },
            keep_alive,
        );
        let lo = info.start_at() + Duration::from_secs_f64(95.0);
        let hi = info.start_at() + keep_alive;
        assert!(info.expires_at() >= lo);
        assert!(info.expires_at() <= hi);
    }

    #[test]
    fn reusable_requires_health_and_connection() {
        let info = ConnInfo::new(
            Fake {
                healthy: false,
                connected: true,
            },
            Duration::from_secs(60),
        );
        assert!(!info.reusable());
    }

    #[test]
    fn can_reuse_flips_once_past_hard_ceiling() {
        let keep_alive = Duration::from_millis(5);
        let info = ConnInfo::new(
            Fake {
                healthy: true,
                connected: true,
            },
            keep_alive,
        );
        assert!(info.can_reuse());
        std::thread::sleep(keep_alive * 4 + Duration::from_millis(20));
        assert!(!info.can_reuse());
    }

    #[test]
    fn names_are_monotonic_and_stable() {
        let a = ConnInfo::new(
            Fake {
                healthy: true,
                connected: true,
            },
            Duration::from_secs(1),
        );
        let b = ConnInfo::new(
            Fake {
                healthy: true,
                connected: true,
            },
            Duration::from_secs(1),
        );
        assert_ne!(a.name(), b.name());
    }
}
