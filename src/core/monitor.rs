//! The Monitor's eviction classifier: a pure function from a connection's
//! own state and the pool's occupancy to an [`Action`], shared by both
//! flavours' Monitor loops.

use super::conn::{Connected, ConnInfo};

/// What the Monitor should do with one idle connection during a tick.
///
/// Pure function of the connection's own state plus the pool's current
/// occupancy — no lock, no I/O. Both flavours' Monitor loops call this and
/// then perform the flavour-specific close/re-enqueue; the classification
/// itself cannot drift between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `¬c.healthy` — close and drop it, shrinking `size`.
    EvictUnhealthy,
    /// `size > max_size` — close and drop it; logged as a consistency signal,
    /// since it should not occur given the pool's own invariants.
    EvictOverCapacity,
    /// `c.expired` — refresh the deadline and re-enqueue.
    Renew,
    /// Neither expired nor unhealthy nor surplus — re-enqueue unchanged.
    Readmit,
}

/// Classifies one idle connection popped from the head of the deque.
///
/// `size` is the pool's total live count *before* this connection is
/// re-admitted or dropped.
pub fn classify<C: Connected>(conn: &ConnInfo<C>, size: u32, max_size: u32) -> Action {
    if !conn.conn().is_healthy() {
        Action::EvictUnhealthy
    } else if size > max_size {
        Action::EvictOverCapacity
    } else if conn.expired() {
        Action::Renew
    } else {
        Action::Readmit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fake {
        healthy: bool,
    }

    impl Connected for Fake {
        fn is_healthy(&self) -> bool {
            self.healthy
        }
        fn connected(&self) -> bool {
            true
        }
    }

    fn conn(healthy: bool) -> ConnInfo<Fake> {
        ConnInfo::new(Fake { healthy }, Duration::from_secs(60))
    }

    #[test]
    fn unhealthy_wins_over_everything_else() {
        let c = conn(false);
        assert_eq!(classify(&c, 100, 1), Action::EvictUnhealthy);
    }

    #[test]
    fn over_capacity_evicts_a_healthy_connection() {
        let c = conn(true);
        assert_eq!(classify(&c, 5, 3), Action::EvictOverCapacity);
    }

    #[test]
    fn healthy_in_capacity_not_expired_is_readmitted() {
        let c = conn(true);
        assert_eq!(classify(&c, 2, 3), Action::Readmit);
    }

    #[test]
    fn healthy_in_capacity_expired_is_renewed() {
        let c = ConnInfo::new(Fake { healthy: true }, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(classify(&c, 2, 3), Action::Renew);
    }
}
