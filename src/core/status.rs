//! The pool occupancy snapshot type.

/// A best-effort snapshot of pool occupancy, for diagnostics/metrics scraping.
///
/// Neither flavour guarantees the snapshot is still accurate by the time the
/// caller reads it; another acquirer or the monitor may change the counts in
/// between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Total live connections, idle plus checked out.
    pub connections: u32,
    /// Connections currently sitting in the idle deque.
    pub idle_connections: u32,
}
