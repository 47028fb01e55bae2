//! The pool's structured error surface: configuration, lifecycle, and
//! acquisition failures, plus the driver's own connect error wrapped
//! verbatim so callers can match exhaustively.

use thiserror::Error;

/// Errors surfaced by the pool to callers.
///
/// Generic over `E`, the driver's own connect/close error type, so that
/// callers can match exhaustively without the pool erasing the underlying
/// cause.
#[derive(Debug, Error)]
pub enum PoolError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Raised synchronously at construction when sizing or timeouts are invalid.
    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// Raised when any operation is attempted on a pool that is not opened
    /// (and not currently opening).
    #[error("pool is closed")]
    Closed,

    /// Raised by `start` when the pool is already opened with at least one
    /// live connection.
    #[error("pool is already started")]
    AlreadyStarted,

    /// Raised by acquisition once `conn_timeout` elapses before a connection
    /// becomes available.
    #[error("timed out waiting for a connection")]
    Timeout,

    /// A driver error surfaced from `connect`, not retried by the pool.
    #[error("driver connect failed: {0}")]
    Connect(#[source] E),
}
