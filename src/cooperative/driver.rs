//! The async driver contract this flavour of the pool consumes.

use async_trait::async_trait;

use crate::core::Connected;

/// The external driver contract this flavour of the pool consumes.
///
/// `connect` and `close` are the only operations the pool ever awaits;
/// `is_healthy`/`connected` (from [`Connected`]) must be cheap and
/// non-blocking so the Monitor can call them while holding the pool lock.
#[async_trait]
pub trait Driver: Connected + Send + Sync + 'static {
    /// The error type returned by `connect`. Never retried by the pool.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens a fresh connection against `uri`.
    async fn connect(uri: &str) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Closes the connection. Must be idempotent.
    async fn close(&mut self);
}
