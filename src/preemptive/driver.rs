//! The blocking driver contract this flavour of the pool consumes.

use crate::core::Connected;

/// The external driver contract this flavour of the pool consumes.
///
/// Unlike [`crate::cooperative::Driver`], `connect`/`close` are ordinary
/// blocking calls: the preemptive flavour has no executor to suspend on, so
/// every driver call runs synchronously on whichever OS thread invokes it.
pub trait Driver: Connected + Send + 'static {
    /// The error type returned by `connect`. Never retried by the pool.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens a fresh connection against `uri`. Blocks the calling thread.
    fn connect(uri: &str) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Closes the connection. Must be idempotent and bounded, since it may
    /// run with the pool's reentrant mutex held.
    fn close(&mut self);
}
