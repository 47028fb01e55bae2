//! Cooperative, single-threaded pool flavour driven by the ambient `tokio`
//! runtime. Suspension points are explicit `.await`s on sleeps, the lock,
//! and driver `connect`/`close` calls.
//!
//! Built on the executor-independent data model in [`crate::core`]; only the
//! synchronisation primitive (`tokio::sync::Mutex`) and the spawner
//! (`tokio::spawn`) are specific to this flavour. See
//! [`crate::preemptive`] for the thread-based sibling.

pub mod driver;
mod monitor;
pub mod pool;
pub mod worker;

pub use driver::Driver;
pub use pool::{Builder, Pool, PooledConnection};
pub use worker::Worker;
