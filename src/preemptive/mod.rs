//! Preemptive, multi-threaded pool flavour built on native OS threads and a
//! reentrant mutex.
//!
//! Shares the same executor-independent data model as
//! [`crate::cooperative`]; only the synchronisation primitive
//! (`parking_lot::ReentrantMutex`) and the spawner (`std::thread::spawn`)
//! differ. Driver calls are ordinary blocking calls here, since there is no
//! event loop to suspend.

pub mod driver;
mod monitor;
pub mod pool;
pub mod worker;

pub use driver::Driver;
pub use pool::{Builder, Pool, PooledConnection};
pub use worker::Worker;
