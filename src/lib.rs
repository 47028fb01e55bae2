//! The connection pool core of a multi-database SQL engine client.
//!
//! This crate amortises connection setup, enforces liveness and lifetime
//! bounds, and multiplexes bounded concurrent access onto a bounded set of
//! physical driver connections. It is agnostic to which driver it manages:
//! implementors of [`cooperative::Driver`] / [`preemptive::Driver`] provide
//! the database-specific `connect`/`close`/health-check logic.
//!
//! Two independent flavours share one data model ([`core`]) and one set of
//! invariants, differing only in synchronisation primitive and spawner:
//!
//! - [`cooperative`]: single-threaded, `tokio`-driven. Suspension points are
//!   explicit `.await`s.
//! - [`preemptive`]: multi-threaded, built on native OS threads and a
//!   reentrant mutex.
//!
//! # Example
//!
//! Using an imaginary "foodb" driver with the cooperative flavour.
//!
//! ```ignore
//! use enginepool::cooperative::{Builder, Driver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = Builder::new()
//!         .min_size(2)
//!         .max_size(10)
//!         .build::<FooConnection>("foodb://localhost/app")
//!         .unwrap();
//!     pool.start().await.unwrap();
//!
//!     let conn = pool.connection().await.unwrap();
//!     // use *conn ...
//!     // returned to the pool when `conn` falls out of scope.
//! }
//! ```
#![deny(missing_docs, missing_debug_implementations)]

pub mod core;
pub mod error;

#[cfg(feature = "cooperative")]
pub mod cooperative;

#[cfg(feature = "preemptive")]
pub mod preemptive;

pub use core::{Connected, ConnInfo, PoolStatus};
pub use error::PoolError;
