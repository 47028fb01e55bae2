//! Integration tests for the preemptive (thread-based) pool flavour,
//! exercising it against a hand-written fake driver connection instead of a
//! live SQL backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use enginepool::preemptive::{Builder, Driver};
use enginepool::{Connected, PoolError};

#[derive(Debug, thiserror::Error)]
#[error("fake driver failed to connect")]
struct FakeConnectError;

struct FakeConn {
    pub healthy: Arc<AtomicBool>,
    pub connected: Arc<AtomicBool>,
}

impl Connected for FakeConn {
    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Driver for FakeConn {
    type Error = FakeConnectError;

    fn connect(_uri: &str) -> Result<Self, Self::Error> {
        Ok(FakeConn {
            healthy: Arc::new(AtomicBool::new(true)),
            connected: Arc::new(AtomicBool::new(true)),
        })
    }

    fn close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[test]
fn startup_fill() {
    let pool = Builder::new()
        .min_size(2)
        .max_size(4)
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(200));

    let status = pool.status();
    assert_eq!(status.connections, 2);
    assert_eq!(status.idle_connections, 2);
    assert!(!pool.closed());
}

#[test]
fn acquire_release_cycle() {
    let pool = Builder::new()
        .min_size(2)
        .max_size(4)
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(200));

    let conn = pool.connection().unwrap();
    let name = conn.conn_name().to_string();
    let status = pool.status();
    assert_eq!(status.connections, 2);
    assert_eq!(status.idle_connections, 1);

    drop(conn);
    let status = pool.status();
    assert_eq!(status.connections, 2);
    assert_eq!(status.idle_connections, 2);

    let reacquired = pool.connection().unwrap();
    assert_eq!(reacquired.conn_name(), name);
}

#[test]
fn over_demand_grows_to_max_then_times_out() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(3)
        .conn_timeout(Duration::from_millis(300))
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(200));

    let a = pool.connection().unwrap();
    let b = pool.connection().unwrap();
    let c = pool.connection().unwrap();

    let status = pool.status();
    assert_eq!(status.connections, 3);
    assert_eq!(status.idle_connections, 0);

    let start = Instant::now();
    let err = pool.connection().unwrap_err();
    let elapsed = start.elapsed();
    assert!(matches!(err, PoolError::Timeout));
    assert!(elapsed >= Duration::from_millis(250), "elapsed: {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(800), "elapsed: {elapsed:?}");

    drop(a);
    drop(b);
    drop(c);
}

#[test]
fn unhealthy_connection_is_evicted_by_monitor() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(2)
        .check_interval(Duration::from_millis(150))
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(pool.status().connections, 1);

    let healthy_handle = {
        let conn = pool.connection().unwrap();
        conn.healthy.clone()
    };
    healthy_handle.store(false, Ordering::SeqCst);

    thread::sleep(Duration::from_millis(400));
    let after_eviction = pool.status();
    assert_eq!(after_eviction.connections, 0);

    let conn = pool.connection().unwrap();
    assert!(conn.is_healthy());
}

#[test]
fn expiry_is_renewed_not_evicted() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(1)
        .keep_alive(Duration::from_millis(300))
        .check_interval(Duration::from_millis(100))
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(800));

    let status = pool.status();
    assert_eq!(status.connections, 1);
    assert_eq!(status.idle_connections, 1);
}

#[test]
fn hard_ceiling_replaces_connection_on_next_release() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(1)
        .keep_alive(Duration::from_millis(50))
        .check_interval(Duration::from_secs(10))
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(100));

    let original_name = {
        let conn = pool.connection().unwrap();
        conn.conn_name().to_string()
    };

    thread::sleep(Duration::from_millis(250));

    let released_name = {
        let conn = pool.connection().unwrap();
        conn.conn_name().to_string()
    };
    assert_eq!(released_name, original_name);

    thread::sleep(Duration::from_millis(100));
    let fresh_name = {
        let conn = pool.connection().unwrap();
        conn.conn_name().to_string()
    };
    assert_ne!(fresh_name, original_name);
}

#[test]
fn stop_while_checked_out_discards_on_release() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(2)
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(200));

    let conn = pool.connection().unwrap();
    pool.stop();
    assert!(pool.closed());

    drop(conn);
    assert_eq!(pool.status().idle_connections, 0);

    let err = pool.connection().unwrap_err();
    assert!(matches!(err, PoolError::Closed));
}

#[test]
fn stop_is_idempotent() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(1)
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(100));

    pool.stop();
    pool.stop();
    assert!(pool.closed());
}

#[test]
fn start_after_open_is_rejected() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(1)
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(150));

    let err = pool.start().unwrap_err();
    assert!(matches!(err, PoolError::AlreadyStarted));
}

#[test]
fn dedicated_connection_is_not_tracked_by_status() {
    let pool = Builder::new()
        .min_size(1)
        .max_size(1)
        .build::<FakeConn>("fake://db")
        .unwrap();
    pool.start().unwrap();
    thread::sleep(Duration::from_millis(200));

    let before = pool.status();
    let dedicated = pool.dedicated_connection().unwrap();
    assert!(dedicated.is_healthy());

    let after = pool.status();
    assert_eq!(after, before, "a dedicated connection must not affect pool occupancy");

    drop(dedicated);
    assert_eq!(pool.status(), before);
}

#[test]
fn invalid_sizing_is_rejected_synchronously() {
    let err = Builder::new()
        .min_size(0)
        .build::<FakeConn>("fake://db")
        .unwrap_err();
    assert!(matches!(err, PoolError::Config(_)));

    let err = Builder::new()
        .min_size(5)
        .max_size(2)
        .build::<FakeConn>("fake://db")
        .unwrap_err();
    assert!(matches!(err, PoolError::Config(_)));
}
