//! The cooperative `Pool` facade: `tokio`-driven acquisition, release, and
//! lifecycle, built on the shared [`crate::core`] data model.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::core::sizing::{check_size, check_timeouts};
use crate::core::{ConnInfo, PoolStatus};
use crate::error::PoolError;

use super::driver::Driver;
use super::worker::Worker;

static POOL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Poll interval `_get_conn` sleeps between acquisition attempts.
const ACQUIRE_POLL: Duration = Duration::from_millis(100);

/// Builder for a cooperative, `tokio`-driven [`Pool`].
///
/// Defaults plus validated setters, rather than a constructor with five
/// positional arguments.
#[derive(Debug, Clone)]
pub struct Builder {
    min_size: u32,
    max_size: Option<u32>,
    conn_timeout: Duration,
    keep_alive: Duration,
    check_interval: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            min_size: 1,
            max_size: None,
            conn_timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(900),
            check_interval: Duration::from_secs(5),
        }
    }
}

impl Builder {
    /// Constructs a new `Builder`, initialized with the documented defaults.
    pub fn new() -> Builder {
        Default::default()
    }

    /// Sets `min_size`, the number of connections opened at `start`.
    pub fn min_size(mut self, min_size: u32) -> Builder {
        self.min_size = min_size;
        self
    }

    /// Sets `max_size`. Defaults to `min_size` when left unset.
    pub fn max_size(mut self, max_size: u32) -> Builder {
        self.max_size = Some(max_size);
        self
    }

    /// Sets how long `connection()` waits for a free connection.
    ///
    /// Defaults to 30 seconds.
    pub fn conn_timeout(mut self, conn_timeout: Duration) -> Builder {
        self.conn_timeout = conn_timeout;
        self
    }

    /// Sets the soft rotation lifetime for each connection.
    ///
    /// Defaults to 900 seconds. Values below 60 seconds are accepted but
    /// logged as a configuration warning.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Builder {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the Monitor's tick period.
    ///
    /// Defaults to 5 seconds.
    pub fn check_interval(mut self, check_interval: Duration) -> Builder {
        self.check_interval = check_interval;
        self
    }

    /// Consumes the builder, returning a new, unopened `Pool`.
    ///
    /// Validates sizing, timeouts, and the URI synchronously; does not open
    /// any connections. Call [`Pool::start`] to fill the pool.
    pub fn build<D: Driver>(self, uri: impl Into<String>) -> Result<Pool<D>, PoolError<D::Error>> {
        Pool::new(uri.into(), self)
    }
}

/// The lock-protected half of the pool's state.
pub(crate) struct State<D: Driver> {
    pub(crate) idle: VecDeque<ConnInfo<D>>,
    pub(crate) size: u32,
    pub(crate) opened: bool,
    pub(crate) opening: bool,
}

/// The pool's shared guts, reference-counted between `Pool` handles, the
/// bootstrap worker, the Monitor, and every outstanding `PooledConnection`.
pub(crate) struct Shared<D: Driver> {
    pub(crate) name: String,
    pub(crate) uri: String,
    pub(crate) min_size: u32,
    pub(crate) max_size: u32,
    pub(crate) conn_timeout: Duration,
    pub(crate) keep_alive: Duration,
    pub(crate) check_interval: Duration,
    pub(crate) state: Mutex<State<D>>,
    workers: std::sync::Mutex<Vec<Worker>>,
}

/// A cooperative connection pool, driven by the ambient `tokio` runtime.
pub struct Pool<D: Driver> {
    inner: Arc<Shared<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Driver> fmt::Debug for Pool<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("name", &self.inner.name).finish()
    }
}

impl<D: Driver> Pool<D> {
    pub(crate) fn new(uri: String, builder: Builder) -> Result<Pool<D>, PoolError<D::Error>> {
        if uri.trim().is_empty() {
            return Err(PoolError::Config("uri must not be empty".into()));
        }
        let (min_size, max_size) = check_size(builder.min_size, builder.max_size)?;
        check_timeouts::<D::Error>(builder.conn_timeout, builder.keep_alive, builder.check_interval)?;

        let n = POOL_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::new(Shared {
            name: format!("pool-{n}"),
            uri,
            min_size,
            max_size,
            conn_timeout: builder.conn_timeout,
            keep_alive: builder.keep_alive,
            check_interval: builder.check_interval,
            state: Mutex::new(State {
                idle: VecDeque::new(),
                size: 0,
                opened: false,
                opening: false,
            }),
            workers: std::sync::Mutex::new(Vec::new()),
        });
        Ok(Pool { inner })
    }

    /// The pool's log-correlation name (`pool-N`).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `true` once the pool is neither opening nor opened.
    pub async fn closed(&self) -> bool {
        let state = self.inner.state.lock().await;
        !(state.opened || state.opening)
    }

    /// A best-effort snapshot of current occupancy.
    pub async fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock().await;
        PoolStatus {
            connections: state.size,
            idle_connections: state.idle.len() as u32,
        }
    }

    /// Triggers the startup fill if the pool is not already started.
    ///
    /// Fails with [`PoolError::AlreadyStarted`] if the pool is opened with at
    /// least one live connection. Idempotent while the pool is still
    /// opening.
    pub async fn start(&self) -> Result<(), PoolError<D::Error>> {
        {
            let mut state = self.inner.state.lock().await;
            if state.opened && state.size > 0 {
                return Err(PoolError::AlreadyStarted);
            }
            if state.opening {
                return Ok(());
            }
            state.opening = true;
        }
        self.spawn_workers();
        Ok(())
    }

    fn spawn_workers(&self) {
        let shared = self.inner.clone();
        let bootstrap = Worker::spawn("startup", move |_stop_signal| async move {
            if let Err(err) = run_start(&shared).await {
                tracing::warn!(pool = %shared.name, error = %err, "startup fill failed, pool remains unopened");
            }
        });
        let monitor = super::monitor::spawn(self.inner.clone());
        let mut workers = self.inner.workers.lock().unwrap();
        workers.push(bootstrap);
        workers.push(monitor);
    }

    /// Drains idle connections, closes them, and marks the pool closed.
    ///
    /// Connections currently checked out are not force-closed; they are
    /// discarded the next time their caller returns them. Safe to call more
    /// than once.
    pub async fn stop(&self) {
        let (idle, already_closed) = {
            let mut state = self.inner.state.lock().await;
            if !(state.opened || state.opening) {
                (VecDeque::new(), true)
            } else {
                state.opened = false;
                state.opening = false;
                let idle = std::mem::take(&mut state.idle);
                state.size = state.size.saturating_sub(idle.len() as u32);
                (idle, false)
            }
        };
        if already_closed {
            return;
        }
        for conn in idle {
            close_conn(&self.inner, conn, "stop").await;
        }
        tracing::info!(pool = %self.inner.name, "pool stopped");

        let workers = {
            let mut w = self.inner.workers.lock().unwrap();
            std::mem::take(&mut *w)
        };
        for worker in workers {
            worker.finish().await;
        }
    }

    /// Scoped acquisition of a reusable driver connection.
    ///
    /// Fails with [`PoolError::Closed`] if the pool is not opened (and not
    /// opening), or [`PoolError::Timeout`] if `conn_timeout` elapses first.
    /// The returned handle returns its connection to the pool when dropped.
    pub async fn connection(&self) -> Result<PooledConnection<D>, PoolError<D::Error>> {
        let conn = get_conn(&self.inner).await?;
        Ok(PooledConnection {
            shared: self.inner.clone(),
            conn: Some(conn),
        })
    }

    /// Opens a connection outside the pool's managed set.
    ///
    /// Uses the same URI and connect logic as every pooled connection, but
    /// the result is not tracked against `size` or `max_size` and is never
    /// returned to `idle` on drop; the caller owns it exclusively for the
    /// rest of its life. Useful for an exclusive long-lived session (e.g. a
    /// `LISTEN`-style subscription) that must not be recycled by the
    /// Monitor or handed to another acquirer.
    pub async fn dedicated_connection(&self) -> Result<D, PoolError<D::Error>> {
        let conn = new_conn(&self.inner).await?;
        Ok(conn.into_conn())
    }
}

async fn new_conn<D: Driver>(shared: &Arc<Shared<D>>) -> Result<ConnInfo<D>, PoolError<D::Error>> {
    let conn = D::connect(&shared.uri).await.map_err(PoolError::Connect)?;
    Ok(ConnInfo::new(conn, shared.keep_alive))
}

/// Opens enough connections to bring `size` up to `min_size`, accounting for
/// any connections a previous, partially failed `start` attempt already
/// installed — retrying `start` tops up the shortfall rather than
/// reopening `min_size` connections on top of what is already there.
async fn run_start<D: Driver>(shared: &Arc<Shared<D>>) -> Result<(), PoolError<D::Error>> {
    let already_open = shared.state.lock().await.size;
    let to_open = shared.min_size.saturating_sub(already_open);

    let mut opened = Vec::new();
    let mut failure = None;
    for _ in 0..to_open {
        match new_conn(shared).await {
            Ok(conn) => opened.push(conn),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    let opened_count = opened.len() as u32;
    let mut state = shared.state.lock().await;
    state.size += opened_count;
    state.idle.extend(opened);
    state.opening = false;
    match failure {
        None => {
            state.opened = true;
            tracing::info!(pool = %shared.name, size = state.size, "pool started");
            Ok(())
        }
        Some(err) => Err(err),
    }
}

/// `ConnInfo::close`: closes the driver handle, marks the wrapper closed,
/// and emits the age-of-connection trace. Every close site — Monitor
/// eviction, shutdown drain, and discard-on-release — funnels through this
/// so the trace and the `expires_at` update are never skipped.
async fn close_conn<D: Driver>(shared: &Arc<Shared<D>>, mut conn: ConnInfo<D>, reason: &str) {
    let age = conn.age();
    conn.conn_mut().close().await;
    conn.mark_closed();
    tracing::debug!(
        conn = %conn.name(),
        pool = %shared.name,
        age_secs = age.as_secs_f64(),
        reason,
        "closed connection"
    );
}

/// `_del_conn`: closes `c` and decrements `size`. Caller must hold the lock.
pub(crate) async fn del_conn<D: Driver>(
    shared: &Arc<Shared<D>>,
    state: &mut State<D>,
    conn: ConnInfo<D>,
    reason: &str,
) {
    close_conn(shared, conn, reason).await;
    state.size -= 1;
}

/// `_put_conn` (unchecked): re-admits a connection the Monitor has already
/// classified, without re-checking closed/reusable state. Caller must hold
/// the lock.
pub(crate) fn put_idle_unchecked<D: Driver>(state: &mut State<D>, conn: ConnInfo<D>) {
    state.idle.push_back(conn);
}

/// `_put_conn` (checked): readmits, discards-and-replaces, or drops a
/// returned connection depending on pool and connection state.
async fn put_conn<D: Driver>(shared: &Arc<Shared<D>>, mut conn: ConnInfo<D>) {
    let mut state = shared.state.lock().await;
    if !(state.opened || state.opening) {
        state.size = state.size.saturating_sub(1);
        drop(state);
        close_conn(shared, conn, "pool closed").await;
        return;
    }
    if conn.reusable() {
        state.idle.push_back(conn);
        return;
    }
    state.size -= 1;
    drop(state);
    close_conn(shared, conn, "unreusable").await;

    match new_conn(shared).await {
        Ok(replacement) => {
            let mut state = shared.state.lock().await;
            state.size += 1;
            state.idle.push_back(replacement);
        }
        Err(err) => {
            tracing::warn!(pool = %shared.name, error = %err, "failed to open replacement connection after discard");
        }
    }
}

/// `_get_ready_conn`: pops an idle connection, or opens a fresh one if under
/// `max_size`, reserving the slot in `size` before the (slow) connect call
/// so concurrent acquirers cannot all observe headroom and overshoot it.
async fn get_ready_conn<D: Driver>(
    shared: &Arc<Shared<D>>,
) -> Option<Result<ConnInfo<D>, PoolError<D::Error>>> {
    let mut state = shared.state.lock().await;
    if let Some(conn) = state.idle.pop_front() {
        return Some(Ok(conn));
    }
    if state.size >= shared.max_size {
        return None;
    }
    state.size += 1;
    drop(state);

    match new_conn(shared).await {
        Ok(conn) => Some(Ok(conn)),
        Err(err) => {
            let mut state = shared.state.lock().await;
            state.size -= 1;
            Some(Err(err))
        }
    }
}

async fn check_closed<D: Driver>(shared: &Arc<Shared<D>>) -> Result<(), PoolError<D::Error>> {
    let state = shared.state.lock().await;
    if state.opened || state.opening {
        Ok(())
    } else {
        Err(PoolError::Closed)
    }
}

/// `_get_conn`: polls for a ready connection until one is obtained or
/// `conn_timeout` elapses.
async fn get_conn<D: Driver>(shared: &Arc<Shared<D>>) -> Result<ConnInfo<D>, PoolError<D::Error>> {
    check_closed(shared).await?;
    let deadline = Instant::now() + shared.conn_timeout;
    loop {
        if let Some(result) = get_ready_conn(shared).await {
            return result;
        }
        if Instant::now() > deadline {
            return Err(PoolError::Timeout);
        }
        sleep(ACQUIRE_POLL).await;
    }
}

/// A scoped handle to a checked-out driver connection.
///
/// Returns the wrapped [`ConnInfo`] to its pool via `put_conn` when dropped,
/// whether the scope exits normally or by panic unwind.
pub struct PooledConnection<D: Driver> {
    shared: Arc<Shared<D>>,
    conn: Option<ConnInfo<D>>,
}

impl<D: Driver> PooledConnection<D> {
    /// The checked-out connection's log-correlation name (`conn-N`), for
    /// diagnostics. Stable for the connection's whole life.
    pub fn conn_name(&self) -> &str {
        self.conn.as_ref().unwrap().name()
    }
}

impl<D: Driver> Deref for PooledConnection<D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.conn.as_ref().unwrap().conn()
    }
}

impl<D: Driver> DerefMut for PooledConnection<D> {
    fn deref_mut(&mut self) -> &mut D {
        self.conn.as_mut().unwrap().conn_mut()
    }
}

impl<D: Driver> fmt::Debug for PooledConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("name", &self.conn.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl<D: Driver> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let shared = self.shared.clone();
            futures::executor::block_on(async move {
                put_conn(&shared, conn).await;
            });
        }
    }
}
