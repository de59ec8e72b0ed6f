//! Pool state, checkout/return and the idle monitor.

use crate::{PoolConfig, PoolStats};
use sqlengine_core::{
    DialectRegistry, DriverRegistry, Error, PoolError, PoolErrorKind, Result, SqlConnection,
    SqlDialect, SqlSource,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const MONITOR_THREAD_NAME: &str = "sqlengine-pool-monitor";

/// A concurrent cache of open connections keyed by data-source id.
///
/// Dropping the pool runs [`close_all`](Self::close_all).
pub struct ConnectionPool {
    shared: Arc<Shared>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    config: PoolConfig,
    drivers: Arc<DriverRegistry>,
    dialects: Arc<DialectRegistry>,
    state: Mutex<PoolState>,
    // Held around native opens when `interlocked_open` is set.
    open_lock: Mutex<()>,
    // Monitor start/stop signaling, kept apart from `state`.
    stop: Mutex<bool>,
    stop_signal: Condvar,
}

#[derive(Default)]
struct PoolState {
    sources: HashMap<String, SourceSlot>,
    /// Connections waiting for the monitor to close them
    to_close: Vec<SqlConnection>,
    closed: bool,
}

struct SourceSlot {
    source: SqlSource,
    idle: VecDeque<IdleConnection>,
    /// Checked out, or reserved while a new connection is being opened
    in_use: usize,
    waiting: usize,
    /// Signaled once per returned or released slot; waits use the `state` mutex
    available: Arc<Condvar>,
}

struct IdleConnection {
    conn: SqlConnection,
    since: Instant,
}

impl SourceSlot {
    fn new(source: SqlSource) -> Self {
        Self {
            source,
            idle: VecDeque::new(),
            in_use: 0,
            waiting: 0,
            available: Arc::new(Condvar::new()),
        }
    }

    fn open_count(&self) -> usize {
        self.in_use + self.idle.len()
    }

    fn summary(&self) -> String {
        format!(
            "[source: {}, total open: {}, in pool: {}]",
            self.source.id,
            self.open_count(),
            self.idle.len()
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn unknown_source(id: &str) -> Error {
    PoolError::new(
        PoolErrorKind::InvalidDataSource,
        format!("Unknown source ID: {}", id),
    )
    .into()
}

fn pool_closed() -> Error {
    PoolError::new(PoolErrorKind::Closed, "Pool is closed").into()
}

fn close_quietly(mut conn: SqlConnection) {
    if let Err(e) = conn.close() {
        tracing::warn!(source = %conn.source().id, error = %e, "Error closing pooled connection");
    }
}

impl ConnectionPool {
    /// Create a pool and start its monitor thread.
    pub fn new(
        config: PoolConfig,
        drivers: Arc<DriverRegistry>,
        dialects: Arc<DialectRegistry>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            config,
            drivers,
            dialects,
            state: Mutex::new(PoolState::default()),
            open_lock: Mutex::new(()),
            stop: Mutex::new(false),
            stop_signal: Condvar::new(),
        });
        let monitor_shared = Arc::clone(&shared);
        let monitor = thread::Builder::new()
            .name(MONITOR_THREAD_NAME.to_string())
            .spawn(move || monitor_shared.run_monitor())?;
        tracing::debug!(
            max_size = shared.config.max_size,
            idle_time_ms = shared.config.idle_time_ms,
            monitor_interval_ms = shared.config.monitor_interval_ms,
            "Connection pool started"
        );
        Ok(Self {
            shared,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Register a data source under its id. Re-registering an id replaces the
    /// descriptor used for future opens; open connections are kept.
    pub fn add_source(&self, source: SqlSource) -> Result<()> {
        let mut state = lock(&self.shared.state);
        if state.closed {
            return Err(pool_closed());
        }
        let id = source.id.clone();
        match state.sources.get_mut(&id) {
            Some(slot) => slot.source = source,
            None => {
                state.sources.insert(id.clone(), SourceSlot::new(source));
            }
        }
        tracing::debug!(source = %id, "Data source registered");
        Ok(())
    }

    pub fn has_source(&self, id: &str) -> bool {
        lock(&self.shared.state).sources.contains_key(id)
    }

    /// The dialect connections of source `id` speak.
    pub fn dialect_for(&self, id: &str) -> Result<Arc<dyn SqlDialect>> {
        let dialect = {
            let state = lock(&self.shared.state);
            let slot = state.sources.get(id).ok_or_else(|| unknown_source(id))?;
            slot.source.dialect.clone()
        };
        self.shared.dialects.get(&dialect)
    }

    /// Check out a connection, waiting at most the configured `wait_timeout`.
    pub fn get(&self, id: &str) -> Result<PooledConnection> {
        self.get_timeout(id, Some(self.shared.config.wait_timeout_duration()))
    }

    /// Check out a connection, waiting at most `timeout` (`None` waits forever).
    ///
    /// An idle connection is reused if there is one; otherwise a new one is
    /// opened while the source is below `max_size`. A zero timeout fails at
    /// once when neither is possible.
    pub fn get_timeout(&self, id: &str, timeout: Option<Duration>) -> Result<PooledConnection> {
        let conn = self.shared.checkout(id, timeout)?;
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.shared),
            close_now: false,
        })
    }

    /// Return a connection, closing it instead of keeping it when `close_now`.
    pub fn put(&self, mut conn: PooledConnection, close_now: bool) {
        conn.close_now |= close_now;
    }

    /// Statistics for one data source.
    pub fn stats(&self, id: &str) -> Result<PoolStats> {
        let state = lock(&self.shared.state);
        let slot = state.sources.get(id).ok_or_else(|| unknown_source(id))?;
        Ok(PoolStats {
            open: slot.open_count(),
            idle: slot.idle.len(),
            in_use: slot.in_use,
            waiting: slot.waiting,
        })
    }

    /// Stop the monitor and close every idle connection. Connections still
    /// checked out are closed when they come back. Calling this twice is a no-op.
    pub fn close_all(&self) {
        {
            let mut stop = lock(&self.shared.stop);
            *stop = true;
            self.shared.stop_signal.notify_all();
        }
        if let Some(handle) = lock(&self.monitor).take() {
            if handle.join().is_err() {
                tracing::warn!("Pool monitor thread panicked");
            }
        }

        let victims: Vec<SqlConnection> = {
            let mut state = lock(&self.shared.state);
            if !state.closed {
                tracing::debug!("Closing connection pool");
            }
            state.closed = true;
            let mut victims = std::mem::take(&mut state.to_close);
            for slot in state.sources.values_mut() {
                victims.extend(slot.idle.drain(..).map(|idle| idle.conn));
                slot.available.notify_all();
            }
            victims
        };
        for conn in victims {
            close_quietly(conn);
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared.state).closed
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        let mut ids: Vec<&String> = state.sources.keys().collect();
        ids.sort();
        f.debug_struct("ConnectionPool")
            .field("config", &self.shared.config)
            .field("sources", &ids)
            .field("closed", &state.closed)
            .finish()
    }
}

impl Shared {
    fn checkout(&self, id: &str, timeout: Option<Duration>) -> Result<SqlConnection> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = lock(&self.state);
        loop {
            if state.closed {
                return Err(pool_closed());
            }
            let max_size = self.config.max_size;
            let slot = state.sources.get_mut(id).ok_or_else(|| unknown_source(id))?;

            if let Some(idle) = slot.idle.pop_back() {
                slot.in_use += 1;
                tracing::debug!("Reusing connection {}", slot.summary());
                return Ok(idle.conn);
            }

            if slot.open_count() < max_size {
                // Reserve the slot, then open without holding the lock.
                slot.in_use += 1;
                let source = slot.source.clone();
                drop(state);
                return self.open_reserved(&source);
            }

            let remaining = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!("Can't get connection {}", slot.summary());
                        return Err(PoolError::new(PoolErrorKind::Timeout, "Can't get connection").into());
                    }
                    Some(deadline - now)
                }
            };

            slot.waiting += 1;
            let available = Arc::clone(&slot.available);
            state = match remaining {
                None => available.wait(state).unwrap_or_else(|e| e.into_inner()),
                Some(remaining) => {
                    available
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
            if let Some(slot) = state.sources.get_mut(id) {
                slot.waiting -= 1;
            }
        }
    }

    fn open_reserved(&self, source: &SqlSource) -> Result<SqlConnection> {
        let opened = {
            let _interlock = self.config.interlocked_open.then(|| lock(&self.open_lock));
            SqlConnection::open(source, &self.drivers, &self.dialects)
        };
        match opened {
            Ok(conn) => {
                let state = lock(&self.state);
                if let Some(slot) = state.sources.get(&source.id) {
                    tracing::debug!("Opened new connection {}", slot.summary());
                }
                Ok(conn)
            }
            Err(e) => {
                let mut state = lock(&self.state);
                if let Some(slot) = state.sources.get_mut(&source.id) {
                    slot.in_use -= 1;
                    slot.available.notify_one();
                }
                Err(e)
            }
        }
    }

    fn put(&self, mut conn: SqlConnection, close_now: bool) {
        let mut close_now = close_now || conn.is_bad() || !conn.is_open();
        if !close_now {
            conn.clear();
            close_now = conn.is_bad();
        }

        let id = conn.source().id.clone();
        let mut state = lock(&self.state);
        let closed = state.closed;
        let Some(slot) = state.sources.get_mut(&id) else {
            drop(state);
            close_quietly(conn);
            return;
        };
        slot.in_use = slot.in_use.saturating_sub(1);

        if closed {
            slot.available.notify_one();
            drop(state);
            close_quietly(conn);
            return;
        }

        if close_now {
            tracing::debug!("Queued connection for close {}", slot.summary());
            slot.available.notify_one();
            state.to_close.push(conn);
        } else {
            slot.idle.push_back(IdleConnection {
                conn,
                since: Instant::now(),
            });
            tracing::debug!("Returned connection {}", slot.summary());
            slot.available.notify_one();
        }
    }

    fn run_monitor(&self) {
        let interval = self.config.monitor_interval_duration();
        tracing::debug!(interval_ms = self.config.monitor_interval_ms, "Pool monitor started");
        loop {
            {
                let stop = lock(&self.stop);
                let (stop, _) = self
                    .stop_signal
                    .wait_timeout_while(stop, interval, |stop| !*stop)
                    .unwrap_or_else(|e| e.into_inner());
                if *stop {
                    break;
                }
            }
            self.reclaim();
        }
        tracing::debug!("Pool monitor stopped");
    }

    /// Move expired idle connections and queued closes out of the pool, then
    /// close them after releasing the lock.
    fn reclaim(&self) {
        let idle_time = self.config.idle_time_duration();
        let victims: Vec<SqlConnection> = {
            let mut state = lock(&self.state);
            let mut victims = std::mem::take(&mut state.to_close);
            for slot in state.sources.values_mut() {
                let before = victims.len();
                let mut kept = VecDeque::with_capacity(slot.idle.len());
                for idle in slot.idle.drain(..) {
                    if idle.since.elapsed() >= idle_time {
                        victims.push(idle.conn);
                    } else {
                        kept.push_back(idle);
                    }
                }
                slot.idle = kept;
                if victims.len() > before {
                    tracing::debug!(
                        "Reclaimed {} idle connection(s) {}",
                        victims.len() - before,
                        slot.summary()
                    );
                    // Freed capacity can be used by a waiter.
                    slot.available.notify_one();
                }
            }
            victims
        };
        for conn in victims {
            close_quietly(conn);
        }
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Dereferences to [`SqlConnection`]. Dropping it returns the connection to
/// the pool; [`discard`](Self::discard) closes it instead.
pub struct PooledConnection {
    conn: Option<SqlConnection>,
    pool: Arc<Shared>,
    close_now: bool,
}

impl PooledConnection {
    /// Return the connection for closing rather than reuse.
    pub fn discard(mut self) {
        self.close_now = true;
    }

    pub fn source_id(&self) -> &str {
        &self.source().id
    }
}

impl Deref for PooledConnection {
    type Target = SqlConnection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put(conn, self.close_now);
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .field("close_now", &self.close_now)
            .finish()
    }
}
