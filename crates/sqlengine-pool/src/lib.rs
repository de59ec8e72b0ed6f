//! Connection pooling for sqlengine.
//!
//! A [`ConnectionPool`] keeps, per registered data source, a deque of idle
//! [`SqlConnection`](sqlengine_core::SqlConnection)s and a count of the ones
//! checked out. Callers block on a condition variable while a source is at
//! `max_size`; a background monitor thread closes connections that stayed
//! idle longer than `idle_time`. Closing happens outside the pool lock.

mod pool;

pub use pool::{ConnectionPool, PooledConnection};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of open connections per data source
    pub max_size: usize,
    /// Idle connections older than this are closed by the monitor, in milliseconds
    pub idle_time_ms: u64,
    /// How often the monitor scans for idle connections, in milliseconds
    pub monitor_interval_ms: u64,
    /// Default time `get` waits for a connection, in milliseconds
    pub wait_timeout_ms: u64,
    /// Open native connections one at a time, across all sources, for
    /// client libraries whose connect routine is not thread-safe
    pub interlocked_open: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 5,
            idle_time_ms: 15_000,       // 15 seconds
            monitor_interval_ms: 5_000, // 5 seconds
            wait_timeout_ms: 30_000,    // 30 seconds
            interlocked_open: false,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with the given max size.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    /// Set max size.
    pub fn max_size(mut self, n: usize) -> Self {
        self.max_size = n;
        self
    }

    /// Set idle time.
    pub fn idle_time(mut self, ms: u64) -> Self {
        self.idle_time_ms = ms;
        self
    }

    /// Set monitor interval.
    pub fn monitor_interval(mut self, ms: u64) -> Self {
        self.monitor_interval_ms = ms;
        self
    }

    /// Set the default wait timeout.
    pub fn wait_timeout(mut self, ms: u64) -> Self {
        self.wait_timeout_ms = ms;
        self
    }

    /// Serialize native opens.
    pub fn interlocked_open(mut self, on: bool) -> Self {
        self.interlocked_open = on;
        self
    }

    pub fn idle_time_duration(&self) -> Duration {
        Duration::from_millis(self.idle_time_ms)
    }

    pub fn monitor_interval_duration(&self) -> Duration {
        // A zero interval would spin the monitor.
        Duration::from_millis(self.monitor_interval_ms.max(1))
    }

    pub fn wait_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Pool statistics for one data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of open connections (in use + idle)
    pub open: usize,
    /// Number of idle connections
    pub idle: usize,
    /// Number of checked-out connections
    pub in_use: usize,
    /// Number of callers blocked in `get`
    pub waiting: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_size, 5);
        assert_eq!(config.idle_time_duration(), Duration::from_secs(15));
        assert_eq!(config.monitor_interval_duration(), Duration::from_secs(5));
        assert_eq!(config.wait_timeout_duration(), Duration::from_secs(30));
        assert!(!config.interlocked_open);
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new(2)
            .idle_time(100)
            .monitor_interval(0)
            .wait_timeout(50)
            .interlocked_open(true);
        assert_eq!(config.max_size, 2);
        assert!(config.interlocked_open);
        assert_eq!(config.idle_time_ms, 100);
        assert_eq!(config.monitor_interval_duration(), Duration::from_millis(1));
        assert_eq!(config.wait_timeout_ms, 50);
    }

    #[test]
    fn test_partial_json() {
        let config: PoolConfig = serde_json::from_str(r#"{"max_size": 3}"#).unwrap();
        assert_eq!(config, PoolConfig::new(3));
    }
}
