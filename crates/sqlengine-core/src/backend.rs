//! Driver backend abstraction.
//!
//! A driver opens [`ConnectionBackend`]s; a connection hands out
//! [`CursorBackend`]s that prepare, execute and fetch. Backends translate every
//! native failure into [`Error::Db`] with the native message as text, so no
//! driver-specific error type escapes this boundary.

use crate::dialect::SqlDialect;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::source::{DEFAULT_DRIVER, SqlSource};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Statement execution over one backend connection.
pub trait CursorBackend: Send {
    /// Execute a statement without parameters.
    fn exec_direct(&mut self, sql: &str) -> Result<()>;

    /// Prepare a statement for [`exec`](Self::exec). A failed prepare leaves
    /// no previously prepared statement behind.
    fn prepare(&mut self, sql: &str) -> Result<()>;

    /// Execute the prepared statement with positional parameters.
    fn exec(&mut self, params: &[Value]) -> Result<()>;

    /// Fetch the next row of the current result set, `None` once exhausted.
    fn fetch_row(&mut self) -> Result<Option<Row>>;

    /// Rows changed by the last executed statement, if the backend knows.
    fn row_count(&self) -> Option<u64> {
        None
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

/// One open native connection.
pub trait ConnectionBackend: Send {
    fn begin_trans(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn new_cursor(&mut self) -> Result<Box<dyn CursorBackend>>;

    /// Release the native handle. Further calls fail.
    fn close(&mut self) -> Result<()>;
}

/// Factory of backend connections for one client library.
pub trait SqlDriver: Send + Sync {
    /// Registry name, uppercase.
    fn name(&self) -> &str;

    /// Open a connection to `source`.
    fn open(&self, dialect: &dyn SqlDialect, source: &SqlSource) -> Result<Box<dyn ConnectionBackend>>;
}

/// Drivers by name, assembled once at startup.
///
/// Besides its own name, a driver can be registered as the `DEFAULT` driver
/// of a dialect; sources naming driver `DEFAULT` resolve through that table.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn SqlDriver>>,
    defaults: BTreeMap<String, Arc<dyn SqlDriver>>,
}

impl DriverRegistry {
    pub fn builder() -> DriverRegistryBuilder {
        DriverRegistryBuilder::default()
    }

    /// Resolve a driver by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SqlDriver>> {
        self.drivers
            .get(&name.to_uppercase())
            .cloned()
            .ok_or_else(|| Error::Driver(format!("Unknown driver: {}", name)))
    }

    /// Resolve the driver a source asks for.
    pub fn for_source(&self, source: &SqlSource) -> Result<Arc<dyn SqlDriver>> {
        if source.driver.is_empty() || source.driver.eq_ignore_ascii_case(DEFAULT_DRIVER) {
            return self.defaults.get(&source.dialect).cloned().ok_or_else(|| {
                Error::Driver(format!(
                    "Unknown driver: {} (no default driver for dialect {})",
                    DEFAULT_DRIVER, source.dialect
                ))
            });
        }
        self.get(&source.driver)
    }

    pub fn names(&self) -> Vec<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("defaults", &self.defaults.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct DriverRegistryBuilder {
    drivers: BTreeMap<String, Arc<dyn SqlDriver>>,
    defaults: BTreeMap<String, Arc<dyn SqlDriver>>,
}

impl DriverRegistryBuilder {
    /// Register a driver under its own name.
    pub fn register(mut self, driver: Arc<dyn SqlDriver>) -> Self {
        self.drivers.insert(driver.name().to_uppercase(), driver);
        self
    }

    /// Register a driver and make it the default for `dialect`.
    pub fn register_default(mut self, dialect: &str, driver: Arc<dyn SqlDriver>) -> Self {
        self.defaults
            .insert(dialect.to_uppercase(), Arc::clone(&driver));
        self.register(driver)
    }

    pub fn build(self) -> DriverRegistry {
        DriverRegistry {
            drivers: self.drivers,
            defaults: self.defaults,
        }
    }
}
