//! sqlengine - a mode-gated SQL execution core.
//!
//! sqlengine provides:
//!
//! - `Value`, a typed scalar for parameters and fetched columns
//! - `Filter`, composable predicates rendering to literal or parameterized SQL
//! - Per-database `SqlDialect` strategies
//! - An `Engine` that enforces its transaction `Mode` before any backend I/O
//! - A per-source `ConnectionPool` with background idle reclamation
//! - A bundled SQLite backend
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlengine::prelude::*;
//!
//! let conn = sqlengine::connect("sqlite:///tmp/app.db")?;
//! let mut engine = Engine::new(Mode::ReadWrite, conn);
//!
//! engine.exec_direct("CREATE TABLE T_HERO (ID INTEGER PRIMARY KEY, NAME VARCHAR(40))")?;
//! engine.insert(
//!     "T_HERO",
//!     &[vec![("ID".into(), Value::from(1)), ("NAME".into(), Value::from("Spider-Man"))]],
//!     &[],
//!     false,
//! )?;
//! engine.commit()?;
//!
//! let name = engine.select1("NAME", "T_HERO", &filter_eq("ID", 1))?;
//! ```
//!
//! # Pooling
//!
//! ```ignore
//! let config = EngineConfig::load("sqlengine.json")?;
//! let pool = config.build_pool(
//!     Arc::new(sqlengine::default_drivers()),
//!     Arc::new(DialectRegistry::standard()),
//! )?;
//! let mut engine = Engine::with_pool(config.mode, pool, "main")?;
//! ```

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{Engine, Mode, RowData, Select, SelectIter};

pub use sqlengine_core::{
    ColumnInfo, CompareOp, ConnectionBackend, CursorBackend, DbError, DbErrorKind, Decimal,
    DialectRegistry, DriverRegistry, Error, Filter, Junction, NaiveDateTime, PoolError,
    PoolErrorKind, Result, Row, SqlConnection, SqlDialect, SqlDriver, SqlSource, Value, ValueType,
    filter_eq, filter_ge, filter_gt, filter_le, filter_lt, filter_ne, mk_dialect,
};

pub use sqlengine_pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};

pub use sqlengine_sqlite::SqliteDriver;

use std::sync::Arc;

/// Driver registry with every bundled backend; SQLite is the default driver
/// for the `SQLITE` dialect.
pub fn default_drivers() -> DriverRegistry {
    DriverRegistry::builder()
        .register_default("SQLITE", Arc::new(SqliteDriver))
        .build()
}

/// Open a direct connection to a source URL with the bundled drivers.
pub fn connect(url: &str) -> Result<SqlConnection> {
    let source = SqlSource::parse(url)?;
    SqlConnection::open(&source, &default_drivers(), &DialectRegistry::standard())
}

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::{
        ConnectionPool, DialectRegistry, DriverRegistry, Engine, EngineConfig, Error, Filter,
        Mode, PoolConfig, Result, Row, RowData, Select, SqlConnection, SqlSource, Value,
        filter_eq, filter_ge, filter_gt, filter_le, filter_lt, filter_ne,
    };
    pub use std::sync::Arc;
}
