//! SQLite backend for sqlengine.
//!
// FFI bindings require unsafe code
#![allow(unsafe_code)]
//!
//! This crate implements the `SqlDriver`, `ConnectionBackend` and
//! `CursorBackend` traits from sqlengine-core on top of libsqlite3, linked
//! statically from the bundled amalgamation.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlengine_core::{ConnectionBackend, Value};
//! use sqlengine_sqlite::SqliteConnection;
//!
//! let mut conn = SqliteConnection::open_memory()?;
//! conn.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let mut cursor = conn.new_cursor()?;
//! cursor.prepare("INSERT INTO users (name) VALUES (?)")?;
//! cursor.exec(&[Value::from("Alice")])?;
//! ```
//!
//! # Type Mapping
//!
//! | Value | Bound as | Fetched from |
//! |-------|----------|--------------|
//! | `Integer`, `LongInt` | INTEGER | INTEGER (32-bit if it fits) |
//! | `Float` | REAL | - |
//! | `Decimal` | TEXT | REAL, or TEXT in a `NUMERIC`/`DECIMAL` column |
//! | `DateTime` | TEXT (`YYYY-MM-DD HH:MM:SS`) | TEXT in a `DATE`/`TIME` column |
//! | `String` | TEXT | TEXT, BLOB |
//! | `Null` | NULL | NULL |
//!
//! # Thread Safety
//!
//! Connections are opened in serialized mode, so a connection and its
//! cursors can move between threads together with their owner.

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{
    DRIVER_NAME, OpenFlags, SqliteConfig, SqliteConnection, SqliteCursor, SqliteDriver,
};

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
