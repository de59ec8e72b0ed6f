//! Core types and traits for sqlengine.
//!
//! This crate provides the foundations the engine and the backends share:
//!
//! - `Value`, the tagged scalar used for parameters and fetched columns
//! - `Filter`, an immutable predicate tree rendering to SQL text
//! - `SqlDialect` strategies and their `DialectRegistry`
//! - `SqlDriver` / `ConnectionBackend` / `CursorBackend`, the backend seam
//! - `SqlConnection`, a dialect-aware connection over a backend
//! - `SqlSource`, the data-source descriptor

pub mod backend;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod row;
pub mod source;
pub mod value;

pub use backend::{ConnectionBackend, CursorBackend, DriverRegistry, DriverRegistryBuilder, SqlDriver};
pub use connection::SqlConnection;
pub use dialect::{DialectRegistry, SqlDialect, mk_dialect};
pub use error::{DbError, DbErrorKind, Error, PoolError, PoolErrorKind, Result};
pub use filter::{
    CompareOp, Filter, Junction, filter_eq, filter_ge, filter_gt, filter_le, filter_lt, filter_ne,
};
pub use row::{ColumnInfo, Row};
pub use source::SqlSource;
pub use value::{Value, ValueType};

pub use chrono::NaiveDateTime;
pub use rust_decimal::Decimal;
