//! Error types for sqlengine operations.

use std::fmt;

/// The primary error type for all sqlengine operations.
#[derive(Debug)]
pub enum Error {
    /// Database errors raised by the engine or translated from a backend
    Db(DbError),
    /// Unknown dialect or a capability the dialect does not have
    Dialect(String),
    /// Unknown driver or driver registration problems
    Driver(String),
    /// A non-null accessor was called on `Value::Null`
    ValueIsNull,
    /// The stored value can't be converted to the requested type
    ValueBadCast(BadCastError),
    /// Pool errors (unknown source, checkout timeout, shutdown)
    Pool(PoolError),
    /// Configuration errors
    Config(ConfigError),
    /// I/O errors
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct DbError {
    pub kind: DbErrorKind,
    pub message: String,
    pub sql: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Opaque backend failure; the native message is kept as text
    Generic,
    /// A "must return one" read saw zero or several rows
    NoDataFound,
    /// Statement shape violation (empty column list, multi-column scalar read)
    BadSqlOperation,
    /// Operation not permitted in the engine's mode
    BadOperationInMode,
}

#[derive(Debug, Clone)]
pub struct BadCastError {
    pub value: String,
    pub target: &'static str,
}

#[derive(Debug)]
pub struct PoolError {
    pub kind: PoolErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    /// No source registered under the requested id
    InvalidDataSource,
    /// No connection became available before the deadline
    Timeout,
    /// Pool is shut down
    Closed,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Backend failure carrying the native message.
    pub fn generic(message: impl Into<String>) -> Self {
        Error::Db(DbError::new(DbErrorKind::Generic, message))
    }

    pub fn no_data_found(message: impl Into<String>) -> Self {
        Error::Db(DbError::new(DbErrorKind::NoDataFound, message))
    }

    pub fn bad_sql_operation(message: impl Into<String>) -> Self {
        Error::Db(DbError::new(DbErrorKind::BadSqlOperation, message))
    }

    pub fn bad_operation_in_mode(message: impl Into<String>) -> Self {
        Error::Db(DbError::new(DbErrorKind::BadOperationInMode, message))
    }

    pub fn dialect(message: impl Into<String>) -> Self {
        Error::Dialect(message.into())
    }

    pub fn bad_cast(value: impl Into<String>, target: &'static str) -> Self {
        Error::ValueBadCast(BadCastError {
            value: value.into(),
            target,
        })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Kind of a database error, if this is one.
    pub fn db_kind(&self) -> Option<DbErrorKind> {
        match self {
            Error::Db(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Is this a pool checkout timeout (as opposed to a connection failure)?
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Pool(p) if p.kind == PoolErrorKind::Timeout)
    }

    pub fn is_mode_violation(&self) -> bool {
        self.db_kind() == Some(DbErrorKind::BadOperationInMode)
    }

    pub fn is_no_data(&self) -> bool {
        self.db_kind() == Some(DbErrorKind::NoDataFound)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Db(e) => e.sql.as_deref(),
            _ => None,
        }
    }
}

impl DbError {
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sql: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

impl PoolError {
    pub fn new(kind: PoolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Db(e) => write!(f, "{}", e),
            Error::Dialect(msg) => write!(f, "SQL dialect error: {}", msg),
            Error::Driver(msg) => write!(f, "SQL driver error: {}", msg),
            Error::ValueIsNull => write!(f, "Trying to get value of null"),
            Error::ValueBadCast(e) => write!(f, "{}", e),
            Error::Pool(e) => write!(f, "Pool error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            DbErrorKind::Generic => "Database error, details: ",
            DbErrorKind::NoDataFound => "Data wasn't found, details: ",
            DbErrorKind::BadSqlOperation => "Bad SQL operation: ",
            DbErrorKind::BadOperationInMode => "Bad operation in mode: ",
        };
        write!(f, "{}{}", prefix, self.message)
    }
}

impl fmt::Display for BadCastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Can't cast value '{}' to type {}", self.value, self.target)
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Error::Db(err)
    }
}

impl From<PoolError> for Error {
    fn from(err: PoolError) -> Self {
        Error::Pool(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(ConfigError {
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

/// Result type alias for sqlengine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_error_prefixes() {
        assert_eq!(
            Error::generic("disk I/O error").to_string(),
            "Database error, details: disk I/O error"
        );
        assert_eq!(
            Error::no_data_found("Unable to fetch exactly one row!").to_string(),
            "Data wasn't found, details: Unable to fetch exactly one row!"
        );
        assert_eq!(
            Error::bad_cast("abc", "Integer").to_string(),
            "Can't cast value 'abc' to type Integer"
        );
        assert_eq!(Error::ValueIsNull.to_string(), "Trying to get value of null");
    }

    #[test]
    fn kind_predicates() {
        let timeout = Error::Pool(PoolError::new(
            PoolErrorKind::Timeout,
            "Can't get connection",
        ));
        assert!(timeout.is_timeout());
        assert!(!timeout.is_mode_violation());

        let conn_failure = Error::generic("unable to open database file");
        assert!(!conn_failure.is_timeout());

        let mode = Error::bad_operation_in_mode("Using INSERT operation in read-only mode");
        assert!(mode.is_mode_violation());
        assert_eq!(mode.db_kind(), Some(DbErrorKind::BadOperationInMode));

        assert!(Error::no_data_found("none").is_no_data());
    }

    #[test]
    fn sql_is_attached() {
        let err: Error = DbError::new(DbErrorKind::Generic, "syntax error")
            .with_sql("SELEC 1")
            .into();
        assert_eq!(err.sql(), Some("SELEC 1"));
        assert_eq!(Error::ValueIsNull.sql(), None);
    }
}
