//! SQLite connection and cursor backends.
//!
//! This module provides safe wrappers around SQLite's C API and implements
//! the `ConnectionBackend` / `CursorBackend` traits from sqlengine-core.
//! The database handle is shared between a connection and its cursors via
//! `Arc`; the native connection is closed once the last of them is dropped.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers

use crate::ffi;
use crate::types::{self, ColumnKind};
use sqlengine_core::error::{DbError, DbErrorKind};
use sqlengine_core::{
    ColumnInfo, ConnectionBackend, CursorBackend, Error, Result, Row, SqlDialect, SqlDriver,
    SqlSource, Value,
};
use std::ffi::{CString, c_int};
use std::ptr;
use std::sync::Arc;

/// Driver name under which the backend registers.
pub const DRIVER_NAME: &str = "SQLITE";

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        // A connection and its cursors may run on whichever thread currently
        // owns the pooled connection; serialized mode keeps that sound.
        let mut flags = ffi::SQLITE_OPEN_FULLMUTEX;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Build a config from a data source.
    ///
    /// An empty database path opens an in-memory database.
    /// Recognized options: `busy_timeout` (milliseconds), `mode=ro`, `uri=1`.
    pub fn from_source(source: &SqlSource) -> Result<Self> {
        let mut config = if source.db.is_empty() {
            Self::memory()
        } else {
            Self::file(source.db.clone())
        };
        if let Some(ms) = source.option("busy_timeout") {
            config.busy_timeout_ms = ms
                .parse()
                .map_err(|_| Error::config(format!("Bad busy_timeout: {}", ms)))?;
        }
        if source.option("mode") == Some("ro") {
            config.flags = OpenFlags::read_only();
        }
        if matches!(source.option("uri"), Some("1" | "true")) {
            config.flags.uri = true;
        }
        Ok(config)
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Owned native database handle, closed on drop.
struct DbHandle {
    db: *mut ffi::sqlite3,
}

// SAFETY: handles are opened with SQLITE_OPEN_FULLMUTEX, so SQLite serializes
// every call on the connection internally.
unsafe impl Send for DbHandle {}
unsafe impl Sync for DbHandle {}

impl Drop for DbHandle {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: db is valid and no statement outlives the last handle
            unsafe {
                ffi::sqlite3_close_v2(self.db);
            }
        }
    }
}

/// Owned prepared statement, finalized on drop.
struct Statement {
    raw: *mut ffi::sqlite3_stmt,
}

// SAFETY: a statement is used only through its owning cursor, which holds the
// serialized-mode connection alive.
unsafe impl Send for Statement {}

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: raw came from sqlite3_prepare_v2 and is finalized once
        unsafe {
            ffi::sqlite3_finalize(self.raw);
        }
    }
}

/// A connection to a SQLite database.
pub struct SqliteConnection {
    handle: Option<Arc<DbHandle>>,
    path: String,
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str())
            .map_err(|_| Error::config("Invalid path: contains null byte"))?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: db is valid even on failure and must still be closed
                unsafe {
                    let msg = ffi::errmsg(db);
                    ffi::sqlite3_close_v2(db);
                    msg
                }
            };
            tracing::warn!(path = %config.path, error = %msg, "Failed to open SQLite database");
            return Err(Error::generic(format!("Failed to open database: {}", msg)));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::debug!(path = %config.path, version = ffi::version(), "Opened SQLite database");
        Ok(Self {
            handle: Some(Arc::new(DbHandle { db })),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execute one statement, discarding any result rows.
    pub fn execute_raw(&self, sql: &str) -> Result<()> {
        let handle = self.handle()?;
        let stmt = prepare_stmt(handle.db, sql)?;
        // SAFETY: stmt is valid
        let rc = unsafe { ffi::sqlite3_step(stmt.raw) };
        if rc != ffi::SQLITE_DONE && rc != ffi::SQLITE_ROW {
            return Err(native_error(handle.db, sql));
        }
        Ok(())
    }

    fn handle(&self) -> Result<&Arc<DbHandle>> {
        self.handle
            .as_ref()
            .ok_or_else(|| Error::generic("SQLite connection is closed"))
    }
}

impl ConnectionBackend for SqliteConnection {
    fn begin_trans(&mut self) -> Result<()> {
        self.execute_raw("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_raw("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_raw("ROLLBACK")
    }

    fn new_cursor(&mut self) -> Result<Box<dyn CursorBackend>> {
        let handle = Arc::clone(self.handle()?);
        Ok(Box::new(SqliteCursor::new(handle)))
    }

    fn close(&mut self) -> Result<()> {
        if self.handle.take().is_some() {
            tracing::debug!(path = %self.path, "Closed SQLite connection");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Nothing executed since the last prepare
    Idle,
    /// The first step produced a row that was not fetched yet
    RowPending,
    /// Rows are being fetched; the next fetch steps
    Fetching,
    Done,
}

/// Statement execution over a SQLite connection.
pub struct SqliteCursor {
    db: Arc<DbHandle>,
    stmt: Option<Statement>,
    sql: String,
    columns: Arc<ColumnInfo>,
    kinds: Vec<ColumnKind>,
    state: CursorState,
    changes: Option<u64>,
}

impl SqliteCursor {
    fn new(db: Arc<DbHandle>) -> Self {
        Self {
            db,
            stmt: None,
            sql: String::new(),
            columns: Arc::new(ColumnInfo::new(Vec::<String>::new())),
            kinds: Vec::new(),
            state: CursorState::Idle,
            changes: None,
        }
    }

    fn statement(&self) -> Result<*mut ffi::sqlite3_stmt> {
        self.stmt
            .as_ref()
            .map(|s| s.raw)
            .ok_or_else(|| Error::bad_sql_operation("No statement prepared"))
    }

    fn step(&mut self) -> Result<bool> {
        let stmt = self.statement()?;
        // SAFETY: stmt is valid
        match unsafe { ffi::sqlite3_step(stmt) } {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => {
                // SAFETY: db is valid
                let changes = unsafe { ffi::sqlite3_changes(self.db.db) };
                self.changes = u64::try_from(changes).ok();
                self.state = CursorState::Done;
                Ok(false)
            }
            _ => {
                self.state = CursorState::Done;
                Err(native_error(self.db.db, &self.sql))
            }
        }
    }

    fn read_row(&self, stmt: *mut ffi::sqlite3_stmt) -> Row {
        let values = self
            .kinds
            .iter()
            .enumerate()
            // SAFETY: stmt just returned SQLITE_ROW and i < column count
            .map(|(i, kind)| unsafe { types::read_column(stmt, i as c_int, *kind) })
            .collect();
        Row::with_columns(Arc::clone(&self.columns), values)
    }
}

impl CursorBackend for SqliteCursor {
    fn exec_direct(&mut self, sql: &str) -> Result<()> {
        self.prepare(sql)?;
        self.exec(&[])
    }

    fn prepare(&mut self, sql: &str) -> Result<()> {
        self.stmt = None;
        self.state = CursorState::Idle;
        self.changes = None;
        self.sql = sql.to_string();

        let stmt = prepare_stmt(self.db.db, sql)?;
        // SAFETY: stmt is valid
        let count = unsafe { ffi::sqlite3_column_count(stmt.raw) };
        let mut names = Vec::with_capacity(count as usize);
        let mut kinds = Vec::with_capacity(count as usize);
        for i in 0..count {
            // SAFETY: stmt is valid, i < column count
            let (name, decltype) =
                unsafe { (types::column_name(stmt.raw, i), types::column_decltype(stmt.raw, i)) };
            names.push(name.unwrap_or_else(|| format!("COL{}", i)));
            kinds.push(ColumnKind::from_decltype(decltype.as_deref()));
        }
        self.columns = Arc::new(ColumnInfo::new(names));
        self.kinds = kinds;
        self.stmt = Some(stmt);
        Ok(())
    }

    fn exec(&mut self, params: &[Value]) -> Result<()> {
        let stmt = self.statement()?;
        // SAFETY: stmt is valid
        unsafe {
            ffi::sqlite3_reset(stmt);
            ffi::sqlite3_clear_bindings(stmt);
        }
        self.changes = None;

        // SAFETY: stmt is valid
        let expected = unsafe { ffi::sqlite3_bind_parameter_count(stmt) } as usize;
        if expected != params.len() {
            return Err(DbError::new(
                DbErrorKind::Generic,
                format!("Expected {} parameters, got {}", expected, params.len()),
            )
            .with_sql(self.sql.clone())
            .into());
        }
        for (i, param) in params.iter().enumerate() {
            // SAFETY: stmt is valid, index is 1-based and within the count
            let rc = unsafe { types::bind_value(stmt, (i + 1) as c_int, param) };
            if rc != ffi::SQLITE_OK {
                return Err(native_error(self.db.db, &self.sql));
            }
        }

        self.state = if self.step()? {
            CursorState::RowPending
        } else {
            CursorState::Done
        };
        Ok(())
    }

    fn fetch_row(&mut self) -> Result<Option<Row>> {
        let stmt = self.statement()?;
        match self.state {
            CursorState::Idle => Err(Error::bad_sql_operation("Statement was not executed")),
            CursorState::RowPending => {
                self.state = CursorState::Fetching;
                Ok(Some(self.read_row(stmt)))
            }
            CursorState::Fetching => {
                if self.step()? {
                    Ok(Some(self.read_row(stmt)))
                } else {
                    Ok(None)
                }
            }
            CursorState::Done => Ok(None),
        }
    }

    fn row_count(&self) -> Option<u64> {
        self.changes
    }
}

/// The SQLite driver: opens [`SqliteConnection`]s for `SQLITE` sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqlDriver for SqliteDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn open(&self, dialect: &dyn SqlDialect, source: &SqlSource) -> Result<Box<dyn ConnectionBackend>> {
        if dialect.name() != "SQLITE" {
            return Err(Error::Driver(format!(
                "SQLite driver can't serve dialect {}",
                dialect.name()
            )));
        }
        let config = SqliteConfig::from_source(source)?;
        Ok(Box::new(SqliteConnection::open(&config)?))
    }
}

// Helper functions

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<Statement> {
    let c_sql = CString::new(sql).map_err(|_| {
        Error::from(DbError::new(DbErrorKind::BadSqlOperation, "SQL contains null byte").with_sql(sql))
    })?;

    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(
            db,
            c_sql.as_ptr(),
            c_sql.as_bytes().len() as c_int,
            &mut stmt,
            ptr::null_mut(),
        )
    };

    if rc != ffi::SQLITE_OK {
        if !stmt.is_null() {
            // SAFETY: stmt came from the failed prepare
            unsafe { ffi::sqlite3_finalize(stmt) };
        }
        return Err(native_error(db, sql));
    }
    if stmt.is_null() {
        // Empty statement or only a comment.
        return Err(DbError::new(DbErrorKind::BadSqlOperation, "Empty SQL statement")
            .with_sql(sql)
            .into());
    }

    Ok(Statement { raw: stmt })
}

fn native_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let msg = unsafe { ffi::errmsg(db) };
    tracing::debug!(sql = %sql, error = %msg, "SQLite error");
    DbError::new(DbErrorKind::Generic, msg).with_sql(sql).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_all(cursor: &mut dyn CursorBackend, sql: &str, params: &[Value]) -> Vec<Row> {
        cursor.prepare(sql).unwrap();
        cursor.exec(params).unwrap();
        cursor.fetch_all().unwrap()
    }

    #[test]
    fn open_memory_and_select() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        let rows = exec_all(cursor.as_mut(), "SELECT 1 AS one, 'x' AS two, NULL AS three", &[]);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["ONE", "TWO", "THREE"]);
        assert_eq!(row.get(0), Some(&Value::Integer(1)));
        assert_eq!(row.get(1), Some(&Value::String("x".into())));
        assert_eq!(row.get(2), Some(&Value::Null));
    }

    #[test]
    fn integer_width() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        let rows = exec_all(cursor.as_mut(), "SELECT ?, ?", &[Value::LongInt(5), Value::LongInt(1 << 40)]);
        assert!(matches!(rows[0].get(0), Some(Value::Integer(5))));
        assert!(matches!(rows[0].get(1), Some(Value::LongInt(v)) if *v == 1 << 40));
    }

    #[test]
    fn real_columns_become_decimal() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        let rows = exec_all(cursor.as_mut(), "SELECT 2.5, 1e40", &[]);
        assert!(matches!(rows[0].get(0), Some(Value::Decimal(_))));
        assert!(matches!(rows[0].get(1), Some(Value::String(_))));
    }

    #[test]
    fn lazy_fetch_and_exhaustion() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw("CREATE TABLE t (a INTEGER)").unwrap();
        conn.execute_raw("INSERT INTO t VALUES (1), (2), (3)").unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        cursor.prepare("SELECT a FROM t ORDER BY a").unwrap();
        cursor.exec(&[]).unwrap();
        assert_eq!(cursor.fetch_row().unwrap().unwrap().get(0), Some(&Value::Integer(1)));
        assert_eq!(cursor.fetch_row().unwrap().unwrap().get(0), Some(&Value::Integer(2)));
        assert_eq!(cursor.fetch_row().unwrap().unwrap().get(0), Some(&Value::Integer(3)));
        assert!(cursor.fetch_row().unwrap().is_none());
        assert!(cursor.fetch_row().unwrap().is_none());
    }

    #[test]
    fn errors_carry_native_message() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        cursor.prepare("SELECT 1").unwrap();
        let err = cursor.prepare("SELEC 1").unwrap_err();
        assert_eq!(err.db_kind(), Some(DbErrorKind::Generic));
        assert!(err.to_string().contains("syntax error"), "{}", err);
        assert_eq!(err.sql(), Some("SELEC 1"));
        // The previous statement is gone.
        assert!(cursor.exec(&[]).is_err());
    }

    #[test]
    fn parameter_count_mismatch() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        cursor.prepare("SELECT ?").unwrap();
        assert!(cursor.exec(&[]).is_err());
    }

    #[test]
    fn fetch_before_exec() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        let mut cursor = conn.new_cursor().unwrap();
        assert!(cursor.fetch_row().is_err());
        cursor.prepare("SELECT 1").unwrap();
        assert!(cursor.fetch_row().is_err());
    }

    #[test]
    fn closed_connection() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        conn.close().unwrap();
        assert!(conn.new_cursor().is_err());
        assert!(conn.begin_trans().is_err());
    }

    #[test]
    fn config_from_source() {
        let source = SqlSource::parse("sqlite:///tmp/x.db?busy_timeout=250&mode=ro").unwrap();
        let config = SqliteConfig::from_source(&source).unwrap();
        assert_eq!(config.path, "/tmp/x.db");
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.flags.read_only);

        let bad = SqlSource::parse("sqlite:///tmp/x.db?busy_timeout=soon").unwrap();
        assert!(SqliteConfig::from_source(&bad).is_err());
    }

    #[test]
    fn driver_rejects_foreign_dialect() {
        let source = SqlSource::new("MYSQL", "db");
        let err = SqliteDriver
            .open(&sqlengine_core::dialect::MysqlDialect, &source)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Driver(_)));
    }
}
