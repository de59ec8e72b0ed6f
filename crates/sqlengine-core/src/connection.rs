//! Dialect-aware connection wrapper over a driver backend.

use crate::backend::{ConnectionBackend, CursorBackend, DriverRegistry};
use crate::dialect::{DialectRegistry, SqlDialect};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::source::SqlSource;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// An open connection: a backend plus its source, dialect and transaction state.
///
/// Statements run through one current cursor; `exec_direct` and `prepare`
/// replace it. A connection is owned by one thread at a time.
pub struct SqlConnection {
    source: SqlSource,
    dialect: Arc<dyn SqlDialect>,
    backend: Option<Box<dyn ConnectionBackend>>,
    cursor: Option<Box<dyn CursorBackend>>,
    in_transaction: bool,
    activity: bool,
    bad: bool,
}

impl SqlConnection {
    /// Open a connection, resolving dialect and driver from the registries.
    pub fn open(
        source: &SqlSource,
        drivers: &DriverRegistry,
        dialects: &DialectRegistry,
    ) -> Result<Self> {
        let dialect = dialects.get(&source.dialect)?;
        let driver = drivers.for_source(source)?;
        tracing::debug!(
            source = %source.id,
            driver = driver.name(),
            dialect = dialect.name(),
            "Opening connection"
        );
        let backend = driver.open(dialect.as_ref(), source).inspect_err(|e| {
            tracing::warn!(source = %source.id, error = %e, "Failed to open connection");
        })?;
        Ok(Self::from_backend(source.clone(), dialect, backend))
    }

    /// Wrap an already open backend.
    pub fn from_backend(
        source: SqlSource,
        dialect: Arc<dyn SqlDialect>,
        backend: Box<dyn ConnectionBackend>,
    ) -> Self {
        Self {
            source,
            dialect,
            backend: Some(backend),
            cursor: None,
            in_transaction: false,
            activity: false,
            bad: false,
        }
    }

    pub fn source(&self) -> &SqlSource {
        &self.source
    }

    pub fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Set after any backend failure (statement or transaction); a pool
    /// closes bad connections instead of reusing them. Misuse caught before
    /// reaching the backend, such as exec without prepare, does not count.
    pub fn is_bad(&self) -> bool {
        self.bad
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Whether statements ran since the transaction began.
    pub fn has_activity(&self) -> bool {
        self.activity
    }

    /// Execute a statement without parameters on a fresh cursor.
    pub fn exec_direct(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(source = %self.source.id, sql = %sql, "exec_direct");
        let mut cursor = self.new_cursor()?;
        let result = cursor.exec_direct(sql).inspect_err(|e| log_failure(&self.source, sql, e));
        self.mark_bad_on_error(result)?;
        self.cursor = Some(cursor);
        self.activity = true;
        Ok(())
    }

    /// Prepare a statement on a fresh cursor. On failure no statement stays prepared.
    pub fn prepare(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(source = %self.source.id, sql = %sql, "prepare");
        self.cursor = None;
        let mut cursor = self.new_cursor()?;
        let result = cursor.prepare(sql).inspect_err(|e| log_failure(&self.source, sql, e));
        self.mark_bad_on_error(result)?;
        self.cursor = Some(cursor);
        Ok(())
    }

    /// Execute the prepared statement.
    pub fn exec(&mut self, params: &[Value]) -> Result<()> {
        tracing::trace!(source = %self.source.id, params = ?params, "exec");
        let result = self.current_cursor()?.exec(params);
        self.mark_bad_on_error(result)?;
        self.activity = true;
        Ok(())
    }

    /// Fetch the next row of the current result set.
    pub fn fetch_row(&mut self) -> Result<Option<Row>> {
        let result = self.current_cursor()?.fetch_row();
        self.mark_bad_on_error(result)
    }

    /// Fetch every remaining row, or at most `max_rows` when given.
    pub fn fetch_rows(&mut self, max_rows: Option<usize>) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while max_rows.is_none_or(|max| rows.len() < max) {
            match self.fetch_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Rows changed by the last statement, if the backend reports it.
    pub fn row_count(&self) -> Option<u64> {
        self.cursor.as_ref().and_then(|c| c.row_count())
    }

    pub fn begin_trans_if_necessary(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        tracing::debug!(source = %self.source.id, "BEGIN");
        let result = self.backend_mut()?.begin_trans();
        self.mark_bad_on_error(result)?;
        self.in_transaction = true;
        self.activity = false;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        tracing::debug!(source = %self.source.id, "COMMIT");
        self.cursor = None;
        let result = self.backend_mut()?.commit();
        self.mark_bad_on_error(result)?;
        self.in_transaction = false;
        self.activity = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        tracing::debug!(source = %self.source.id, "ROLLBACK");
        self.cursor = None;
        let result = self.backend_mut()?.rollback();
        self.in_transaction = false;
        self.activity = false;
        self.mark_bad_on_error(result)
    }

    /// Reset the connection for reuse: drop the cursor and roll back any
    /// open transaction. A failing rollback marks the connection bad.
    pub fn clear(&mut self) {
        self.cursor = None;
        if let Err(e) = self.rollback() {
            tracing::warn!(source = %self.source.id, error = %e, "Rollback on clear failed");
        }
    }

    /// Close the backend. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.cursor = None;
        match self.backend.take() {
            Some(mut backend) => {
                tracing::debug!(source = %self.source.id, "Closing connection");
                self.in_transaction = false;
                backend.close()
            }
            None => Ok(()),
        }
    }

    fn backend_mut(&mut self) -> Result<&mut Box<dyn ConnectionBackend>> {
        self.backend
            .as_mut()
            .ok_or_else(|| Error::generic("Connection is closed"))
    }

    fn new_cursor(&mut self) -> Result<Box<dyn CursorBackend>> {
        let result = self.backend_mut()?.new_cursor();
        self.mark_bad_on_error(result)
    }

    fn current_cursor(&mut self) -> Result<&mut Box<dyn CursorBackend>> {
        self.cursor
            .as_mut()
            .ok_or_else(|| Error::bad_sql_operation("No statement prepared"))
    }

    fn mark_bad_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(source = %self.source.id, error = %e, "Connection marked bad");
            self.bad = true;
        }
        result
    }
}

fn log_failure(source: &SqlSource, sql: &str, err: &Error) {
    tracing::warn!(source = %source.id, sql = %sql, error = %err, "Statement failed");
}

impl Drop for SqlConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(source = %self.source.id, error = %e, "Error closing connection");
        }
    }
}

impl fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConnection")
            .field("source", &self.source.id)
            .field("dialect", &self.dialect.name())
            .field("open", &self.is_open())
            .field("in_transaction", &self.in_transaction)
            .field("bad", &self.bad)
            .finish()
    }
}
