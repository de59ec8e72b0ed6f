//! Mode-gated statement execution.
//!
//! An [`Engine`] generates SELECT/INSERT/UPDATE/DELETE text through its
//! dialect, checks every mutating call against its [`Mode`] before touching
//! the backend, and tracks whether an uncommitted mutation happened.

use serde::{Deserialize, Serialize};
use sqlengine_core::{
    Error, Filter, Result, Row, SqlConnection, SqlDialect, Value,
};
use sqlengine_pool::{ConnectionPool, PooledConnection};
use std::fmt;
use std::sync::Arc;

/// Column/value pairs of one row to write, in column order.
pub type RowData = Vec<(String, Value)>;

/// Transaction mode, fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Selects only; every mutation is rejected
    ReadOnly,
    /// Any statement runs inside an implicitly started transaction
    #[default]
    ReadWrite,
    /// Transactions start only when the caller mutates
    Manual,
    /// Like `ReadWrite`, with every select upgraded to `SELECT ... FOR UPDATE`
    ForceSelectUpdate,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::ReadOnly => "read_only",
            Mode::ReadWrite => "read_write",
            Mode::Manual => "manual",
            Mode::ForceSelectUpdate => "force_select_update",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SELECT statement under construction.
///
/// ```ignore
/// let select = Select::new("A, COUNT(*)")
///     .from("T")
///     .filter(filter_gt("B", 1))
///     .group_by("A")
///     .having(Filter::sql("COUNT(*) > 2"))
///     .order_by("A");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Select {
    what: String,
    from: String,
    filter: Filter,
    group_by: String,
    having: Filter,
    order_by: String,
    for_update: bool,
    max_rows: Option<usize>,
}

impl Select {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            ..Self::default()
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = group_by.into();
        self
    }

    pub fn having(mut self, having: Filter) -> Self {
        self.having = having;
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    pub fn for_update(mut self, for_update: bool) -> Self {
        self.for_update = for_update;
        self
    }

    /// Stop fetching after `n` rows.
    pub fn max_rows(mut self, n: usize) -> Self {
        self.max_rows = Some(n);
        self
    }
}

enum Backend {
    Direct(SqlConnection),
    /// Checked out on first use, returned when the engine is dropped
    Pooled {
        pool: Arc<ConnectionPool>,
        source_id: String,
        conn: Option<PooledConnection>,
    },
    SqlOnly,
}

/// Statement dispatcher bound to one connection and one mode.
pub struct Engine {
    mode: Mode,
    dialect: Arc<dyn SqlDialect>,
    touched: bool,
    backend: Backend,
}

impl Engine {
    /// Run over a directly owned connection.
    pub fn new(mode: Mode, conn: SqlConnection) -> Self {
        Self {
            mode,
            dialect: Arc::clone(conn.dialect()),
            touched: false,
            backend: Backend::Direct(conn),
        }
    }

    /// Run over a connection borrowed from `pool` for source `source_id`.
    pub fn with_pool(mode: Mode, pool: Arc<ConnectionPool>, source_id: impl Into<String>) -> Result<Self> {
        let source_id = source_id.into();
        let dialect = pool.dialect_for(&source_id)?;
        Ok(Self {
            mode,
            dialect,
            touched: false,
            backend: Backend::Pooled {
                pool,
                source_id,
                conn: None,
            },
        })
    }

    /// Generate SQL only; anything that needs a connection fails.
    pub fn sql_only(mode: Mode, dialect: Arc<dyn SqlDialect>) -> Self {
        Self {
            mode,
            dialect,
            touched: false,
            backend: Backend::SqlOnly,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether a mutation happened since the last commit or rollback.
    pub fn touched(&self) -> bool {
        self.touched
    }

    pub fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }

    // SQL generation

    /// Render a SELECT, appending its bound parameters to `params`.
    pub fn select_sql(&self, select: &Select, params: &mut Vec<Value>) -> Result<String> {
        let mut sql = format!("SELECT {}", select.what);
        if !select.from.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&select.from);
        }
        if !select.filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&select.filter.collect_params_and_build_sql(params));
        }
        if !select.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&select.group_by);
        }
        if !select.having.is_empty() {
            if select.group_by.is_empty() {
                return Err(Error::bad_sql_operation("Having clause without group by"));
            }
            sql.push_str(" HAVING ");
            sql.push_str(&select.having.collect_params_and_build_sql(params));
        }
        if !select.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&select.order_by);
        }
        if self.wants_for_update(select) && self.dialect.has_for_update() {
            sql.push_str(" FOR UPDATE");
        }
        Ok(sql)
    }

    /// Render an INSERT for the columns of `row` not listed in `exclude`.
    pub fn insert_sql(&self, table: &str, row: &RowData, exclude: &[&str]) -> Result<String> {
        let columns = insert_columns(row, exclude);
        if columns.is_empty() {
            return Err(Error::bad_sql_operation(format!(
                "No columns to insert into {}",
                table
            )));
        }
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        let holders = vec!["?"; names.len()];
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            holders.join(", ")
        ))
    }

    /// Render an UPDATE setting every column of `row` that is neither a key
    /// nor excluded. The WHERE clause is `filter` followed by one equality per
    /// key field, in the given order.
    pub fn update_sql(
        &self,
        table: &str,
        row: &RowData,
        key_fields: &[&str],
        exclude: &[&str],
        filter: &Filter,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        let set: Vec<&(String, Value)> = row
            .iter()
            .filter(|(name, _)| !contains_name(key_fields, name) && !contains_name(exclude, name))
            .collect();
        if set.is_empty() {
            return Err(Error::bad_sql_operation(format!(
                "Nothing to update in {}",
                table
            )));
        }
        if filter.is_empty() && key_fields.is_empty() {
            return Err(Error::bad_sql_operation(format!(
                "No key and no filter to update {}",
                table
            )));
        }

        let assignments: Vec<String> = set.iter().map(|(name, _)| format!("{} = ?", name)).collect();
        params.extend(set.iter().map(|(_, value)| value.clone()));

        let mut conditions = Vec::with_capacity(key_fields.len() + 1);
        if !filter.is_empty() {
            conditions.push(filter.collect_params_and_build_sql(params));
        }
        for key in key_fields {
            let value = row
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    Error::bad_sql_operation(format!("Key field {} is missing in row", key))
                })?;
            conditions.push(format!("{} = ?", key));
            params.push(value);
        }

        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            join_conditions(&conditions)
        ))
    }

    /// Render a DELETE. An empty filter is rejected rather than wiping the table.
    pub fn delete_sql(&self, table: &str, filter: &Filter, params: &mut Vec<Value>) -> Result<String> {
        if filter.is_empty() {
            return Err(Error::bad_sql_operation(format!(
                "Refusing to delete from {} without a filter",
                table
            )));
        }
        Ok(format!(
            "DELETE FROM {} WHERE {}",
            table,
            filter.collect_params_and_build_sql(params)
        ))
    }

    // Reads

    /// Run a SELECT and fetch its rows.
    pub fn select_rows(&mut self, select: &Select) -> Result<Vec<Row>> {
        let max_rows = select.max_rows;
        self.start_select(select)?.fetch_rows(max_rows)
    }

    /// Run a SELECT and fetch its rows one at a time, as the caller pulls them.
    ///
    /// The iterator borrows the engine; dropping it early leaves the rest of
    /// the result set unread.
    pub fn select_iter(&mut self, select: &Select) -> Result<SelectIter<'_>> {
        let remaining = select.max_rows;
        let conn = self.start_select(select)?;
        Ok(SelectIter {
            conn,
            remaining,
            done: false,
        })
    }

    /// `SELECT what FROM from WHERE filter`.
    pub fn select(&mut self, what: &str, from: &str, filter: &Filter) -> Result<Vec<Row>> {
        self.select_rows(&Select::new(what).from(from).filter(filter.clone()))
    }

    /// Select exactly one row. At most two rows are fetched.
    pub fn select_row(&mut self, what: &str, from: &str, filter: &Filter) -> Result<Row> {
        let select = Select::new(what).from(from).filter(filter.clone());
        let mut rows = self.start_select(&select)?.fetch_rows(Some(2))?;
        if rows.len() != 1 {
            return Err(Error::no_data_found("Unable to fetch exactly one row!"));
        }
        Ok(rows.remove(0))
    }

    /// Select exactly one row of exactly one column.
    pub fn select1(&mut self, what: &str, from: &str, filter: &Filter) -> Result<Value> {
        let row = self.select_row(what, from, filter)?;
        if row.len() != 1 {
            return Err(Error::bad_sql_operation("Unable to fetch exactly one column!"));
        }
        Ok(row.into_values().remove(0))
    }

    pub fn get_curr_value(&mut self, seq_name: &str) -> Result<Value> {
        let what = self.dialect.select_curr_value(seq_name)?;
        let dual = self.dialect.dual_name().to_string();
        self.select1(&what, &dual, &Filter::default())
    }

    pub fn get_next_value(&mut self, seq_name: &str) -> Result<Value> {
        let what = self.dialect.select_next_value(seq_name)?;
        let dual = self.dialect.dual_name().to_string();
        self.select1(&what, &dual, &Filter::default())
    }

    // Writes

    /// Insert `rows` into `table`, skipping `exclude`d columns. With
    /// `collect_new_ids` the dialect's last-inserted-id query runs after each
    /// row and the ids are returned in row order.
    pub fn insert(
        &mut self,
        table: &str,
        rows: &[RowData],
        exclude: &[&str],
        collect_new_ids: bool,
    ) -> Result<Vec<i64>> {
        self.check_mode("Using INSERT operation in read-only mode")?;
        let last_id_sql = if collect_new_ids {
            Some(self.dialect.select_last_inserted_id(table)?)
        } else {
            None
        };
        let statements = rows
            .iter()
            .map(|row| {
                let sql = self.insert_sql(table, row, exclude)?;
                let params: Vec<Value> = insert_columns(row, exclude)
                    .into_iter()
                    .map(|(_, value)| value.clone())
                    .collect();
                Ok((sql, params))
            })
            .collect::<Result<Vec<_>>>()?;
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        self.touch()?;
        let conn = self.conn()?;
        let mut ids = Vec::new();
        let mut prepared: Option<&str> = None;
        for (sql, params) in &statements {
            if prepared != Some(sql.as_str()) {
                conn.prepare(sql)?;
                prepared = Some(sql);
            }
            conn.exec(params)?;
            if let Some(last_id_sql) = &last_id_sql {
                conn.exec_direct(last_id_sql)?;
                let row = conn
                    .fetch_row()?
                    .ok_or_else(|| Error::no_data_found(format!("No new id for {}", table)))?;
                let id = row
                    .get(0)
                    .ok_or_else(|| Error::no_data_found(format!("No new id for {}", table)))?
                    .as_longint()?;
                ids.push(id);
                prepared = None;
            }
        }
        Ok(ids)
    }

    /// Update `rows` of `table` by `key_fields`, narrowed by `filter`.
    pub fn update(
        &mut self,
        table: &str,
        rows: &[RowData],
        key_fields: &[&str],
        exclude: &[&str],
        filter: &Filter,
    ) -> Result<()> {
        self.check_mode("Using UPDATE operation in read-only mode")?;
        let statements = rows
            .iter()
            .map(|row| {
                let mut params = Vec::new();
                let sql = self.update_sql(table, row, key_fields, exclude, filter, &mut params)?;
                Ok((sql, params))
            })
            .collect::<Result<Vec<_>>>()?;
        if statements.is_empty() {
            return Ok(());
        }

        self.touch()?;
        let conn = self.conn()?;
        let mut prepared: Option<&str> = None;
        for (sql, params) in &statements {
            if prepared != Some(sql.as_str()) {
                conn.prepare(sql)?;
                prepared = Some(sql);
            }
            conn.exec(params)?;
        }
        Ok(())
    }

    /// Delete the rows of `table` matching `filter`.
    pub fn delete_from(&mut self, table: &str, filter: &Filter) -> Result<()> {
        self.check_mode("Using DELETE operation in read-only mode")?;
        let mut params = Vec::new();
        let sql = self.delete_sql(table, filter, &mut params)?;
        self.touch()?;
        let conn = self.conn()?;
        conn.prepare(&sql)?;
        conn.exec(&params)
    }

    /// Invoke a stored procedure call given as raw SQL.
    pub fn exec_proc(&mut self, proc_code: &str) -> Result<()> {
        self.check_mode("Trying to invoke a PROCEDURE in read-only mode")?;
        self.touch()?;
        self.conn()?.exec_direct(proc_code)
    }

    /// Run raw DDL or DML. Counts as a mutation.
    pub fn exec_direct(&mut self, sql: &str) -> Result<()> {
        self.check_mode("Using raw SQL in read-only mode")?;
        self.touch()?;
        self.conn()?.exec_direct(sql)
    }

    // Transactions

    /// Begin the backend transaction if none is open and mark the engine touched.
    pub fn touch(&mut self) -> Result<()> {
        self.check_mode("Starting a transaction in read-only mode")?;
        self.conn()?.begin_trans_if_necessary()?;
        self.touched = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.check_mode("Using COMMIT in read-only mode")?;
        if let Some(conn) = self.acquired() {
            conn.commit()?;
        }
        self.touched = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.check_mode("Using ROLLBACK in read-only mode")?;
        let result = match self.acquired() {
            Some(conn) => conn.rollback(),
            None => Ok(()),
        };
        self.touched = false;
        result
    }

    fn wants_for_update(&self, select: &Select) -> bool {
        select.for_update || self.mode == Mode::ForceSelectUpdate
    }

    // Mode check, transaction start, prepare and exec; rows are left unread.
    fn start_select(&mut self, select: &Select) -> Result<&mut SqlConnection> {
        let for_update = self.wants_for_update(select);
        if for_update {
            self.check_mode("Using SELECT FOR UPDATE in read-only mode")?;
        }
        let mut params = Vec::new();
        let sql = self.select_sql(select, &mut params)?;

        if for_update {
            self.touch()?;
        } else if self.mode != Mode::ReadOnly && self.mode != Mode::Manual {
            self.conn()?.begin_trans_if_necessary()?;
        }
        let conn = self.conn()?;
        conn.prepare(&sql)?;
        conn.exec(&params)?;
        Ok(conn)
    }

    fn check_mode(&self, message: &str) -> Result<()> {
        if self.mode == Mode::ReadOnly {
            tracing::warn!(mode = %self.mode, "{}", message);
            return Err(Error::bad_operation_in_mode(message));
        }
        Ok(())
    }

    /// The connection, checking one out of the pool on first use.
    fn conn(&mut self) -> Result<&mut SqlConnection> {
        match &mut self.backend {
            Backend::Direct(conn) => Ok(conn),
            Backend::Pooled {
                pool,
                source_id,
                conn,
            } => {
                if conn.is_none() {
                    *conn = Some(pool.get(source_id)?);
                }
                conn.as_deref_mut()
                    .ok_or_else(|| Error::bad_sql_operation("No connection"))
            }
            Backend::SqlOnly => Err(Error::bad_sql_operation("No connection")),
        }
    }

    /// The connection if one is already held; never opens or checks out.
    fn acquired(&mut self) -> Option<&mut SqlConnection> {
        match &mut self.backend {
            Backend::Direct(conn) => Some(conn),
            Backend::Pooled { conn, .. } => conn.as_deref_mut(),
            Backend::SqlOnly => None,
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Backend::Direct(_) => "direct",
            Backend::Pooled { .. } => "pooled",
            Backend::SqlOnly => "sql_only",
        };
        f.debug_struct("Engine")
            .field("mode", &self.mode)
            .field("dialect", &self.dialect.name())
            .field("touched", &self.touched)
            .field("backend", &backend)
            .finish()
    }
}

/// Rows of a running SELECT, fetched lazily from the engine's connection.
pub struct SelectIter<'a> {
    conn: &'a mut SqlConnection,
    remaining: Option<usize>,
    done: bool,
}

impl Iterator for SelectIter<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }
        match self.conn.fetch_row() {
            Ok(Some(row)) => {
                if let Some(n) = self.remaining.as_mut() {
                    *n -= 1;
                }
                Some(Ok(row))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl fmt::Debug for SelectIter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectIter")
            .field("remaining", &self.remaining)
            .field("done", &self.done)
            .finish()
    }
}

fn contains_name(names: &[&str], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

fn insert_columns<'a>(row: &'a RowData, exclude: &[&str]) -> Vec<&'a (String, Value)> {
    row.iter()
        .filter(|(name, _)| !contains_name(exclude, name))
        .collect()
}

// One condition stays bare; several are each parenthesized and ANDed.
fn join_conditions(conditions: &[String]) -> String {
    if let [single] = conditions {
        return single.clone();
    }
    conditions
        .iter()
        .map(|c| format!("({})", c))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlengine_core::{filter_eq, filter_gt, mk_dialect};

    fn engine(dialect: &str) -> Engine {
        Engine::sql_only(Mode::ReadWrite, mk_dialect(dialect).unwrap())
    }

    fn row(pairs: &[(&str, Value)]) -> RowData {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn select_clauses() {
        let e = engine("ORACLE");
        let mut params = Vec::new();
        assert_eq!(
            e.select_sql(&Select::new("A, B").from("T"), &mut params).unwrap(),
            "SELECT A, B FROM T"
        );

        let select = Select::new("A, COUNT(*)")
            .from("T")
            .filter(filter_gt("B", 1))
            .group_by("A")
            .having(Filter::sql("COUNT(*) > 2"))
            .order_by("A")
            .for_update(true);
        assert_eq!(
            e.select_sql(&select, &mut params).unwrap(),
            "SELECT A, COUNT(*) FROM T WHERE B > ? GROUP BY A HAVING COUNT(*) > 2 ORDER BY A FOR UPDATE"
        );
        assert_eq!(params, vec![Value::Integer(1)]);
    }

    #[test]
    fn having_requires_group_by() {
        let e = engine("ORACLE");
        let select = Select::new("A").from("T").having(filter_eq("ID", 1));
        let err = e.select_sql(&select, &mut Vec::new()).unwrap_err();
        assert_eq!(err.db_kind(), Some(sqlengine_core::DbErrorKind::BadSqlOperation));
    }

    #[test]
    fn for_update_needs_dialect_support() {
        let select = Select::new("1").from("T").for_update(true);
        assert_eq!(
            engine("SQLITE").select_sql(&select, &mut Vec::new()).unwrap(),
            "SELECT 1 FROM T"
        );
        assert_eq!(
            engine("MYSQL").select_sql(&select, &mut Vec::new()).unwrap(),
            "SELECT 1 FROM T FOR UPDATE"
        );
    }

    #[test]
    fn force_select_update_upgrades_selects() {
        let e = Engine::sql_only(Mode::ForceSelectUpdate, mk_dialect("POSTGRES").unwrap());
        assert_eq!(
            e.select_sql(&Select::new("*").from("T"), &mut Vec::new()).unwrap(),
            "SELECT * FROM T FOR UPDATE"
        );
    }

    #[test]
    fn scalar_select_without_dual() {
        let e = engine("SQLITE");
        assert_eq!(
            e.select_sql(&Select::new("1"), &mut Vec::new()).unwrap(),
            "SELECT 1"
        );
    }

    #[test]
    fn insert_statement() {
        let e = engine("SQLITE");
        let r = row(&[("A", Value::from("x")), ("ID", Value::from(1))]);
        assert_eq!(
            e.insert_sql("T", &r, &[]).unwrap(),
            "INSERT INTO T (A, ID) VALUES (?, ?)"
        );
        assert_eq!(e.insert_sql("T", &r, &["id"]).unwrap(), "INSERT INTO T (A) VALUES (?)");
        assert!(e.insert_sql("T", &r, &["A", "ID"]).is_err());
    }

    #[test]
    fn update_statement() {
        let e = engine("SQLITE");
        let r = row(&[
            ("B", Value::from(2)),
            ("D", Value::from(4)),
            ("E", Value::from("e")),
            ("F", Value::Null),
        ]);
        let mut params = Vec::new();
        let sql = e
            .update_sql("T", &r, &["B", "D"], &[], &filter_eq("Q", 7), &mut params)
            .unwrap();
        assert_eq!(sql, "UPDATE T SET E = ?, F = ? WHERE (Q = ?) AND (B = ?) AND (D = ?)");
        assert_eq!(
            params,
            vec![
                Value::from("e"),
                Value::Null,
                Value::from(7),
                Value::from(2),
                Value::from(4)
            ]
        );

        let mut params = Vec::new();
        let sql = e
            .update_sql("T", &r, &["B"], &["D", "F"], &Filter::default(), &mut params)
            .unwrap();
        assert_eq!(sql, "UPDATE T SET E = ? WHERE B = ?");
    }

    #[test]
    fn update_rejects_degenerate_statements() {
        let e = engine("SQLITE");
        let r = row(&[("ID", Value::from(1)), ("A", Value::from(2))]);
        assert!(
            e.update_sql("T", &r, &[], &[], &Filter::default(), &mut Vec::new())
                .is_err()
        );
        assert!(
            e.update_sql("T", &r, &["ID"], &["A"], &Filter::default(), &mut Vec::new())
                .is_err()
        );
        assert!(
            e.update_sql("T", &r, &["X"], &[], &Filter::default(), &mut Vec::new())
                .is_err()
        );
    }

    #[test]
    fn delete_statement() {
        let e = engine("SQLITE");
        let mut params = Vec::new();
        assert_eq!(
            e.delete_sql("T", &filter_eq("ID", 1), &mut params).unwrap(),
            "DELETE FROM T WHERE ID = ?"
        );
        assert_eq!(params, vec![Value::from(1)]);
        assert!(e.delete_sql("T", &Filter::default(), &mut Vec::new()).is_err());
    }

    #[test]
    fn sql_only_cannot_execute() {
        let mut e = engine("SQLITE");
        let err = e.select("1", "", &Filter::default()).unwrap_err();
        assert_eq!(err.to_string(), "Bad SQL operation: No connection");
        // Nothing acquired, so ending the transaction is a no-op.
        e.commit().unwrap();
        e.rollback().unwrap();
        assert!(!e.touched());
    }

    #[test]
    fn sequences_need_dialect_support() {
        let mut e = engine("MYSQL");
        assert!(matches!(e.get_next_value("S"), Err(Error::Dialect(_))));
    }

    #[test]
    fn mode_names() {
        assert_eq!(Mode::default(), Mode::ReadWrite);
        assert_eq!(Mode::ForceSelectUpdate.to_string(), "force_select_update");
        let mode: Mode = serde_json::from_str("\"read_only\"").unwrap();
        assert_eq!(mode, Mode::ReadOnly);
    }
}
