//! Mode enforcement, observed through a backend that counts every call.

use sqlengine::{
    ConnectionBackend, CursorBackend, DbErrorKind, Engine, Filter, Mode, Result, Row, RowData,
    Select, SqlConnection, SqlSource, Value, filter_eq, mk_dialect,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Calls {
    log: Mutex<Vec<String>>,
    // Rows produced by each exec.
    rows: AtomicUsize,
    fetches: AtomicUsize,
}

impl Calls {
    fn push(&self, call: impl Into<String>) {
        self.log.lock().unwrap().push(call.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

struct CountingBackend(Arc<Calls>);

struct CountingCursor {
    calls: Arc<Calls>,
    pending: Vec<Row>,
}

impl ConnectionBackend for CountingBackend {
    fn begin_trans(&mut self) -> Result<()> {
        self.0.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.0.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.0.push("rollback");
        Ok(())
    }

    fn new_cursor(&mut self) -> Result<Box<dyn CursorBackend>> {
        Ok(Box::new(CountingCursor {
            calls: Arc::clone(&self.0),
            pending: Vec::new(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl CursorBackend for CountingCursor {
    fn exec_direct(&mut self, sql: &str) -> Result<()> {
        self.calls.push(format!("direct {}", sql));
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> Result<()> {
        self.calls.push(format!("prepare {}", sql));
        Ok(())
    }

    fn exec(&mut self, params: &[Value]) -> Result<()> {
        self.calls.push(format!("exec {}", params.len()));
        let rows = self.calls.rows.load(Ordering::SeqCst);
        self.pending = (0..rows)
            .map(|_| Row::new(["X"], vec![Value::from(42)]))
            .collect();
        Ok(())
    }

    fn fetch_row(&mut self) -> Result<Option<Row>> {
        self.calls.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.pending.pop())
    }
}

fn engine(mode: Mode) -> (Engine, Arc<Calls>) {
    engine_with_rows(mode, 1)
}

fn engine_with_rows(mode: Mode, rows: usize) -> (Engine, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    calls.rows.store(rows, Ordering::SeqCst);
    let conn = SqlConnection::from_backend(
        SqlSource::new("POSTGRES", "test"),
        mk_dialect("POSTGRES").unwrap(),
        Box::new(CountingBackend(Arc::clone(&calls))),
    );
    (Engine::new(mode, conn), calls)
}

fn row() -> RowData {
    vec![
        ("ID".to_string(), Value::from(1)),
        ("A".to_string(), Value::from("a")),
    ]
}

fn assert_blocked(result: Result<impl std::fmt::Debug>, operation: &str) {
    let err = result.unwrap_err();
    assert_eq!(err.db_kind(), Some(DbErrorKind::BadOperationInMode), "{}", err);
    assert!(err.is_mode_violation());
    assert!(err.to_string().contains(operation), "{}", err);
}

#[test]
fn read_only_blocks_mutations_before_backend_io() {
    let (mut e, calls) = engine(Mode::ReadOnly);

    assert_blocked(e.insert("T", &[row()], &[], false), "INSERT");
    assert_blocked(e.update("T", &[row()], &["ID"], &[], &Filter::default()), "UPDATE");
    assert_blocked(e.delete_from("T", &filter_eq("ID", 1)), "DELETE");
    assert_blocked(e.exec_proc("CALL P()"), "PROCEDURE");
    assert_blocked(e.exec_direct("DROP TABLE T"), "raw SQL");
    assert_blocked(e.commit(), "COMMIT");
    assert_blocked(e.rollback(), "ROLLBACK");
    assert_blocked(e.touch(), "transaction");
    assert_blocked(
        e.select_rows(&Select::new("*").from("T").for_update(true)),
        "SELECT FOR UPDATE",
    );

    assert!(calls.take().is_empty());
    assert!(!e.touched());
}

#[test]
fn read_only_blocks_even_invalid_statements_first() {
    let (mut e, calls) = engine(Mode::ReadOnly);
    // An empty delete filter is also an error; the mode check wins.
    assert_blocked(e.delete_from("T", &Filter::default()), "DELETE");
    assert!(calls.take().is_empty());
}

#[test]
fn read_only_selects_without_transaction() {
    let (mut e, calls) = engine(Mode::ReadOnly);
    let value = e.select1("X", "T", &filter_eq("ID", 1)).unwrap();
    assert_eq!(value, Value::from(42));
    assert_eq!(calls.take(), vec!["prepare SELECT X FROM T WHERE ID = ?", "exec 1"]);
    assert!(!e.touched());
}

#[test]
fn read_write_mutation_touches_and_commit_resets() {
    let (mut e, calls) = engine(Mode::ReadWrite);
    e.insert("T", &[row(), row()], &[], false).unwrap();
    assert!(e.touched());
    assert_eq!(
        calls.take(),
        vec![
            "begin",
            "prepare INSERT INTO T (ID, A) VALUES (?, ?)",
            "exec 2",
            "exec 2"
        ]
    );

    e.commit().unwrap();
    assert!(!e.touched());
    assert_eq!(calls.take(), vec!["commit"]);

    e.delete_from("T", &filter_eq("ID", 1)).unwrap();
    e.rollback().unwrap();
    assert!(!e.touched());
    assert_eq!(
        calls.take(),
        vec!["begin", "prepare DELETE FROM T WHERE ID = ?", "exec 1", "rollback"]
    );
}

#[test]
fn read_write_select_opens_transaction_without_touching() {
    let (mut e, calls) = engine(Mode::ReadWrite);
    e.select("X", "T", &Filter::default()).unwrap();
    assert!(!e.touched());
    assert_eq!(calls.take(), vec!["begin", "prepare SELECT X FROM T", "exec 0"]);
}

#[test]
fn manual_mode_begins_only_on_mutation() {
    let (mut e, calls) = engine(Mode::Manual);
    e.select("X", "T", &Filter::default()).unwrap();
    assert_eq!(calls.take(), vec!["prepare SELECT X FROM T", "exec 0"]);

    e.exec_proc("CALL P()").unwrap();
    assert!(e.touched());
    assert_eq!(calls.take(), vec!["begin", "direct CALL P()"]);
}

#[test]
fn force_select_update_touches_on_select() {
    let (mut e, calls) = engine(Mode::ForceSelectUpdate);
    e.select("X", "T", &Filter::default()).unwrap();
    assert!(e.touched());
    assert_eq!(
        calls.take(),
        vec!["begin", "prepare SELECT X FROM T FOR UPDATE", "exec 0"]
    );
}

#[test]
fn select_row_cardinality() {
    let (mut e, _) = engine(Mode::ReadWrite);
    // The cursor yields one single-column row per exec.
    let row = e.select_row("X", "T", &Filter::default()).unwrap();
    assert_eq!(row.get_by_name("x"), Some(&Value::from(42)));
}

#[test]
fn sequences_go_through_select1() {
    let (mut e, calls) = engine(Mode::ReadWrite);
    assert_eq!(e.get_next_value("S_ID").unwrap(), Value::from(42));
    assert_eq!(
        calls.take(),
        vec!["begin", "prepare SELECT NEXTVAL('S_ID')", "exec 0"]
    );
}

#[test]
fn select_row_stops_after_two_fetches() {
    let (mut e, calls) = engine_with_rows(Mode::ReadOnly, 10_000);
    let err = e.select_row("X", "T", &Filter::default()).unwrap_err();
    assert!(err.is_no_data());
    assert_eq!(calls.fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn select_iter_fetches_on_demand() {
    let (mut e, calls) = engine_with_rows(Mode::ReadOnly, 10_000);
    let first: Vec<Row> = e
        .select_iter(&Select::new("X").from("T"))
        .unwrap()
        .take(3)
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(calls.fetches.load(Ordering::SeqCst), 3);

    let (mut e, calls) = engine_with_rows(Mode::ReadOnly, 4);
    let all = e.select_iter(&Select::new("X").from("T")).unwrap().count();
    assert_eq!(all, 4);
    // The fifth fetch reports the end.
    assert_eq!(calls.fetches.load(Ordering::SeqCst), 5);

    let (mut e, _) = engine_with_rows(Mode::ReadOnly, 4);
    let limited = e
        .select_iter(&Select::new("X").from("T").max_rows(2))
        .unwrap()
        .count();
    assert_eq!(limited, 2);
}

#[test]
fn select_iter_is_mode_checked() {
    let (mut e, calls) = engine_with_rows(Mode::ReadOnly, 3);
    assert!(
        e.select_iter(&Select::new("X").from("T").for_update(true))
            .unwrap_err()
            .is_mode_violation()
    );
    assert!(calls.take().is_empty());
}
