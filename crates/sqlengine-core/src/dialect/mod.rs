//! Per-product SQL dialect strategies.
//!
//! A dialect carries the textual and capability differences between database
//! products: sequence access, the pseudo-table for scalar selects, DDL type
//! names and flags. Dialects hold no connection state and are shared as
//! `Arc<dyn SqlDialect>`.

mod interbase;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

pub use interbase::InterbaseDialect;
pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Error, Result};
use crate::value::ValueType;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Textual and capability differences of one database product.
pub trait SqlDialect: fmt::Debug + Send + Sync {
    /// Registry name, e.g. `SQLITE`.
    fn name(&self) -> &str;

    /// Pseudo-table for scalar selects; empty when `SELECT expr` needs no FROM.
    fn dual_name(&self) -> &str;

    fn has_sequences(&self) -> bool;

    /// Expression yielding the current value of a sequence.
    fn select_curr_value(&self, _seq_name: &str) -> Result<String> {
        Err(no_sequences())
    }

    /// Expression advancing a sequence and yielding the new value.
    fn select_next_value(&self, _seq_name: &str) -> Result<String> {
        Err(no_sequences())
    }

    fn create_sequence(&self, _seq_name: &str) -> Result<String> {
        Err(no_sequences())
    }

    fn drop_sequence(&self, _seq_name: &str) -> Result<String> {
        Err(no_sequences())
    }

    /// Query returning the id generated by the last autoincrement insert.
    fn select_last_inserted_id(&self, _table_name: &str) -> Result<String> {
        Err(Error::dialect("No autoincrement flag"))
    }

    /// Native column type for a value type.
    fn type2sql(&self, value_type: ValueType) -> Result<String>;

    fn has_for_update(&self) -> bool {
        true
    }

    /// DDL must be committed before it becomes visible.
    fn commit_ddl(&self) -> bool {
        false
    }

    /// Foreign keys are declared inside the column definition.
    fn fk_internal(&self) -> bool {
        false
    }

    fn suffix_create_table(&self) -> &str {
        ""
    }

    fn primary_key_flag(&self) -> &str {
        ""
    }

    fn autoinc_flag(&self) -> &str {
        ""
    }

    fn sysdate_func(&self) -> &str {
        "CURRENT_TIMESTAMP"
    }

    /// NULL must be spelled out in column definitions.
    fn explicit_null(&self) -> bool {
        false
    }

    /// Statement toggling explicit inserts into identity columns, if any.
    fn grant_insert_id_statement(&self, _table_name: &str, _on: bool) -> Option<String> {
        None
    }

    /// Combine `NOT NULL` and `DEFAULT ...` clauses in dialect order.
    fn not_null_default(&self, not_null_clause: &str, default_value: &str) -> String {
        join_clauses(default_value, not_null_clause)
    }
}

pub(crate) fn no_sequences() -> Error {
    Error::dialect("No sequences, please")
}

pub(crate) fn bad_type() -> Error {
    Error::dialect("Bad type")
}

pub(crate) fn join_clauses(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{} {}", first, second),
    }
}

/// Dialects by name, assembled once at startup.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: BTreeMap<String, Arc<dyn SqlDialect>>,
}

impl DialectRegistry {
    pub fn builder() -> DialectRegistryBuilder {
        DialectRegistryBuilder::default()
    }

    /// Registry holding every built-in dialect.
    pub fn standard() -> Self {
        Self::builder().with_standard().build()
    }

    /// Resolve a dialect by its case-sensitive name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn SqlDialect>> {
        self.dialects
            .get(name)
            .cloned()
            .ok_or_else(|| Error::dialect(format!("Unknown dialect: {}", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.dialects.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Default)]
pub struct DialectRegistryBuilder {
    dialects: BTreeMap<String, Arc<dyn SqlDialect>>,
}

impl DialectRegistryBuilder {
    /// Register a dialect under its own name. A later registration replaces
    /// an earlier one with the same name.
    pub fn register(mut self, dialect: Arc<dyn SqlDialect>) -> Self {
        self.dialects.insert(dialect.name().to_string(), dialect);
        self
    }

    /// Register a dialect under an extra name.
    pub fn alias(mut self, alias: impl Into<String>, dialect: Arc<dyn SqlDialect>) -> Self {
        self.dialects.insert(alias.into(), dialect);
        self
    }

    pub fn with_standard(self) -> Self {
        let interbase: Arc<dyn SqlDialect> = Arc::new(InterbaseDialect);
        self.register(Arc::new(OracleDialect))
            .register(Arc::new(PostgresDialect))
            .register(Arc::clone(&interbase))
            .alias("FIREBIRD", interbase)
            .register(Arc::new(MysqlDialect))
            .register(Arc::new(SqliteDialect))
            .register(Arc::new(MssqlDialect))
    }

    pub fn build(self) -> DialectRegistry {
        DialectRegistry {
            dialects: self.dialects,
        }
    }
}

/// Resolve a built-in dialect by name.
pub fn mk_dialect(name: &str) -> Result<Arc<dyn SqlDialect>> {
    static STANDARD: OnceLock<DialectRegistry> = OnceLock::new();
    STANDARD.get_or_init(DialectRegistry::standard).get(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[&str] = &["ORACLE", "POSTGRES", "INTERBASE", "MYSQL", "SQLITE", "MSSQL"];

    #[test]
    fn unknown_dialect() {
        let err = mk_dialect("UNKNOWN").unwrap_err();
        assert!(matches!(err, Error::Dialect(_)));
        assert_eq!(err.to_string(), "SQL dialect error: Unknown dialect: UNKNOWN");
        // Names are case-sensitive.
        assert!(mk_dialect("sqlite").is_err());
    }

    #[test]
    fn standard_set() {
        for name in ALL {
            assert_eq!(mk_dialect(name).unwrap().name(), *name);
        }
        assert_eq!(mk_dialect("FIREBIRD").unwrap().name(), "INTERBASE");
    }

    #[test]
    fn sequences() {
        let cases = [
            ("ORACLE", "S.CURRVAL", "S.NEXTVAL"),
            ("POSTGRES", "CURRVAL('S')", "NEXTVAL('S')"),
            ("INTERBASE", "GEN_ID(S, 0)", "GEN_ID(S, 1)"),
        ];
        for (name, curr, next) in cases {
            let d = mk_dialect(name).unwrap();
            assert!(d.has_sequences());
            assert_eq!(d.select_curr_value("S").unwrap(), curr);
            assert_eq!(d.select_next_value("S").unwrap(), next);
        }
        for name in ["MYSQL", "MSSQL", "SQLITE"] {
            let d = mk_dialect(name).unwrap();
            assert!(!d.has_sequences());
            assert!(matches!(d.select_curr_value("S"), Err(Error::Dialect(_))));
            assert!(matches!(d.select_next_value("S"), Err(Error::Dialect(_))));
            assert!(matches!(d.create_sequence("S"), Err(Error::Dialect(_))));
            assert!(matches!(d.drop_sequence("S"), Err(Error::Dialect(_))));
        }
    }

    #[test]
    fn dual_names() {
        assert_eq!(mk_dialect("ORACLE").unwrap().dual_name(), "DUAL");
        assert_eq!(mk_dialect("MYSQL").unwrap().dual_name(), "DUAL");
        assert_eq!(mk_dialect("INTERBASE").unwrap().dual_name(), "RDB$DATABASE");
        assert_eq!(mk_dialect("POSTGRES").unwrap().dual_name(), "");
        assert_eq!(mk_dialect("SQLITE").unwrap().dual_name(), "");
        assert_eq!(mk_dialect("MSSQL").unwrap().dual_name(), "");
    }

    #[test]
    fn null_has_no_column_type() {
        for name in ALL {
            let d = mk_dialect(name).unwrap();
            assert!(d.type2sql(ValueType::Null).is_err());
            assert!(d.type2sql(ValueType::String).is_ok());
        }
    }

    #[test]
    fn last_inserted_id() {
        assert_eq!(
            mk_dialect("MYSQL").unwrap().select_last_inserted_id("T").unwrap(),
            "SELECT LAST_INSERT_ID() LID"
        );
        assert_eq!(
            mk_dialect("SQLITE").unwrap().select_last_inserted_id("T").unwrap(),
            "SELECT SEQ LID FROM SQLITE_SEQUENCE WHERE NAME = 'T'"
        );
        assert!(mk_dialect("ORACLE").unwrap().select_last_inserted_id("T").is_err());
    }

    #[test]
    fn custom_registry() {
        let registry = DialectRegistry::builder()
            .register(Arc::new(SqliteDialect))
            .build();
        assert_eq!(registry.names(), vec!["SQLITE"]);
        assert!(registry.get("ORACLE").is_err());
    }

    #[test]
    fn clause_joining() {
        let d = mk_dialect("POSTGRES").unwrap();
        assert_eq!(d.not_null_default("NOT NULL", "DEFAULT 0"), "DEFAULT 0 NOT NULL");
        assert_eq!(d.not_null_default("", "DEFAULT 0"), "DEFAULT 0");
        let m = mk_dialect("MYSQL").unwrap();
        assert_eq!(m.not_null_default("NOT NULL", "DEFAULT 0"), "NOT NULL DEFAULT 0");
    }
}
