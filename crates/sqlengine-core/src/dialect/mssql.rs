//! Microsoft SQL Server dialect.

use super::{SqlDialect, bad_type, join_clauses};
use crate::error::Result;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDialect;

impl SqlDialect for MssqlDialect {
    fn name(&self) -> &str {
        "MSSQL"
    }

    fn dual_name(&self) -> &str {
        ""
    }

    fn has_sequences(&self) -> bool {
        false
    }

    fn select_last_inserted_id(&self, _table_name: &str) -> Result<String> {
        Ok("SELECT SCOPE_IDENTITY()".to_string())
    }

    fn type2sql(&self, value_type: ValueType) -> Result<String> {
        let name = match value_type {
            ValueType::Integer => "INT",
            ValueType::LongInt => "BIGINT",
            ValueType::String => "VARCHAR",
            ValueType::Decimal => "DECIMAL(16, 6)",
            ValueType::DateTime => "DATETIME",
            ValueType::Float => "DOUBLE PRECISION",
            ValueType::Null => return Err(bad_type()),
        };
        Ok(name.to_string())
    }

    fn autoinc_flag(&self) -> &str {
        "IDENTITY(1,1)"
    }

    fn explicit_null(&self) -> bool {
        true
    }

    fn grant_insert_id_statement(&self, table_name: &str, on: bool) -> Option<String> {
        let state = if on { "ON" } else { "OFF" };
        Some(format!("SET IDENTITY_INSERT {} {}", table_name, state))
    }

    fn not_null_default(&self, not_null_clause: &str, default_value: &str) -> String {
        join_clauses(not_null_clause, default_value)
    }
}
