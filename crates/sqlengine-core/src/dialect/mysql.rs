//! MySQL dialect.

use super::{SqlDialect, bad_type, join_clauses};
use crate::error::Result;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn name(&self) -> &str {
        "MYSQL"
    }

    fn dual_name(&self) -> &str {
        "DUAL"
    }

    fn has_sequences(&self) -> bool {
        false
    }

    fn select_last_inserted_id(&self, _table_name: &str) -> Result<String> {
        Ok("SELECT LAST_INSERT_ID() LID".to_string())
    }

    fn type2sql(&self, value_type: ValueType) -> Result<String> {
        let name = match value_type {
            ValueType::Integer => "INT",
            ValueType::LongInt => "BIGINT",
            ValueType::String => "VARCHAR",
            ValueType::Decimal => "DECIMAL(16,6)",
            ValueType::DateTime => "TIMESTAMP",
            ValueType::Float => "DOUBLE",
            ValueType::Null => return Err(bad_type()),
        };
        Ok(name.to_string())
    }

    fn suffix_create_table(&self) -> &str {
        " ENGINE=INNODB DEFAULT CHARSET=utf8"
    }

    fn autoinc_flag(&self) -> &str {
        "AUTO_INCREMENT"
    }

    fn explicit_null(&self) -> bool {
        true
    }

    fn not_null_default(&self, not_null_clause: &str, default_value: &str) -> String {
        join_clauses(not_null_clause, default_value)
    }
}
