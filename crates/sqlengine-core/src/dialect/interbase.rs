//! Interbase / Firebird dialect.
//!
//! Sequences are called generators here and are read through `GEN_ID`.

use super::{SqlDialect, bad_type};
use crate::error::Result;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct InterbaseDialect;

impl SqlDialect for InterbaseDialect {
    fn name(&self) -> &str {
        "INTERBASE"
    }

    fn dual_name(&self) -> &str {
        "RDB$DATABASE"
    }

    fn has_sequences(&self) -> bool {
        true
    }

    fn select_curr_value(&self, seq_name: &str) -> Result<String> {
        Ok(format!("GEN_ID({}, 0)", seq_name))
    }

    fn select_next_value(&self, seq_name: &str) -> Result<String> {
        Ok(format!("GEN_ID({}, 1)", seq_name))
    }

    fn create_sequence(&self, seq_name: &str) -> Result<String> {
        Ok(format!("CREATE GENERATOR {}", seq_name))
    }

    fn drop_sequence(&self, seq_name: &str) -> Result<String> {
        Ok(format!("DROP GENERATOR {}", seq_name))
    }

    fn type2sql(&self, value_type: ValueType) -> Result<String> {
        let name = match value_type {
            ValueType::Integer => "INTEGER",
            ValueType::LongInt => "BIGINT",
            ValueType::String => "VARCHAR",
            ValueType::Decimal => "DECIMAL(16, 6)",
            ValueType::DateTime => "TIMESTAMP",
            ValueType::Float => "DOUBLE PRECISION",
            ValueType::Null => return Err(bad_type()),
        };
        Ok(name.to_string())
    }

    fn commit_ddl(&self) -> bool {
        true
    }
}
