//! PostgreSQL dialect.

use super::{SqlDialect, bad_type};
use crate::error::Result;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &str {
        "POSTGRES"
    }

    fn dual_name(&self) -> &str {
        ""
    }

    fn has_sequences(&self) -> bool {
        true
    }

    fn select_curr_value(&self, seq_name: &str) -> Result<String> {
        Ok(format!("CURRVAL('{}')", seq_name))
    }

    fn select_next_value(&self, seq_name: &str) -> Result<String> {
        Ok(format!("NEXTVAL('{}')", seq_name))
    }

    fn create_sequence(&self, seq_name: &str) -> Result<String> {
        Ok(format!("CREATE SEQUENCE {}", seq_name))
    }

    fn drop_sequence(&self, seq_name: &str) -> Result<String> {
        Ok(format!("DROP SEQUENCE {}", seq_name))
    }

    fn type2sql(&self, value_type: ValueType) -> Result<String> {
        let name = match value_type {
            ValueType::Integer | ValueType::LongInt => "INTEGER",
            ValueType::String => "CHARACTER VARYING",
            ValueType::Decimal => "NUMERIC",
            ValueType::DateTime => "TIMESTAMP",
            ValueType::Float => "DOUBLE PRECISION",
            ValueType::Null => return Err(bad_type()),
        };
        Ok(name.to_string())
    }
}
