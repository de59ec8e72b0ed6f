//! SQLite dialect.

use super::{SqlDialect, bad_type};
use crate::error::Result;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &str {
        "SQLITE"
    }

    fn dual_name(&self) -> &str {
        ""
    }

    fn has_sequences(&self) -> bool {
        false
    }

    fn select_last_inserted_id(&self, table_name: &str) -> Result<String> {
        Ok(format!(
            "SELECT SEQ LID FROM SQLITE_SEQUENCE WHERE NAME = '{}'",
            table_name
        ))
    }

    fn type2sql(&self, value_type: ValueType) -> Result<String> {
        let name = match value_type {
            ValueType::Integer | ValueType::LongInt => "INTEGER",
            ValueType::String => "VARCHAR",
            ValueType::Decimal => "NUMERIC",
            ValueType::DateTime => "TIMESTAMP",
            ValueType::Float => "DOUBLE PRECISION",
            ValueType::Null => return Err(bad_type()),
        };
        Ok(name.to_string())
    }

    fn has_for_update(&self) -> bool {
        false
    }

    fn fk_internal(&self) -> bool {
        true
    }

    fn primary_key_flag(&self) -> &str {
        "PRIMARY KEY"
    }

    fn autoinc_flag(&self) -> &str {
        "AUTOINCREMENT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_flags() {
        let d = SqliteDialect;
        assert!(!d.has_for_update());
        assert_eq!(d.primary_key_flag(), "PRIMARY KEY");
        assert_eq!(d.autoinc_flag(), "AUTOINCREMENT");
        assert_eq!(d.type2sql(ValueType::LongInt).unwrap(), "INTEGER");
        assert_eq!(d.type2sql(ValueType::Decimal).unwrap(), "NUMERIC");
        assert_eq!(d.sysdate_func(), "CURRENT_TIMESTAMP");
    }
}
