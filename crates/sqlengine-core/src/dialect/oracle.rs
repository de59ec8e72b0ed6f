//! Oracle dialect.

use super::{SqlDialect, bad_type};
use crate::error::Result;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn name(&self) -> &str {
        "ORACLE"
    }

    fn dual_name(&self) -> &str {
        "DUAL"
    }

    fn has_sequences(&self) -> bool {
        true
    }

    fn select_curr_value(&self, seq_name: &str) -> Result<String> {
        Ok(format!("{}.CURRVAL", seq_name))
    }

    fn select_next_value(&self, seq_name: &str) -> Result<String> {
        Ok(format!("{}.NEXTVAL", seq_name))
    }

    fn create_sequence(&self, seq_name: &str) -> Result<String> {
        Ok(format!("CREATE SEQUENCE {}", seq_name))
    }

    fn drop_sequence(&self, seq_name: &str) -> Result<String> {
        Ok(format!("DROP SEQUENCE {}", seq_name))
    }

    fn type2sql(&self, value_type: ValueType) -> Result<String> {
        let name = match value_type {
            ValueType::Integer | ValueType::LongInt | ValueType::Float | ValueType::Decimal => {
                "NUMBER"
            }
            ValueType::String => "VARCHAR2",
            ValueType::DateTime => "DATE",
            ValueType::Null => return Err(bad_type()),
        };
        Ok(name.to_string())
    }

    fn sysdate_func(&self) -> &str {
        "SYSDATE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_and_functions() {
        let d = OracleDialect;
        assert_eq!(d.type2sql(ValueType::String).unwrap(), "VARCHAR2");
        assert_eq!(d.type2sql(ValueType::Float).unwrap(), "NUMBER");
        assert_eq!(d.type2sql(ValueType::DateTime).unwrap(), "DATE");
        assert_eq!(d.sysdate_func(), "SYSDATE");
        assert_eq!(d.create_sequence("S_A").unwrap(), "CREATE SEQUENCE S_A");
    }
}
