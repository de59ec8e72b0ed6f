//! Value encoding and decoding between sqlengine and SQLite.
//!
//! SQLite has five storage classes (INTEGER, REAL, TEXT, BLOB, NULL) plus a
//! free-form declared column type. Fetched columns map as follows:
//!
//! | Storage class | Declared type | Value |
//! |---|---|---|
//! | NULL | any | `Null` |
//! | INTEGER | any | `Integer` if it fits 32 bits, else `LongInt` |
//! | REAL | any | `Decimal`, falling back to `String` |
//! | TEXT | `DATE`, `TIME`, `DATETIME`, `TIMESTAMP` | `DateTime`, falling back to `String` |
//! | TEXT | `NUMERIC`, `DECIMAL` | `Decimal`, falling back to `String` |
//! | TEXT, BLOB | other | `String` |
//!
//! Binding sends decimals and date-times as text.

use crate::ffi;
use sqlengine_core::Value;
use std::ffi::{CStr, c_int};
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

const BIND_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bind a Value to a prepared statement parameter.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
/// - `index` must be a valid 1-based parameter index
pub unsafe fn bind_value(stmt: *mut ffi::sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: the caller guarantees stmt and index; text is copied by SQLite
    // (transient destructor) before the temporary strings are dropped.
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),
            Value::Integer(v) => ffi::sqlite3_bind_int(stmt, index, *v),
            Value::LongInt(v) => ffi::sqlite3_bind_int64(stmt, index, *v),
            Value::Float(v) => ffi::sqlite3_bind_double(stmt, index, *v),
            Value::Decimal(d) => bind_text(stmt, index, &d.normalize().to_string()),
            Value::DateTime(dt) => {
                bind_text(stmt, index, &dt.format(BIND_DATE_TIME_FORMAT).to_string())
            }
            Value::String(s) => bind_text(stmt, index, s),
        }
    }
}

unsafe fn bind_text(stmt: *mut ffi::sqlite3_stmt, index: c_int, text: &str) -> c_int {
    let bytes = text.as_bytes();
    // SAFETY: pointer and length describe `text`; SQLITE_TRANSIENT makes a copy
    unsafe {
        ffi::sqlite3_bind_text(
            stmt,
            index,
            bytes.as_ptr().cast(),
            bytes.len() as c_int,
            ffi::transient(),
        )
    }
}

/// How TEXT columns of a declared type are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    DateTime,
    Decimal,
    Text,
}

impl ColumnKind {
    /// Classify a declared column type (`TIMESTAMP`, `NUMERIC(10,2)`, ...).
    pub fn from_decltype(decltype: Option<&str>) -> Self {
        let Some(decl) = decltype else {
            return ColumnKind::Text;
        };
        let decl = decl.to_uppercase();
        if decl.contains("DATE") || decl.contains("TIME") {
            ColumnKind::DateTime
        } else if decl.starts_with("NUMERIC") || decl.starts_with("DECIMAL") {
            ColumnKind::Decimal
        } else {
            ColumnKind::Text
        }
    }
}

/// Map a REAL column to a decimal, keeping the text form if the number has
/// no decimal representation (NaN, infinities, magnitudes beyond 96 bits).
///
/// This path never fails.
pub fn decimal_or_string(v: f64) -> Value {
    let text = v.to_string();
    match Decimal::from_str(&text) {
        Ok(d) => Value::Decimal(d),
        Err(_) => Value::String(text),
    }
}

/// Interpret a TEXT column according to its declared type, keeping the text
/// when it does not parse.
pub fn text_value(text: String, kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Text => Value::String(text),
        ColumnKind::DateTime => {
            let value = Value::String(text);
            match value.as_date_time() {
                Ok(dt) => Value::DateTime(dt),
                Err(_) => value,
            }
        }
        ColumnKind::Decimal => match Decimal::from_str(text.trim()) {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::String(text),
        },
    }
}

/// Read a column value from a result row.
///
/// # Safety
/// - `stmt` must be a valid prepared statement that has just returned SQLITE_ROW
/// - `index` must be a valid 0-based column index
pub unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, index: c_int, kind: ColumnKind) -> Value {
    // SAFETY: guaranteed by the caller; text/blob pointers are read before the
    // next step and copied into owned strings.
    unsafe {
        match ffi::sqlite3_column_type(stmt, index) {
            ffi::SQLITE_NULL => Value::Null,

            ffi::SQLITE_INTEGER => {
                let v = ffi::sqlite3_column_int64(stmt, index);
                match i32::try_from(v) {
                    Ok(small) => Value::Integer(small),
                    Err(_) => Value::LongInt(v),
                }
            }

            ffi::SQLITE_FLOAT => decimal_or_string(ffi::sqlite3_column_double(stmt, index)),

            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_column_text(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() {
                    return Value::Null;
                }
                let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                text_value(String::from_utf8_lossy(slice).into_owned(), kind)
            }

            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_column_blob(stmt, index);
                let len = ffi::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() || len == 0 {
                    Value::String(String::new())
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::String(String::from_utf8_lossy(slice).into_owned())
                }
            }

            _ => Value::Null,
        }
    }
}

/// Get the column name from a result.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: guaranteed by the caller
    unsafe {
        let ptr = ffi::sqlite3_column_name(stmt, index);
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }
}

/// Get the declared type of a result column, if it comes from a table column.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_decltype(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: guaranteed by the caller
    unsafe {
        let ptr = ffi::sqlite3_column_decltype(stmt, index);
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }
}

/// Parse a date-time the way it is bound.
pub fn parse_bound_date_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, BIND_DATE_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decltype_classification() {
        assert_eq!(ColumnKind::from_decltype(Some("TIMESTAMP")), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_decltype(Some("datetime")), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_decltype(Some("DATE")), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_decltype(Some("NUMERIC(10, 2)")), ColumnKind::Decimal);
        assert_eq!(ColumnKind::from_decltype(Some("decimal")), ColumnKind::Decimal);
        assert_eq!(ColumnKind::from_decltype(Some("VARCHAR(20)")), ColumnKind::Text);
        assert_eq!(ColumnKind::from_decltype(None), ColumnKind::Text);
    }

    #[test]
    fn real_maps_to_decimal() {
        assert_eq!(
            decimal_or_string(1.25),
            Value::Decimal(Decimal::from_str("1.25").unwrap())
        );
        assert!(matches!(decimal_or_string(-0.5), Value::Decimal(_)));
    }

    #[test]
    fn real_falls_back_to_string() {
        // Out of the 96-bit decimal range.
        let big = decimal_or_string(1e40);
        assert!(matches!(&big, Value::String(s) if s.starts_with("1000000000")));
        assert_eq!(decimal_or_string(f64::NAN), Value::String("NaN".to_string()));
        assert_eq!(decimal_or_string(f64::INFINITY), Value::String("inf".to_string()));
    }

    #[test]
    fn text_by_declared_type() {
        let dt = text_value("2006-11-16 15:05:10".to_string(), ColumnKind::DateTime);
        assert_eq!(dt, Value::DateTime(parse_bound_date_time("2006-11-16 15:05:10").unwrap()));
        assert!(matches!(
            text_value("someday".to_string(), ColumnKind::DateTime),
            Value::String(_)
        ));
        assert!(matches!(
            text_value("12.50".to_string(), ColumnKind::Decimal),
            Value::Decimal(_)
        ));
        assert!(matches!(
            text_value("n/a".to_string(), ColumnKind::Decimal),
            Value::String(_)
        ));
        assert!(matches!(
            text_value("2006-11-16 15:05:10".to_string(), ColumnKind::Text),
            Value::String(_)
        ));
    }
}
