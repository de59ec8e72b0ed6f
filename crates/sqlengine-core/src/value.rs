//! Dynamic SQL values.

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const SQL_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ISO_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A dynamically-typed SQL value.
///
/// Used for parameter binding, literal rendering and result fetching.
/// Ordering is total: `Null` first, then every numeric variant compared by
/// value (`Integer(1) == Decimal(1.0)`, `-0.0 == 0`), then date-times, then
/// strings compared as text. Text is never compared as a number here; use
/// [`Value::loose_eq`] for that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    #[default]
    Null,

    /// 32-bit signed integer
    Integer(i32),

    /// 64-bit signed integer
    LongInt(i64),

    /// 64-bit floating point
    Float(f64),

    /// Fixed-point decimal
    Decimal(Decimal),

    /// Date and time without time zone, second precision on output
    DateTime(NaiveDateTime),

    /// Text string
    String(String),
}

/// Type code of a [`Value`], also used by dialects for column type mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    Integer,
    LongInt,
    Float,
    Decimal,
    DateTime,
    String,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "Null",
            ValueType::Integer => "Integer",
            ValueType::LongInt => "LongInt",
            ValueType::Float => "Float",
            ValueType::Decimal => "Decimal",
            ValueType::DateTime => "DateTime",
            ValueType::String => "String",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn get_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Integer(_) => ValueType::Integer,
            Value::LongInt(_) => ValueType::LongInt,
            Value::Float(_) => ValueType::Float,
            Value::Decimal(_) => ValueType::Decimal,
            Value::DateTime(_) => ValueType::DateTime,
            Value::String(_) => ValueType::String,
        }
    }

    /// `self` if non-null, otherwise `default`.
    pub fn nvl(self, default: Value) -> Value {
        if self.is_null() { default } else { self }
    }

    pub fn as_integer(&self) -> Result<i32> {
        let wide = self.as_longint().map_err(|e| self.recast(e, ValueType::Integer))?;
        i32::try_from(wide).map_err(|_| self.bad_cast(ValueType::Integer))
    }

    pub fn as_longint(&self) -> Result<i64> {
        match self {
            Value::Null => Err(Error::ValueIsNull),
            Value::Integer(v) => Ok(i64::from(*v)),
            Value::LongInt(v) => Ok(*v),
            Value::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    Ok(*v as i64)
                } else {
                    Err(self.bad_cast(ValueType::LongInt))
                }
            }
            Value::Decimal(d) => {
                if d.fract().is_zero() {
                    d.to_i64().ok_or_else(|| self.bad_cast(ValueType::LongInt))
                } else {
                    Err(self.bad_cast(ValueType::LongInt))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.bad_cast(ValueType::LongInt)),
            Value::DateTime(_) => Err(self.bad_cast(ValueType::LongInt)),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Null => Err(Error::ValueIsNull),
            Value::Integer(v) => Ok(f64::from(*v)),
            Value::LongInt(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| self.bad_cast(ValueType::Float)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.bad_cast(ValueType::Float)),
            Value::DateTime(_) => Err(self.bad_cast(ValueType::Float)),
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal> {
        match self {
            Value::Null => Err(Error::ValueIsNull),
            Value::Integer(v) => Ok(Decimal::from(*v)),
            Value::LongInt(v) => Ok(Decimal::from(*v)),
            Value::Float(v) => Decimal::from_f64(*v).ok_or_else(|| self.bad_cast(ValueType::Decimal)),
            Value::Decimal(d) => Ok(*d),
            Value::String(s) => parse_decimal(s).ok_or_else(|| self.bad_cast(ValueType::Decimal)),
            Value::DateTime(_) => Err(self.bad_cast(ValueType::Decimal)),
        }
    }

    /// Date-time view of the value.
    ///
    /// Strings are accepted as `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD HH:MM:SS`
    /// (optionally with fractional seconds) or a bare `YYYY-MM-DD`; integers
    /// are taken as Unix epoch seconds.
    pub fn as_date_time(&self) -> Result<NaiveDateTime> {
        match self {
            Value::Null => Err(Error::ValueIsNull),
            Value::DateTime(dt) => Ok(*dt),
            Value::Integer(_) | Value::LongInt(_) => {
                let secs = self.as_longint()?;
                chrono::DateTime::from_timestamp(secs, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| self.bad_cast(ValueType::DateTime))
            }
            Value::String(s) => {
                parse_date_time(s).ok_or_else(|| self.bad_cast(ValueType::DateTime))
            }
            Value::Float(_) | Value::Decimal(_) => Err(self.bad_cast(ValueType::DateTime)),
        }
    }

    pub fn as_string(&self) -> Result<String> {
        match self {
            Value::Null => Err(Error::ValueIsNull),
            Value::Integer(v) => Ok(v.to_string()),
            Value::LongInt(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            Value::Decimal(d) => Ok(d.normalize().to_string()),
            Value::DateTime(dt) => Ok(dt.format(ISO_DATE_TIME_FORMAT).to_string()),
            Value::String(s) => Ok(s.clone()),
        }
    }

    /// Borrow the text payload without conversion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render a literal suitable for inlining in SQL text.
    pub fn sql_str(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(v) => v.to_string(),
            Value::LongInt(v) => v.to_string(),
            Value::Float(v) if v.is_finite() => v.to_string(),
            // Bare NaN/inf would read as column names.
            Value::Float(v) if v.is_nan() => quote_sql_string("NaN"),
            Value::Float(v) if *v > 0.0 => quote_sql_string("Infinity"),
            Value::Float(_) => quote_sql_string("-Infinity"),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::DateTime(dt) => format!("'{}'", dt.format(SQL_DATE_TIME_FORMAT)),
            Value::String(s) => quote_sql_string(s),
        }
    }

    fn bad_cast(&self, target: ValueType) -> Error {
        Error::bad_cast(self.to_string(), target.name())
    }

    // Re-target a cast error raised by an intermediate conversion.
    fn recast(&self, err: Error, target: ValueType) -> Error {
        match err {
            Error::ValueBadCast(_) => self.bad_cast(target),
            other => other,
        }
    }

    // Sort class: null, numbers, date-times, text.
    fn class_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::LongInt(_) | Value::Float(_) | Value::Decimal(_) => 1,
            Value::DateTime(_) => 2,
            Value::String(_) => 3,
        }
    }

    fn numeric_key(&self) -> Option<NumericKey> {
        match self {
            Value::Integer(v) => Some(NumericKey::Exact(Decimal::from(*v))),
            Value::LongInt(v) => Some(NumericKey::Exact(Decimal::from(*v))),
            Value::Decimal(d) => Some(NumericKey::Exact(*d)),
            Value::Float(v) => Some(NumericKey::from_float(*v)),
            _ => None,
        }
    }

    /// Compare the way the SQL layer does: both sides are converted to a
    /// common type (decimal, then integer, then date-time, then text), so
    /// `Integer(1)` matches `String("1")`.
    ///
    /// Unlike [`Ord`], this is not transitive across variants and must not
    /// be used for sorting.
    pub fn loose_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        if self.class_rank() == other.class_rank() && self.class_rank() != 1 {
            return self.cmp(other);
        }
        if let (Ok(a), Ok(b)) = (self.as_decimal(), other.as_decimal()) {
            return a.cmp(&b);
        }
        if let (Ok(a), Ok(b)) = (self.as_longint(), other.as_longint()) {
            return a.cmp(&b);
        }
        if let (Ok(a), Ok(b)) = (self.as_date_time(), other.as_date_time()) {
            return a.cmp(&b);
        }
        if self.class_rank() == 1 && other.class_rank() == 1 {
            return self.cmp(other);
        }
        self.to_string().cmp(&other.to_string())
    }

    /// Loose equality, see [`Value::loose_cmp`].
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.loose_cmp(other) == Ordering::Equal
    }
}

// One ordering key for every numeric variant. Floats outside the decimal
// range sort below or above all decimals; NaN sorts last.
#[derive(Debug, Clone, Copy)]
enum NumericKey {
    Below(f64),
    Exact(Decimal),
    Above(f64),
    NaN,
}

impl NumericKey {
    fn from_float(v: f64) -> Self {
        if v.is_nan() {
            NumericKey::NaN
        } else if v == 0.0 {
            NumericKey::Exact(Decimal::ZERO)
        } else if let Some(d) = Decimal::from_f64(v) {
            NumericKey::Exact(d)
        } else if v.abs() < 1.0 {
            // Underflows the decimal scale.
            NumericKey::Exact(Decimal::ZERO)
        } else if v < 0.0 {
            NumericKey::Below(v)
        } else {
            NumericKey::Above(v)
        }
    }

    fn rank(&self) -> u8 {
        match self {
            NumericKey::Below(_) => 0,
            NumericKey::Exact(_) => 1,
            NumericKey::Above(_) => 2,
            NumericKey::NaN => 3,
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NumericKey::Below(a), NumericKey::Below(b))
            | (NumericKey::Above(a), NumericKey::Above(b)) => a.total_cmp(b),
            (NumericKey::Exact(a), NumericKey::Exact(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_sql_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_class = self.class_rank().cmp(&other.class_rank());
        if by_class != Ordering::Equal {
            return by_class;
        }
        match (self, other) {
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => match (self.numeric_key(), other.numeric_key()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_string() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("NULL"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::LongInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl TryFrom<&Value> for i32 {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        v.as_integer()
    }
}

impl TryFrom<&Value> for i64 {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        v.as_longint()
    }
}

impl TryFrom<&Value> for f64 {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        v.as_float()
    }
}

impl TryFrom<&Value> for Decimal {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        v.as_decimal()
    }
}

impl TryFrom<&Value> for NaiveDateTime {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        v.as_date_time()
    }
}

impl TryFrom<&Value> for String {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self> {
        v.as_string()
    }
}

impl<'a, T> TryFrom<&'a Value> for Option<T>
where
    T: TryFrom<&'a Value, Error = Error>,
{
    type Error = Error;

    fn try_from(v: &'a Value) -> Result<Self> {
        if v.is_null() {
            Ok(None)
        } else {
            T::try_from(v).map(Some)
        }
    }
}
