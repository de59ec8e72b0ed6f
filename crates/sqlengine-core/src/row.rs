//! Database row representation.

use crate::Result;
use crate::error::Error;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
///
/// Names are stored uppercased; lookups uppercase the requested name, so
/// `row.get_by_name("id")` and `row.get_by_name("ID")` are the same column.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create column info from native column names.
    pub fn new<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_uppercase())
            .collect();
        let mut name_to_index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // First occurrence wins for duplicated names.
            name_to_index.entry(name.clone()).or_insert(i);
        }
        Self {
            names,
            name_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(&name.to_uppercase()).copied()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single fetched row: an ordered sequence of `(COLUMN_NAME, Value)` pairs.
///
/// Column metadata is shared via `Arc` between rows of one result set.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a row with its own column metadata.
    pub fn new<S: AsRef<str>>(column_names: impl IntoIterator<Item = S>, values: Vec<Value>) -> Self {
        Self {
            values,
            columns: Arc::new(ColumnInfo::new(column_names)),
        }
    }

    /// Create a row sharing column metadata with its result set.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column index.
    pub fn get_as<T>(&self, index: usize) -> Result<T>
    where
        T: for<'a> TryFrom<&'a Value, Error = Error>,
    {
        let value = self.get(index).ok_or_else(|| {
            Error::bad_sql_operation(format!(
                "Column index {} out of range, row has {} columns",
                index,
                self.len()
            ))
        })?;
        T::try_from(value)
    }

    /// Get a typed value by column name.
    pub fn get_named<T>(&self, name: &str) -> Result<T>
    where
        T: for<'a> TryFrom<&'a Value, Error = Error>,
    {
        let value = self
            .get_by_name(name)
            .ok_or_else(|| Error::bad_sql_operation(format!("Column '{}' not found", name)))?;
        T::try_from(value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.names().iter().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.column_names().zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_uppercased() {
        let row = Row::new(["id", "Name"], vec![Value::from(1), Value::from("x")]);
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["ID", "NAME"]);
        assert_eq!(row.get_by_name("name"), Some(&Value::from("x")));
        assert_eq!(row.get_by_name("NAME"), Some(&Value::from("x")));
        assert!(row.get_by_name("missing").is_none());
    }

    #[test]
    fn typed_access() {
        let row = Row::new(["A", "B"], vec![Value::from("12"), Value::Null]);
        assert_eq!(row.get_as::<i32>(0).unwrap(), 12);
        assert_eq!(row.get_named::<Option<i64>>("b").unwrap(), None);
        assert!(row.get_as::<i32>(5).is_err());
        assert!(row.get_named::<i32>("C").is_err());
        assert!(matches!(row.get_named::<i32>("B"), Err(Error::ValueIsNull)));
    }

    #[test]
    fn shared_columns() {
        let columns = Arc::new(ColumnInfo::new(["X"]));
        let r1 = Row::with_columns(Arc::clone(&columns), vec![Value::from(1)]);
        let r2 = Row::with_columns(columns, vec![Value::from(2)]);
        assert!(Arc::ptr_eq(&r1.column_info(), &r2.column_info()));
        let pairs: Vec<_> = r2.iter().collect();
        assert_eq!(pairs, vec![("X", &Value::from(2))]);
    }
}
