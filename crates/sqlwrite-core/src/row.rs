//! Rows returned by the database.

use std::sync::Arc;

use crate::error::{Error, Result, TypeError};
use crate::value::Value;

/// A single result row.
///
/// Column names are shared between all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from column names and values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Create a row sharing another row's column list.
    pub fn with_columns(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared column list, for building sibling rows.
    pub fn shared_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    /// All values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at an ordinal.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Ordinal of a column, matched case-insensitively.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }

    /// Value of a named column.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Convert the value at an ordinal.
    #[allow(clippy::result_large_err)]
    pub fn get_as<T: FromValue>(&self, idx: usize) -> Result<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            Error::protocol(format!(
                "column index {idx} out of range for row with {} columns",
                self.values.len()
            ))
        })?;
        T::from_value(value).map_err(|e| with_column(e, self.columns.get(idx).cloned()))
    }

    /// Convert the value of a named column.
    #[allow(clippy::result_large_err)]
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::protocol(format!("column '{name}' not present in row")))?;
        self.get_as(idx)
    }
}

fn with_column(err: Error, column: Option<String>) -> Error {
    match err {
        Error::Type(mut t) => {
            t.column = column;
            Error::Type(t)
        }
        other => other,
    }
}

/// Conversion from a database value.
pub trait FromValue: Sized {
    #[allow(clippy::result_large_err)]
    fn from_value(value: &Value) -> Result<Self>;
}

fn type_error(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: None,
    })
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| type_error("BIGINT", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| type_error("INTEGER", value))
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_i64()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| type_error("unsigned BIGINT", value))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| type_error("BOOLEAN", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| type_error("DOUBLE", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s.clone()),
            _ => Err(type_error("TEXT", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
