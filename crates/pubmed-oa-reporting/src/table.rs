//! Row/column projection of serializable records.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ReportError;

/// One table row: field name -> value.
pub type Row = Map<String, Value>;

/// Rows of records plus the union of their field names in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per record.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self, ReportError> {
        let mut table = Self::new();
        for record in records {
            for row in to_rows(record)? {
                table.push_row(row);
            }
        }
        Ok(table)
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The cell at (`row`, `column`); `Value::Null` when the row lacks the field.
    pub fn cell(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }

    /// Drop rows whose `column` renders as an empty string (missing cells
    /// included). Returns how many rows were removed.
    pub fn retain_non_empty(&mut self, column: &str) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|row| !cell_text(row.get(column).unwrap_or(&Value::Null)).is_empty());
        before - self.rows.len()
    }
}

/// Split a serialized value into rows: an object is one row, an array is one
/// row per element, `null` is no rows, and a bare scalar becomes `{"value": …}`.
pub fn to_rows<T: Serialize + ?Sized>(value: &T) -> Result<Vec<Row>, ReportError> {
    Ok(match serde_json::to_value(value)? {
        Value::Null => Vec::new(),
        Value::Object(map) => vec![map],
        Value::Array(items) => items.into_iter().flat_map(|item| match item {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => Some(scalar_row(other)),
        }).collect(),
        other => vec![scalar_row(other)],
    })
}

fn scalar_row(value: Value) -> Row {
    let mut row = Row::new();
    row.insert("value".to_string(), value);
    row
}

/// Text rendering of one cell for flat formats. Missing and null cells are
/// empty, lists of strings are joined with `"; "`, other nested values are
/// compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        nested => nested.to_string(),
    }
}
