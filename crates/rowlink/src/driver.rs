//! The database driver seam.
//!
//! The engine never talks to a server directly. A [`Driver`] runs plain SQL
//! text with positional `?` parameters and hands back [`Row`]s or an
//! [`ExecResult`]. `rowlink-mysql` provides the MySQL implementation.

use thiserror::Error;

use crate::value::Value;

/// A result row: values in select order, addressable by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from parallel column and value lists.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Builds a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values) = pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }

    /// Returns the value of `column`, if the row has it.
    ///
    /// Lookup is exact first, then ASCII case-insensitive, since servers
    /// differ in how they echo identifiers.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })
            .map(|i| &self.values[i])
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns a text cell, `None` for NULL or missing columns.
    #[must_use]
    pub fn get_text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Column names in select order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true for a row without cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Key generated by the server for an insert, if any.
    pub last_insert_id: Option<u64>,
}

/// Errors raised by a driver.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The connection is gone or could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// The statement referenced a table that does not exist.
    #[error("table does not exist: {0}")]
    NoSuchTable(String),

    /// Any other server-side failure.
    #[error("query failed: {0}")]
    Query(String),
}

/// Synchronous access to a database.
///
/// Implementations must be shareable across the worker threads of a
/// client.
pub trait Driver: Send + Sync {
    /// Runs a statement returning rows.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when the server rejects the statement.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Runs a statement returning an affected-row count.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] when the server rejects the statement.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = Row::from_pairs([("ID", Value::Int(1)), ("name", Value::Text("a".into()))]);
        assert_eq!(row.get("ID"), Some(&Value::Int(1)));
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get_text("name").as_deref(), Some("a"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_index(1), Some(&Value::Text("a".into())));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_get_text_of_null() {
        let row = Row::from_pairs([("d", Value::Null)]);
        assert_eq!(row.get_text("d"), None);
    }
}
