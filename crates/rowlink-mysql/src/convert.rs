//! Conversion of `sqlx` rows into rowlink rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rowlink::{DriverError, Row, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// How a MySQL column type is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Double,
    Decimal,
    Date,
    DateTime,
    Timestamp,
    Time,
    Text,
    Binary,
}

/// Maps the type name reported by `sqlx` (e.g. `INT UNSIGNED`) to a
/// [`CellKind`].
#[must_use]
pub fn cell_kind(type_name: &str) -> CellKind {
    let upper = type_name.to_ascii_uppercase();
    let unsigned = upper.ends_with("UNSIGNED");
    let base = upper.split_whitespace().next().unwrap_or_default();
    match base {
        "BOOLEAN" | "BOOL" => CellKind::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" | "BIT" => {
            if unsigned || base == "YEAR" || base == "BIT" {
                CellKind::Unsigned
            } else {
                CellKind::Signed
            }
        }
        "FLOAT" => CellKind::Float,
        "DOUBLE" | "REAL" => CellKind::Double,
        "DECIMAL" | "NUMERIC" | "NEWDECIMAL" => CellKind::Decimal,
        "DATE" => CellKind::Date,
        "DATETIME" => CellKind::DateTime,
        "TIMESTAMP" => CellKind::Timestamp,
        "TIME" => CellKind::Time,
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            CellKind::Binary
        }
        _ => CellKind::Text,
    }
}

fn decode_error(column: &str, error: impl std::fmt::Display) -> DriverError {
    DriverError::Query(format!("cannot decode column {column}: {error}"))
}

fn cell(row: &MySqlRow, index: usize, name: &str, kind: CellKind) -> Result<Value, DriverError> {
    let raw = row.try_get_raw(index).map_err(|e| decode_error(name, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match kind {
        CellKind::Bool => row.try_get_unchecked::<bool, _>(index).map(Value::Bool),
        CellKind::Signed => row.try_get_unchecked::<i64, _>(index).map(Value::Int),
        CellKind::Unsigned => row
            .try_get_unchecked::<u64, _>(index)
            .map(|n| i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Int)),
        CellKind::Float => row
            .try_get_unchecked::<f32, _>(index)
            .map(|f| Value::Float(f64::from(f))),
        CellKind::Double => row.try_get_unchecked::<f64, _>(index).map(Value::Float),
        CellKind::Decimal => row
            .try_get_unchecked::<String, _>(index)
            .map(|s| s.parse().map_or(Value::Text(s), Value::Float)),
        CellKind::Date => row.try_get_unchecked::<NaiveDate, _>(index).map(Value::Date),
        CellKind::DateTime => row
            .try_get_unchecked::<NaiveDateTime, _>(index)
            .map(Value::DateTime),
        CellKind::Timestamp => row
            .try_get_unchecked::<DateTime<Utc>, _>(index)
            .map(Value::Timestamp),
        CellKind::Time => row.try_get_unchecked::<NaiveTime, _>(index).map(Value::Time),
        CellKind::Text => row.try_get_unchecked::<String, _>(index).map(Value::Text),
        CellKind::Binary => row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Bytes),
    };

    // Zero dates, negative times and odd charsets still come through as text
    // or bytes.
    value
        .or_else(|_| row.try_get_unchecked::<String, _>(index).map(Value::Text))
        .or_else(|_| row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Bytes))
        .map_err(|e| decode_error(name, e))
}

/// Converts one result row.
pub fn row(row: &MySqlRow) -> Result<Row, DriverError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for column in row.columns() {
        let name = column.name();
        let kind = cell_kind(column.type_info().name());
        values.push(cell(row, column.ordinal(), name, kind)?);
        columns.push(name.to_string());
    }
    Ok(Row::new(columns, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_kind() {
        assert_eq!(cell_kind("INT"), CellKind::Signed);
        assert_eq!(cell_kind("BIGINT UNSIGNED"), CellKind::Unsigned);
        assert_eq!(cell_kind("BOOLEAN"), CellKind::Bool);
        assert_eq!(cell_kind("DECIMAL"), CellKind::Decimal);
        assert_eq!(cell_kind("DATETIME"), CellKind::DateTime);
        assert_eq!(cell_kind("TIMESTAMP"), CellKind::Timestamp);
        assert_eq!(cell_kind("VARCHAR"), CellKind::Text);
        assert_eq!(cell_kind("ENUM"), CellKind::Text);
        assert_eq!(cell_kind("BLOB"), CellKind::Binary);
        assert_eq!(cell_kind("YEAR"), CellKind::Unsigned);
        assert_eq!(cell_kind("float"), CellKind::Float);
    }
}
