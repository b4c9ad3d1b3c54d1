//! Value codec.
//!
//! Adapts field values to the declared type of their target column before
//! they are bound, renders values as SQL literals for logs and cache keys,
//! and materializes records from result rows.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::marker::PhantomData;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tracing::{trace, warn};

use crate::correlate::CorrelationMap;
use crate::driver::Row;
use crate::record::{Field, FieldKind, Record};
use crate::types;
use crate::value::{Value, ValueError, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};

fn whole_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Adapts a field value of `kind` to a column of the given normalized type.
///
/// Temporal values are narrowed to a date for `date` columns and to a
/// second-precision date-time for `datetime`/`timestamp` columns. Anything
/// else passes through unchanged.
#[must_use]
pub fn encode(value: Value, kind: FieldKind, column_type: Option<&str>) -> Value {
    let Some(column_type) = column_type else {
        return value;
    };
    if !(kind.is_timestamp_like() || kind == FieldKind::Date) {
        return value;
    }

    if types::is_date(column_type) {
        return match value {
            Value::Timestamp(ts) => Value::Date(ts.date_naive()),
            Value::DateTime(dt) => Value::Date(dt.date()),
            other => other,
        };
    }
    if types::is_datetime(column_type) {
        return match value {
            Value::Timestamp(ts) => Value::DateTime(whole_seconds(ts.naive_utc())),
            Value::DateTime(dt) => Value::DateTime(whole_seconds(dt)),
            Value::Date(d) => Value::DateTime(d.and_time(NaiveTime::MIN)),
            other => other,
        };
    }
    value
}

/// Adapts a result cell to the field it is about to be written into.
///
/// Covers the pairs the equivalence table allows but the native conversion
/// does not: a date or time field read from a date-time column.
#[must_use]
pub fn decode_cell(value: Value, kind: FieldKind) -> Value {
    match (kind, value) {
        (FieldKind::Date, Value::DateTime(dt)) => Value::Date(dt.date()),
        (FieldKind::Date, Value::Timestamp(ts)) => Value::Date(ts.date_naive()),
        (FieldKind::Time, Value::DateTime(dt)) => Value::Time(dt.time()),
        (FieldKind::Time, Value::Timestamp(ts)) => Value::Time(ts.time()),
        (_, value) => value,
    }
}

/// Renders a value as a SQL literal.
///
/// Only used for display and cache keys: statements always bind values as
/// parameters.
#[must_use]
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bytes(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 3);
            out.push_str("X'");
            for b in bytes {
                let _ = write!(out, "{b:02x}");
            }
            out.push('\'');
            out
        }
        Value::Date(d) => format!("'{}'", d.format(DATE_FORMAT)),
        Value::DateTime(dt) => format!("'{}'", dt.format(DATETIME_FORMAT)),
        Value::Time(t) => format!("'{}'", t.format(TIME_FORMAT)),
        Value::Timestamp(ts) => format!("'{}'", ts.format(DATETIME_FORMAT)),
    }
}

/// Materializes records of type `R` from the rows of one result set.
///
/// A field whose conversion fails structurally is skipped for every later
/// row of the same decoder.
pub struct RowDecoder<'a, R: Record> {
    table: &'a str,
    pairs: Vec<(&'a str, &'static Field<R>)>,
    incompatible: HashSet<&'static str>,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> RowDecoder<'a, R> {
    /// Creates a decoder for the columns of `map`.
    #[must_use]
    pub fn new(table: &'a str, map: &'a CorrelationMap) -> Self {
        let pairs = map
            .iter()
            .filter_map(|(column, field)| R::field(field).map(|f| (column, f)))
            .collect();
        Self {
            table,
            pairs,
            incompatible: HashSet::new(),
            _record: PhantomData,
        }
    }

    /// Builds one record from `row`, leaving unmapped fields at their
    /// defaults.
    pub fn decode(&mut self, row: &Row) -> R {
        let mut record = R::default();
        for (column, field) in &self.pairs {
            if self.incompatible.contains(field.name) {
                continue;
            }
            let Some(cell) = row.get(column) else {
                continue;
            };
            let cell = decode_cell(cell.clone(), field.kind);
            match (field.set)(&mut record, cell) {
                Ok(()) => {}
                Err(ValueError::UnexpectedNull { .. }) => {
                    trace!(table = %self.table, column = %column, field = field.name, "NULL left as default");
                }
                Err(e) => {
                    warn!(
                        table = %self.table,
                        column = %column,
                        field = field.name,
                        kind = %field.kind,
                        error = %e,
                        "Incompatible column, skipping field for this result set"
                    );
                    self.incompatible.insert(field.name);
                }
            }
        }
        record
    }

    /// Decodes every row.
    pub fn decode_all(&mut self, rows: &[Row]) -> Vec<R> {
        rows.iter().map(|row| self.decode(row)).collect()
    }

    /// Fields marked incompatible so far.
    #[must_use]
    pub fn incompatible_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<_> = self.incompatible.iter().copied().collect();
        fields.sort_unstable();
        fields
    }
}
