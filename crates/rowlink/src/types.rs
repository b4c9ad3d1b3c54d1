//! Type equivalence between declared column types and native field kinds.

use crate::record::FieldKind;

const INTS: &[FieldKind] = &[FieldKind::Int, FieldKind::Long];
const SMALL_INTS: &[FieldKind] = &[FieldKind::Short, FieldKind::Int, FieldKind::Long];
const TINY_INTS: &[FieldKind] = &[FieldKind::Bool, FieldKind::Byte];
const BOOLS: &[FieldKind] = &[FieldKind::Bool];
const TIMESTAMPS: &[FieldKind] = &[
    FieldKind::Date,
    FieldKind::DateTime,
    FieldKind::Timestamp,
    FieldKind::Time,
];

const NUMERIC_TYPES: &[&str] = &[
    "int",
    "integer",
    "smallint",
    "mediumint",
    "bigint",
    "tinyint",
    "float",
    "double",
    "decimal",
];
const DATETIME_TYPES: &[&str] = &["datetime", "timestamp"];
const DATE_TYPES: &[&str] = &["date"];

/// Returns the field kinds assignable to a normalized column type.
///
/// `None` means the type is unclassified and every field is a candidate.
#[must_use]
pub fn equivalent_kinds(column_type: &str) -> Option<&'static [FieldKind]> {
    let kinds: &'static [FieldKind] = match column_type {
        "int" | "integer" | "mediumint" => INTS,
        "smallint" => SMALL_INTS,
        "bigint" => &[FieldKind::Long],
        "tinyint" => TINY_INTS,
        "bool" | "boolean" => BOOLS,
        "float" => &[FieldKind::Float],
        "double" | "decimal" => &[FieldKind::Double],
        "date" => &[FieldKind::Date, FieldKind::Timestamp],
        "datetime" | "timestamp" => TIMESTAMPS,
        "time" => &[FieldKind::Time],
        "year" => &[FieldKind::Short, FieldKind::Int],
        _ => return None,
    };
    Some(kinds)
}

/// Returns whether a field of `kind` may be paired with a column of
/// `column_type`. Text fields are always accepted.
#[must_use]
pub fn is_assignable(column_type: Option<&str>, kind: FieldKind) -> bool {
    if kind == FieldKind::Text {
        return true;
    }
    column_type
        .and_then(equivalent_kinds)
        .is_none_or(|kinds| kinds.contains(&kind))
}

/// Numeric column types.
#[must_use]
pub fn is_numeric(column_type: &str) -> bool {
    NUMERIC_TYPES.contains(&column_type)
}

/// Column types holding a date and a time of day.
#[must_use]
pub fn is_datetime(column_type: &str) -> bool {
    DATETIME_TYPES.contains(&column_type)
}

/// Column types holding only a date.
#[must_use]
pub fn is_date(column_type: &str) -> bool {
    DATE_TYPES.contains(&column_type)
}

/// Normalizes a declared column type: lowercase, parameters and modifiers
/// stripped (`VARCHAR(255)` → `varchar`, `int(11) unsigned` → `int`).
#[must_use]
pub fn normalize_type(declared: &str) -> String {
    let base = declared.split('(').next().unwrap_or(declared);
    base.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
