//! Runtime values and conversions to and from native field types.
//!
//! [`Value`] is the single carrier used for field values, bound statement
//! parameters and result cells. [`NativeType`] connects it to the Rust types
//! a record may declare.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use crate::record::FieldKind;

/// Format used for date-time literals and text parsing.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used for date literals and text parsing.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used for time literals and text parsing.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary value.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Instant in UTC.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Numeric view of the value as an integer, when it has one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric view of the value as a float, when it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Self::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(DATETIME_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// Conversion failure between a [`Value`] and a native type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value's variant cannot represent the target type.
    #[error("cannot convert {found} to {expected}")]
    Incompatible {
        /// Target native type.
        expected: &'static str,
        /// Variant that was supplied.
        found: &'static str,
    },

    /// The value fits the variant but not the target's range.
    #[error("value {value} out of range for {expected}")]
    OutOfRange {
        /// Target native type.
        expected: &'static str,
        /// Offending value, rendered.
        value: String,
    },

    /// NULL supplied for a type that has no empty representation.
    #[error("unexpected NULL for {expected}")]
    UnexpectedNull {
        /// Target native type.
        expected: &'static str,
    },
}

impl ValueError {
    const fn incompatible(expected: &'static str, found: &Value) -> Self {
        Self::Incompatible {
            expected,
            found: found.type_name(),
        }
    }
}

/// A Rust type usable as a record field.
///
/// The [`KIND`](NativeType::KIND) constant feeds the type equivalence table
/// during correlation; the two conversions back the generated field
/// accessors.
pub trait NativeType: Sized {
    /// Kind reported to the correlation engine.
    const KIND: FieldKind;

    /// Converts the field value into a [`Value`].
    fn to_value(&self) -> Value;

    /// Converts a result cell into the field type.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] when the cell cannot represent the type.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_native_int {
    ($ty:ty, $kind:expr, $name:literal) => {
        impl NativeType for $ty {
            const KIND: FieldKind = $kind;

            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::Null => Ok(0),
                    other => {
                        let n = other
                            .as_i64()
                            .ok_or_else(|| ValueError::incompatible($name, &other))?;
                        <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange {
                            expected: $name,
                            value: n.to_string(),
                        })
                    }
                }
            }
        }
    };
}

impl_native_int!(i8, FieldKind::Byte, "i8");
impl_native_int!(i16, FieldKind::Short, "i16");
impl_native_int!(i32, FieldKind::Int, "i32");
impl_native_int!(i64, FieldKind::Long, "i64");

impl NativeType for f64 {
    const KIND: FieldKind = FieldKind::Double;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            other => other
                .as_f64()
                .ok_or_else(|| ValueError::incompatible("f64", &other)),
        }
    }
}

impl NativeType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            other => other
                .as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ValueError::incompatible("f32", &other)),
        }
    }
}

impl NativeType for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Int(n) => Ok(n != 0),
            Value::Text(ref s) => match s.trim() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => Err(ValueError::incompatible("bool", &value)),
            },
            other => Err(ValueError::incompatible("bool", &other)),
        }
    }
}

impl NativeType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

impl NativeType for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Err(ValueError::UnexpectedNull {
                expected: "NaiveDate",
            }),
            Value::Date(d) => Ok(d),
            Value::Text(ref s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|_| ValueError::incompatible("NaiveDate", &value)),
            other => Err(ValueError::incompatible("NaiveDate", &other)),
        }
    }
}

impl NativeType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Err(ValueError::UnexpectedNull {
                expected: "NaiveDateTime",
            }),
            Value::DateTime(dt) => Ok(dt),
            Value::Timestamp(ts) => Ok(ts.naive_utc()),
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
                .map_err(|_| ValueError::incompatible("NaiveDateTime", &value)),
            other => Err(ValueError::incompatible("NaiveDateTime", &other)),
        }
    }
}

impl NativeType for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Err(ValueError::UnexpectedNull {
                expected: "DateTime<Utc>",
            }),
            Value::Timestamp(ts) => Ok(ts),
            Value::DateTime(dt) => Ok(Utc.from_utc_datetime(&dt)),
            Value::Date(d) => Ok(Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))),
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
                .map(|dt| Utc.from_utc_datetime(&dt))
                .map_err(|_| ValueError::incompatible("DateTime<Utc>", &value)),
            other => Err(ValueError::incompatible("DateTime<Utc>", &other)),
        }
    }
}

impl NativeType for NaiveTime {
    const KIND: FieldKind = FieldKind::Time;

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Err(ValueError::UnexpectedNull {
                expected: "NaiveTime",
            }),
            Value::Time(t) => Ok(t),
            Value::Text(ref s) => NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
                .map_err(|_| ValueError::incompatible("NaiveTime", &value)),
            other => Err(ValueError::incompatible("NaiveTime", &other)),
        }
    }
}

impl<T: NativeType> NativeType for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
