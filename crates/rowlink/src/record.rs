//! Record descriptors.
//!
//! A [`Record`] publishes a static table of [`Field`]s: name, native kind and
//! a getter/setter pair. The correlation engine reads names and kinds, the
//! codec reads and writes through the function pointers. The table is
//! normally generated with `#[derive(Record)]` from `rowlink-derive`.

use std::fmt;

use crate::value::{Value, ValueError};

/// Native type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `i8`
    Byte,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// `bool`
    Bool,
    /// `String`
    Text,
    /// `chrono::NaiveDate`
    Date,
    /// `chrono::NaiveDateTime`
    DateTime,
    /// `chrono::DateTime<Utc>`
    Timestamp,
    /// `chrono::NaiveTime`
    Time,
}

impl FieldKind {
    /// Returns true for kinds holding a date and a time of day.
    #[must_use]
    pub const fn is_timestamp_like(self) -> bool {
        matches!(self, Self::DateTime | Self::Timestamp)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "i8",
            Self::Short => "i16",
            Self::Int => "i32",
            Self::Long => "i64",
            Self::Float => "f32",
            Self::Double => "f64",
            Self::Bool => "bool",
            Self::Text => "String",
            Self::Date => "NaiveDate",
            Self::DateTime => "NaiveDateTime",
            Self::Timestamp => "DateTime<Utc>",
            Self::Time => "NaiveTime",
        };
        f.write_str(name)
    }
}

/// One field of a record type.
pub struct Field<R> {
    /// Field name as declared on the struct.
    pub name: &'static str,
    /// Native kind of the field.
    pub kind: FieldKind,
    /// Reads the field.
    pub get: fn(&R) -> Value,
    /// Writes the field.
    pub set: fn(&mut R, Value) -> Result<(), ValueError>,
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A type that can be read from and written to a table.
///
/// # Example
///
/// ```ignore
/// use rowlink::Record;
///
/// #[derive(Debug, Default, Clone, Record)]
/// struct User {
///     id: i32,
///     user_name: String,
///     signup_date: chrono::DateTime<chrono::Utc>,
/// }
/// ```
pub trait Record: Default + Send + Sync + 'static {
    /// Returns the field table for this type.
    fn fields() -> &'static [Field<Self>];

    /// Looks a field up by name.
    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NativeType;

    #[derive(Default)]
    struct Point {
        x: i32,
        label: String,
    }

    impl Record for Point {
        fn fields() -> &'static [Field<Self>] {
            static FIELDS: &[Field<Point>] = &[
                Field {
                    name: "x",
                    kind: FieldKind::Int,
                    get: |p| p.x.to_value(),
                    set: |p, v| {
                        p.x = NativeType::from_value(v)?;
                        Ok(())
                    },
                },
                Field {
                    name: "label",
                    kind: FieldKind::Text,
                    get: |p| p.label.to_value(),
                    set: |p, v| {
                        p.label = NativeType::from_value(v)?;
                        Ok(())
                    },
                },
            ];
            FIELDS
        }
    }

    #[test]
    fn test_field_lookup() {
        assert!(Point::field("x").is_some());
        assert!(Point::field("y").is_none());
        assert_eq!(Point::field("label").unwrap().kind, FieldKind::Text);
    }

    #[test]
    fn test_field_accessors() {
        let mut p = Point::default();
        let x = Point::field("x").unwrap();
        (x.set)(&mut p, Value::Int(7)).unwrap();
        assert_eq!((x.get)(&p), Value::Int(7));
        assert_eq!(p.label, "");
    }
}
