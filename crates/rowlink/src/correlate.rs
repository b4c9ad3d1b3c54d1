//! Column/field correlation.
//!
//! Pairs table columns with record fields by Levenshtein distance, restricted
//! by the type equivalence table, and memoizes the outcome per
//! (record type, column set).

use std::any::{type_name, TypeId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::record::Record;
use crate::types;

/// Classic edit distance with unit insertion, deletion and substitution
/// costs. Compares characters, case-sensitively.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Resolved column → field pairing, injective in both directions.
///
/// Pairs are kept in the order the candidate columns were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationMap {
    pairs: Vec<(String, &'static str)>,
}

impl CorrelationMap {
    /// Returns the field paired with `column`.
    #[must_use]
    pub fn field_for(&self, column: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| *f)
    }

    /// Returns whether `column` is mapped.
    #[must_use]
    pub fn contains_column(&self, column: &str) -> bool {
        self.pairs.iter().any(|(c, _)| c == column)
    }

    /// Iterates over `(column, field)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.pairs.iter().map(|(c, f)| (c.as_str(), *f))
    }

    /// Mapped column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(c, _)| c.as_str())
    }

    /// Number of mapped columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when no column was mapped.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

struct Candidate {
    distance: usize,
    column: usize,
    field: &'static str,
}

/// Computes the correlation of `R`'s fields with `columns` without
/// memoization.
///
/// `column_type` returns the normalized declared type of a column, if known.
#[must_use]
pub fn correlate<R, F>(columns: &[String], column_type: F) -> CorrelationMap
where
    R: Record,
    F: Fn(&str) -> Option<String>,
{
    let mut candidates = Vec::new();
    for (index, column) in columns.iter().enumerate() {
        let declared = column_type(column);
        for field in R::fields() {
            if !types::is_assignable(declared.as_deref(), field.kind) {
                continue;
            }
            candidates.push(Candidate {
                distance: edit_distance(column, field.name),
                column: index,
                field: field.name,
            });
        }
    }

    // Stable: ties keep enumeration order.
    candidates.sort_by_key(|c| c.distance);

    let mut taken_columns = HashSet::new();
    let mut taken_fields = HashSet::new();
    let mut accepted = Vec::new();
    for candidate in candidates {
        if taken_columns.contains(&candidate.column) || taken_fields.contains(candidate.field) {
            continue;
        }
        taken_columns.insert(candidate.column);
        taken_fields.insert(candidate.field);
        accepted.push((candidate.column, candidate.field));
    }

    accepted.sort_by_key(|(column, _)| *column);
    CorrelationMap {
        pairs: accepted
            .into_iter()
            .map(|(column, field)| (columns[column].clone(), field))
            .collect(),
    }
}

type CorrelationKey = (TypeId, BTreeSet<String>);

/// Memo of resolved correlations.
///
/// Entries never expire: a (type, column set) pair keeps its first mapping
/// even if the table metadata later changes.
#[derive(Default)]
pub struct Correlator {
    memo: RwLock<HashMap<CorrelationKey, Arc<CorrelationMap>>>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized correlation for `R` and `columns`, computing it
    /// on first use.
    #[must_use]
    pub fn resolve<R, F>(&self, columns: &[String], table: &str, column_type: F) -> Arc<CorrelationMap>
    where
        R: Record,
        F: Fn(&str) -> Option<String>,
    {
        let key = (TypeId::of::<R>(), columns.iter().cloned().collect());
        let cached = self.memo.read().get(&key).cloned();
        if let Some(map) = cached {
            return map;
        }

        let map = Arc::new(correlate::<R, F>(columns, column_type));
        info!(
            table = %table,
            record = type_name::<R>(),
            pairs = ?map.pairs,
            "Saving new column/field correlation"
        );
        self.memo.write().insert(key, Arc::clone(&map));
        map
    }

    /// Number of memoized correlations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.read().len()
    }

    /// Returns true when nothing has been memoized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memo.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldKind};
    use crate::value::{NativeType, Value};

    #[derive(Default)]
    struct Account {
        id: i32,
        user_name: String,
        active: bool,
    }

    impl Record for Account {
        fn fields() -> &'static [Field<Self>] {
            static FIELDS: &[Field<Account>] = &[
                Field {
                    name: "id",
                    kind: FieldKind::Int,
                    get: |a| a.id.to_value(),
                    set: |a, v| {
                        a.id = NativeType::from_value(v)?;
                        Ok(())
                    },
                },
                Field {
                    name: "userName",
                    kind: FieldKind::Text,
                    get: |a| a.user_name.to_value(),
                    set: |a, v| {
                        a.user_name = NativeType::from_value(v)?;
                        Ok(())
                    },
                },
                Field {
                    name: "active",
                    kind: FieldKind::Bool,
                    get: |a| Value::Bool(a.active),
                    set: |a, v| {
                        a.active = NativeType::from_value(v)?;
                        Ok(())
                    },
                },
            ];
            FIELDS
        }
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn types_of(column: &str) -> Option<String> {
        match column {
            "id" => Some("int".into()),
            "user_name" | "nickname" => Some("varchar".into()),
            "is_active" => Some("tinyint".into()),
            _ => None,
        }
    }

    #[test]
    fn test_edit_distance_known_values() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("same", "same"), 0);
        assert_eq!(edit_distance("Id", "id"), 1);
    }

    #[test]
    fn test_edit_distance_metric_properties() {
        let words = ["user_name", "userName", "id", "signup_date", "signupDate", ""];
        for a in words {
            for b in words {
                let ab = edit_distance(a, b);
                assert_eq!(ab, edit_distance(b, a));
                assert_eq!(ab == 0, a == b);
                for c in words {
                    assert!(edit_distance(a, c) <= ab + edit_distance(b, c));
                }
            }
        }
    }

    #[test]
    fn test_correlate_basic() {
        let map = correlate::<Account, _>(&cols(&["id", "user_name", "is_active"]), types_of);
        assert_eq!(map.field_for("id"), Some("id"));
        assert_eq!(map.field_for("user_name"), Some("userName"));
        assert_eq!(map.field_for("is_active"), Some("active"));
        assert_eq!(map.columns().collect::<Vec<_>>(), vec!["id", "user_name", "is_active"]);
    }

    #[test]
    fn test_correlate_is_injective() {
        let columns = cols(&["id", "user_name", "nickname", "is_active", "extra"]);
        let map = correlate::<Account, _>(&columns, types_of);
        let fields: Vec<_> = map.iter().map(|(_, f)| f).collect();
        let unique: HashSet<_> = fields.iter().collect();
        assert_eq!(fields.len(), unique.len());
        let columns: Vec<_> = map.columns().collect();
        let unique: HashSet<_> = columns.iter().collect();
        assert_eq!(columns.len(), unique.len());
        // Three fields, so at most three columns can be mapped.
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_type_mismatch_excludes_pair() {
        // `active` is the only bool field; an int column cannot take it and
        // `id` is already claimed by the exact match.
        let map = correlate::<Account, _>(&cols(&["id", "count"]), |_| Some("int".into()));
        assert_eq!(map.field_for("id"), Some("id"));
        assert_eq!(map.field_for("count"), Some("userName"));
    }

    #[test]
    fn test_unmatched_column_is_omitted() {
        #[derive(Default)]
        struct Flag {
            on: bool,
        }
        impl Record for Flag {
            fn fields() -> &'static [Field<Self>] {
                static FIELDS: &[Field<Flag>] = &[Field {
                    name: "on",
                    kind: FieldKind::Bool,
                    get: |f| Value::Bool(f.on),
                    set: |f, v| {
                        f.on = NativeType::from_value(v)?;
                        Ok(())
                    },
                }];
                FIELDS
            }
        }
        let map = correlate::<Flag, _>(&cols(&["created"]), |_| Some("datetime".into()));
        assert!(map.is_empty());
    }

    #[test]
    fn test_resolve_memoizes() {
        let correlator = Correlator::new();
        let columns = cols(&["id", "user_name"]);
        let first = correlator.resolve::<Account, _>(&columns, "accounts", types_of);
        // Different type information no longer matters once memoized.
        let second = correlator.resolve::<Account, _>(&columns, "accounts", |_| Some("date".into()));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(correlator.len(), 1);

        // Same column set in another order hits the same entry.
        let reordered = cols(&["user_name", "id"]);
        let third = correlator.resolve::<Account, _>(&reordered, "accounts", types_of);
        assert!(Arc::ptr_eq(&first, &third));
    }
}
