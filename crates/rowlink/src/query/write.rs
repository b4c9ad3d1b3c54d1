//! Insert, update and delete.

use tracing::error;

use crate::catalog::TableMetadata;
use crate::codec::encode;
use crate::correlate::CorrelationMap;
use crate::error::{Error, Result};
use crate::record::{Field, Record};
use crate::value::Value;

use super::statement::{Statement, StatementWriter};

fn mapped_fields<'m, R: Record>(
    map: &'m CorrelationMap,
) -> impl Iterator<Item = (&'m str, &'static Field<R>)> + 'm {
    map.iter()
        .filter_map(|(column, field)| R::field(field).map(|f| (column, f)))
}

fn column_value<R: Record>(meta: &TableMetadata, column: &str, field: &Field<R>, record: &R) -> Value {
    encode((field.get)(record), field.kind, meta.column_type(column))
}

/// `insert into <t> (<cols>) values (?, ...)` over the mapped updatable
/// columns.
#[must_use]
pub fn insert<R: Record>(meta: &TableMetadata, map: &CorrelationMap, record: &R) -> Statement {
    let pairs: Vec<_> = mapped_fields::<R>(map)
        .filter(|(column, _)| meta.is_updatable(column))
        .collect();

    let mut w = StatementWriter::new();
    w.push("insert into ").push(&meta.table).push(" (");
    w.push_list(&pairs, |w, (column, _)| {
        w.push(column);
    });
    w.push(") values (");
    w.push_list(&pairs, |w, (column, field)| {
        w.bind(column_value(meta, column, field, record));
    });
    w.push(")");
    w.finish()
}

/// `update <t> set <col> = ?, ... where <pk> = ?`.
///
/// `map` must have been resolved over the updatable columns plus the primary
/// key. The key value comes from the record itself.
///
/// # Errors
///
/// Returns [`Error::CorrelationEmpty`] when the primary key, or every
/// settable column, is left unmapped.
pub fn update<R: Record>(meta: &TableMetadata, map: &CorrelationMap, record: &R) -> Result<Statement> {
    let pk = meta.primary_key.as_str();
    let Some(pk_field) = map.field_for(pk).and_then(R::field) else {
        error!(table = %meta.table, column = %pk, "Primary key has no matching field");
        return Err(Error::CorrelationEmpty {
            table: meta.table.clone(),
            column: pk.to_string(),
        });
    };

    let set: Vec<_> = mapped_fields::<R>(map)
        .filter(|(column, _)| *column != pk && meta.is_updatable(column))
        .collect();
    if set.is_empty() {
        let column = meta
            .updatable_columns
            .iter()
            .find(|c| *c != pk)
            .map_or(pk, String::as_str);
        error!(table = %meta.table, column = %column, "No settable column has a matching field");
        return Err(Error::CorrelationEmpty {
            table: meta.table.clone(),
            column: column.to_string(),
        });
    }

    let mut w = StatementWriter::new();
    w.push("update ").push(&meta.table).push(" set ");
    w.push_list(&set, |w, (column, field)| {
        w.push(column)
            .push(" = ")
            .bind(column_value(meta, column, field, record));
    });
    w.push(" where ")
        .push(pk)
        .push(" = ")
        .bind(column_value(meta, pk, pk_field, record));
    Ok(w.finish())
}

/// `delete from <t> where <filter>`. The filter is passed through verbatim.
#[must_use]
pub fn delete(meta: &TableMetadata, filter: &str) -> Statement {
    let mut w = StatementWriter::new();
    w.push("delete from ")
        .push(&meta.table)
        .push(" where ")
        .push(filter.trim());
    w.finish()
}
