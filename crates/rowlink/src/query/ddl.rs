//! Table creation and removal.

use tracing::error;

use crate::error::{Error, Result};
use crate::value::Value;

use super::statement::{Statement, StatementWriter};

/// `create table if not exists <name> (<col> <def>, ...)` from a flat list
/// of alternating column names and definitions.
///
/// # Errors
///
/// Returns [`Error::InvalidTableDefinition`] for an empty name, an empty or
/// odd-length list, or an empty column name.
pub fn create_table(name: &str, definitions: &[&str]) -> Result<Statement> {
    let invalid = |reason: String| {
        error!(table = %name, reason = %reason, "Invalid table definition");
        Err(Error::InvalidTableDefinition(reason))
    };
    if name.trim().is_empty() {
        return invalid("table name is empty".to_string());
    }
    if definitions.is_empty() || definitions.len() % 2 != 0 {
        return invalid(format!(
            "expected pairs of column name and definition, got {} items",
            definitions.len()
        ));
    }
    if let Some(pair) = definitions.chunks(2).find(|pair| pair[0].trim().is_empty()) {
        return invalid(format!("empty column name for definition `{}`", pair[1]));
    }

    let mut w = StatementWriter::new();
    w.push("create table if not exists ").push(name.trim()).push(" (");
    w.push_list(definitions.chunks(2), |w, pair| {
        w.push(pair[0].trim()).push(" ").push(pair[1].trim());
    });
    w.push(")");
    Ok(w.finish())
}

/// `drop table <name>`.
#[must_use]
pub fn drop_table(name: &str) -> Statement {
    Statement::raw(format!("drop table {}", name.trim()))
}

/// Counts tables named `name` in `database`.
#[must_use]
pub fn table_exists(database: &str, name: &str) -> Statement {
    let mut w = StatementWriter::new();
    w.push("select count(*) from information_schema.tables where table_schema = ")
        .bind(Value::from(database))
        .push(" and table_name = ")
        .bind(Value::from(name.trim()));
    w.finish()
}
