//! Plain and joined selects.

use std::collections::HashSet;

use crate::catalog::TableMetadata;
use crate::correlate::CorrelationMap;
use crate::error::JoinError;

use super::statement::{Statement, StatementWriter};

/// One `left join` of a joined select.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    /// Column of the primary table holding the joined row's key.
    pub id_column: String,
    /// Joined table.
    pub table: String,
}

impl Join {
    /// Creates a join on `id_column` against `table`'s primary key.
    #[must_use]
    pub fn new(id_column: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            table: table.into(),
        }
    }
}

/// Checks a join list before any metadata is loaded or SQL is built.
///
/// # Errors
///
/// Refuses an empty list, the primary table as a target and duplicate
/// targets.
pub fn validate_joins(primary: &str, joins: &[Join]) -> Result<(), JoinError> {
    if joins.is_empty() {
        return Err(JoinError::Empty);
    }
    let mut seen = HashSet::new();
    for join in joins {
        if join.table == primary {
            return Err(JoinError::SelfJoin(join.table.clone()));
        }
        if !seen.insert(join.table.as_str()) {
            return Err(JoinError::DuplicateTarget(join.table.clone()));
        }
    }
    Ok(())
}

fn push_filter(w: &mut StatementWriter, filter: Option<&str>) {
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        w.push(" where ").push(filter);
    }
}

/// `select <mapped columns | *> from <table> [where <filter>]`.
#[must_use]
pub fn select(meta: &TableMetadata, map: &CorrelationMap, filter: Option<&str>) -> Statement {
    let mut w = StatementWriter::new();
    w.push("select ");
    if map.is_empty() {
        w.push("*");
    } else {
        w.push_list(map.columns(), |w, column| {
            w.push(column);
        });
    }
    w.push(" from ").push(&meta.table);
    push_filter(&mut w, filter);
    w.finish()
}

/// The primary table of a joined select and the tables joined to it.
#[derive(Debug)]
pub struct JoinedTables<'a> {
    primary: &'a TableMetadata,
    joins: Vec<(&'a Join, &'a TableMetadata)>,
}

impl<'a> JoinedTables<'a> {
    /// Pairs each join with its target's metadata.
    #[must_use]
    pub const fn new(primary: &'a TableMetadata, joins: Vec<(&'a Join, &'a TableMetadata)>) -> Self {
        Self { primary, joins }
    }

    fn tables(&self) -> impl Iterator<Item = &'a TableMetadata> + '_ {
        std::iter::once(self.primary).chain(self.joins.iter().map(|(_, meta)| *meta))
    }

    /// Table owning `column`, checking the primary table first.
    #[must_use]
    pub fn owner(&self, column: &str) -> Option<&'a TableMetadata> {
        self.tables().find(|meta| meta.has_column(column))
    }

    /// Normalized type of `column` in its owning table.
    #[must_use]
    pub fn column_type(&self, column: &str) -> Option<String> {
        self.owner(column)
            .and_then(|meta| meta.column_type(column))
            .map(str::to_string)
    }

    /// Distinct column names over all tables, primary table first.
    #[must_use]
    pub fn candidate_columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for meta in self.tables() {
            for column in &meta.columns {
                if seen.insert(column.name.as_str()) {
                    columns.push(column.name.clone());
                }
            }
        }
        columns
    }

    /// Names of every table taking part, primary first.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|meta| meta.table.clone()).collect()
    }
}

/// `select <qualified columns> from <t> left join <j> on <t>.<id> = <j>.<pk> ...`.
#[must_use]
pub fn select_joined(tables: &JoinedTables<'_>, map: &CorrelationMap, filter: Option<&str>) -> Statement {
    let primary = &tables.primary.table;
    let mut w = StatementWriter::new();
    w.push("select ");
    if map.is_empty() {
        w.push("*");
    } else {
        w.push_list(map.columns(), |w, column| {
            let owner = tables.owner(column).map_or(primary.as_str(), |m| m.table.as_str());
            w.push(owner).push(".").push(column);
        });
    }
    w.push(" from ").push(primary);
    for (join, meta) in &tables.joins {
        w.push(" left join ")
            .push(&meta.table)
            .push(" on ")
            .push(primary)
            .push(".")
            .push(&join.id_column)
            .push(" = ")
            .push(&meta.table)
            .push(".")
            .push(&meta.primary_key);
    }
    push_filter(&mut w, filter);
    w.finish()
}
