//! Scalar aggregates.

use std::fmt;

use tracing::error;

use crate::catalog::TableMetadata;
use crate::error::{Error, Result};

use super::statement::{Statement, StatementWriter};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    /// COUNT
    Count,
    /// SUM
    Sum,
    /// AVG
    Avg,
    /// MIN
    Min,
    /// MAX
    Max,
}

impl AggregateOp {
    /// SQL function name.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for AggregateOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown aggregate: {other}")),
        }
    }
}

/// An aggregate over one column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Function applied.
    pub op: AggregateOp,
    /// Column, or `None` for the primary key.
    pub column: Option<String>,
}

impl Aggregate {
    /// Creates an aggregate.
    #[must_use]
    pub const fn new(op: AggregateOp, column: Option<String>) -> Self {
        Self { op, column }
    }

    /// COUNT over the primary key.
    #[must_use]
    pub const fn count() -> Self {
        Self::new(AggregateOp::Count, None)
    }

    /// SUM(column).
    #[must_use]
    pub fn sum(column: &str) -> Self {
        Self::new(AggregateOp::Sum, Some(column.to_string()))
    }

    /// AVG(column).
    #[must_use]
    pub fn avg(column: &str) -> Self {
        Self::new(AggregateOp::Avg, Some(column.to_string()))
    }

    /// MIN(column).
    #[must_use]
    pub fn min(column: &str) -> Self {
        Self::new(AggregateOp::Min, Some(column.to_string()))
    }

    /// MAX(column).
    #[must_use]
    pub fn max(column: &str) -> Self {
        Self::new(AggregateOp::Max, Some(column.to_string()))
    }

    /// Resolves the target column against the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] when the table lacks the column.
    pub fn resolve_column<'m>(&'m self, meta: &'m TableMetadata) -> Result<&'m str> {
        let column = self.column.as_deref().unwrap_or(&meta.primary_key);
        if meta.has_column(column) {
            Ok(column)
        } else {
            error!(table = %meta.table, column = %column, op = %self.op, "Unknown aggregate column");
            Err(Error::UnknownColumn {
                table: meta.table.clone(),
                column: column.to_string(),
            })
        }
    }
}

/// `select <op>(<column>) from <t> [where <filter>]`.
///
/// # Errors
///
/// Returns [`Error::UnknownColumn`] for a column the table does not have.
pub fn aggregate(meta: &TableMetadata, aggregate: &Aggregate, filter: Option<&str>) -> Result<Statement> {
    let column = aggregate.resolve_column(meta)?;
    let mut w = StatementWriter::new();
    w.push("select ")
        .push(aggregate.op.as_sql())
        .push("(")
        .push(column)
        .push(") from ")
        .push(&meta.table);
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        w.push(" where ").push(filter);
    }
    Ok(w.finish())
}
