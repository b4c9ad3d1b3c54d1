//! Error types for the engine.

use thiserror::Error;

use crate::driver::DriverError;

/// Reasons a joined select is refused before any SQL is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// No join was supplied.
    #[error("at least one join is required")]
    Empty,

    /// The primary table was listed as a join target.
    #[error("cannot join table {0} with itself")]
    SelfJoin(String),

    /// A join target appears more than once.
    #[error("table {0} is joined more than once")]
    DuplicateTarget(String),
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The client has no database connection.
    #[error("no connection to database {database}")]
    ConnectionAbsent {
        /// Database the client was configured for.
        database: String,
    },

    /// The operation was issued without a table name.
    #[error("no table selected")]
    TableNotSelected,

    /// Metadata discovery failed or the table does not exist.
    #[error("unknown schema for {database}.{table}")]
    SchemaUnknown {
        /// Database name.
        database: String,
        /// Table name.
        table: String,
    },

    /// The table does not have exactly one primary key column.
    #[error("table {table} has {found} primary key columns, exactly one is supported")]
    UnsupportedPrimaryKey {
        /// Table name.
        table: String,
        /// Number of primary key columns found.
        found: usize,
    },

    /// Invalid join configuration.
    #[error("invalid join: {0}")]
    InvalidJoin(#[from] JoinError),

    /// A required column has no correlated field.
    #[error("no field of the record matches column {column} of table {table}")]
    CorrelationEmpty {
        /// Table name.
        table: String,
        /// Column that could not be mapped.
        column: String,
    },

    /// A column named by the caller is not part of the table.
    #[error("table {table} has no column {column}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Requested column.
        column: String,
    },

    /// Bad arguments to `create_table`.
    #[error("invalid table definition: {0}")]
    InvalidTableDefinition(String),

    /// `create_table` target already exists.
    #[error("table {0} already exists")]
    TableExists(String),

    /// `drop_table` target does not exist, or DDL did not take effect.
    #[error("table {0} does not exist")]
    TableMissing(String),

    /// The driver rejected a statement.
    #[error("failed to execute `{sql}`: {source}")]
    Execution {
        /// Statement text, with values rendered inline.
        sql: String,
        /// Driver failure.
        #[source]
        source: DriverError,
    },

    /// A write matched no rows.
    #[error("{operation} on {table} affected no rows")]
    ZeroRowsAffected {
        /// Table name.
        table: String,
        /// `insert` or `update`.
        operation: &'static str,
    },

    /// The async worker queue is full.
    #[error("worker queue is full")]
    QueueFull,

    /// The worker pool has shut down.
    #[error("worker pool is closed")]
    PoolClosed,

    /// The async job panicked.
    #[error("async job panicked")]
    Panicked,

    /// The async job was cancelled before it ran.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
