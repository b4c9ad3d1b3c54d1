//! Table metadata discovery.
//!
//! Metadata is fetched lazily, once per (database, table), and then shared by
//! every handle of the owning client. Discovery first runs one bulk
//! `information_schema.columns` query for the whole schema and falls back to
//! `show full columns` for the requested table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::driver::{Driver, DriverError, Row};
use crate::error::{Error, Result};
use crate::types;

const BULK_COLUMNS_SQL: &str = "select TABLE_NAME as table_name, COLUMN_NAME as column_name, \
     COLUMN_TYPE as column_type, COLLATION_NAME as collation_name, \
     IS_NULLABLE as is_nullable, COLUMN_KEY as column_key, \
     COLUMN_DEFAULT as column_default, EXTRA as extra, PRIVILEGES as privileges \
     from information_schema.columns where table_schema = ? \
     order by table_name, ordinal_position";

/// Markers in a column's `extra` attribute for server-maintained values.
const GENERATED_MARKERS: &[&str] = &[
    "auto_increment",
    "default_generated",
    "generated",
    "on update current_timestamp",
];

/// One column as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type, e.g. `varchar(255)`.
    pub declared_type: String,
    /// Collation, for text columns.
    pub collation: Option<String>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Key role: `PRI`, `UNI`, `MUL` or empty.
    pub key_role: String,
    /// Default expression.
    pub default_expression: Option<String>,
    /// Extra attributes such as `auto_increment`.
    pub extra: String,
    /// Privileges of the current user on the column.
    pub privileges: String,
}

impl ColumnInfo {
    /// Returns true when the server maintains the value itself.
    #[must_use]
    pub fn is_server_maintained(&self) -> bool {
        let extra = self.extra.to_ascii_lowercase();
        if GENERATED_MARKERS.iter().any(|m| extra.contains(m)) {
            return true;
        }
        self.default_expression
            .as_deref()
            .is_some_and(|d| d.to_ascii_lowercase().contains("current_timestamp"))
    }

    /// Returns true for the primary key column.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.key_role.to_ascii_uppercase().contains("PRI")
    }

    fn from_bulk_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.get_text("column_name")?,
            declared_type: row.get_text("column_type").unwrap_or_default(),
            collation: row.get_text("collation_name"),
            nullable: is_yes(row.get_text("is_nullable")),
            key_role: row.get_text("column_key").unwrap_or_default(),
            default_expression: row.get_text("column_default"),
            extra: row.get_text("extra").unwrap_or_default(),
            privileges: row.get_text("privileges").unwrap_or_default(),
        })
    }

    fn from_describe_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.get_text("Field")?,
            declared_type: row.get_text("Type").unwrap_or_default(),
            collation: row.get_text("Collation"),
            nullable: is_yes(row.get_text("Null")),
            key_role: row.get_text("Key").unwrap_or_default(),
            default_expression: row.get_text("Default"),
            extra: row.get_text("Extra").unwrap_or_default(),
            privileges: row.get_text("Privileges").unwrap_or_default(),
        })
    }
}

fn is_yes(flag: Option<String>) -> bool {
    flag.is_some_and(|f| f.eq_ignore_ascii_case("yes"))
}

/// Metadata of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    /// Database name.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnInfo>,
    /// Primary key column.
    pub primary_key: String,
    /// Columns eligible for insert and update, in ordinal order.
    pub updatable_columns: Vec<String>,
    /// Normalized declared type per column.
    pub column_types: HashMap<String, String>,
}

impl TableMetadata {
    /// Builds metadata from the column list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPrimaryKey`] unless exactly one column is
    /// marked primary.
    pub fn from_columns(
        database: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnInfo>,
    ) -> Result<Self> {
        let table = table.into();
        let primaries: Vec<&ColumnInfo> = columns.iter().filter(|c| c.is_primary()).collect();
        let primary_key = match primaries.as_slice() {
            [pk] => pk.name.clone(),
            other => {
                return Err(Error::UnsupportedPrimaryKey {
                    table,
                    found: other.len(),
                })
            }
        };

        let updatable_columns = columns
            .iter()
            .filter(|c| !c.is_server_maintained())
            .map(|c| c.name.clone())
            .collect();
        let column_types = columns
            .iter()
            .map(|c| (c.name.clone(), types::normalize_type(&c.declared_type)))
            .collect();

        Ok(Self {
            database: database.into(),
            table,
            columns,
            primary_key,
            updatable_columns,
            column_types,
        })
    }

    /// Normalized declared type of `column`.
    #[must_use]
    pub fn column_type(&self, column: &str) -> Option<&str> {
        self.column_types.get(column).map(String::as_str)
    }

    /// Returns whether the table has `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_types.contains_key(column)
    }

    /// Column names in ordinal order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns whether `column` may be written.
    #[must_use]
    pub fn is_updatable(&self, column: &str) -> bool {
        self.updatable_columns.iter().any(|c| c == column)
    }
}

type TableKey = (String, String);

/// Per-client store of discovered table metadata.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableKey, Arc<TableMetadata>>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata of a known table.
    #[must_use]
    pub fn get(&self, database: &str, table: &str) -> Option<Arc<TableMetadata>> {
        self.tables
            .read()
            .get(&(database.to_string(), table.to_string()))
            .cloned()
    }

    /// Returns whether the table's metadata has been discovered.
    #[must_use]
    pub fn is_known(&self, database: &str, table: &str) -> bool {
        self.tables
            .read()
            .contains_key(&(database.to_string(), table.to_string()))
    }

    /// Number of known tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns true when no table is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Returns the table's metadata, discovering it on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionAbsent`] without a driver.
    /// - [`Error::SchemaUnknown`] when the table does not exist.
    /// - [`Error::UnsupportedPrimaryKey`] for tables without exactly one
    ///   primary key column.
    /// - [`Error::Execution`] when the describe query fails otherwise.
    pub fn ensure(
        &self,
        driver: Option<&dyn Driver>,
        database: &str,
        table: &str,
    ) -> Result<Arc<TableMetadata>> {
        if let Some(meta) = self.get(database, table) {
            return Ok(meta);
        }
        let Some(driver) = driver else {
            warn!(database = %database, table = %table, "No connection, cannot load table metadata");
            return Err(Error::ConnectionAbsent {
                database: database.to_string(),
            });
        };

        match self.load_schema(driver, database, table) {
            Some(Err(e)) => return Err(e),
            Some(Ok(meta)) => return Ok(meta),
            None => {}
        }

        self.describe_table(driver, database, table)
    }

    /// Runs the bulk introspection query and stores every table not yet
    /// known. Returns the outcome for `wanted` if the query covered it.
    fn load_schema(
        &self,
        driver: &dyn Driver,
        database: &str,
        wanted: &str,
    ) -> Option<Result<Arc<TableMetadata>>> {
        debug!(database = %database, "Loading column metadata from information_schema");
        let rows = match driver.query(BULK_COLUMNS_SQL, &[database.into()]) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    database = %database,
                    error = %e,
                    "Bulk metadata query failed, falling back to show columns"
                );
                return None;
            }
        };

        let mut grouped: Vec<(String, Vec<ColumnInfo>)> = Vec::new();
        for row in &rows {
            let Some(table) = row.get_text("table_name") else {
                continue;
            };
            let Some(column) = ColumnInfo::from_bulk_row(row) else {
                continue;
            };
            match grouped.last_mut() {
                Some((name, columns)) if *name == table => columns.push(column),
                _ => grouped.push((table, vec![column])),
            }
        }

        let mut outcome = None;
        for (table, columns) in grouped {
            if self.is_known(database, &table) {
                if table == wanted {
                    outcome = self.get(database, &table).map(Ok);
                }
                continue;
            }
            match TableMetadata::from_columns(database, &table, columns) {
                Ok(meta) => {
                    let meta = self.store(meta);
                    debug!(
                        database = %database,
                        table = %table,
                        primary_key = %meta.primary_key,
                        columns = meta.columns.len(),
                        "Stored table metadata"
                    );
                    if table == wanted {
                        outcome = Some(Ok(meta));
                    }
                }
                Err(e) => {
                    warn!(database = %database, table = %table, error = %e, "Skipping table");
                    if table == wanted {
                        outcome = Some(Err(e));
                    }
                }
            }
        }
        outcome
    }

    fn describe_table(
        &self,
        driver: &dyn Driver,
        database: &str,
        table: &str,
    ) -> Result<Arc<TableMetadata>> {
        let sql = format!("show full columns from {database}.{table}");
        debug!(sql = %sql, "Describing table");
        let rows = match driver.query(&sql, &[]) {
            Ok(rows) => rows,
            Err(DriverError::NoSuchTable(message)) => {
                error!(database = %database, table = %table, message = %message, "Table does not exist");
                return Err(schema_unknown(database, table));
            }
            Err(source) => {
                error!(sql = %sql, error = %source, "Failed to describe table");
                return Err(Error::Execution { sql, source });
            }
        };

        let columns: Vec<ColumnInfo> = rows.iter().filter_map(ColumnInfo::from_describe_row).collect();
        if columns.is_empty() {
            error!(database = %database, table = %table, "Table has no columns");
            return Err(schema_unknown(database, table));
        }

        let meta = TableMetadata::from_columns(database, table, columns).inspect_err(|e| {
            error!(database = %database, table = %table, error = %e, "Unsupported table");
        })?;
        let meta = self.store(meta);
        debug!(
            database = %database,
            table = %table,
            primary_key = %meta.primary_key,
            "Stored table metadata from show columns"
        );
        Ok(meta)
    }

    /// Inserts unless another thread got there first; the first entry wins.
    fn store(&self, meta: TableMetadata) -> Arc<TableMetadata> {
        let key = (meta.database.clone(), meta.table.clone());
        Arc::clone(
            self.tables
                .write()
                .entry(key)
                .or_insert_with(|| Arc::new(meta)),
        )
    }
}

fn schema_unknown(database: &str, table: &str) -> Error {
    Error::SchemaUnknown {
        database: database.to_string(),
        table: table.to_string(),
    }
}
