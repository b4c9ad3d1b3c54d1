//! Client and table handles.
//!
//! A [`Client`] owns the driver, the metadata catalog, the correlation memo,
//! the result cache and the worker pool. It is cheap to clone; clones and
//! the [`Table`] handles derived from them share all of that state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, trace, warn};

use crate::cache::{CachedValue, ResultCache};
use crate::catalog::{Catalog, TableMetadata};
use crate::codec::RowDecoder;
use crate::config::{ClientOptions, ConnectionConfig};
use crate::correlate::{CorrelationMap, Correlator};
use crate::driver::{Driver, ExecResult, Row};
use crate::error::{Error, Result};
use crate::query::{self, Aggregate, Join, JoinedTables, Statement};
use crate::record::Record;
use crate::value::Value;
use crate::worker::{Completion, TaskHandle, WorkerPool};

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Rows were removed.
    Deleted(u64),
    /// The filter matched nothing.
    NoEffect,
}

impl DeleteOutcome {
    /// Number of removed rows.
    #[must_use]
    pub const fn rows(self) -> u64 {
        match self {
            Self::Deleted(n) => n,
            Self::NoEffect => 0,
        }
    }
}

struct Inner {
    config: ConnectionConfig,
    driver: Option<Arc<dyn Driver>>,
    catalog: Catalog,
    correlator: Correlator,
    cache: ResultCache,
    pool: WorkerPool,
}

/// Entry point: one database, one driver.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .field("known_tables", &self.inner.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client with the default worker pool.
    #[must_use]
    pub fn new(config: ConnectionConfig, driver: Arc<dyn Driver>) -> Self {
        Self::with_options(config, Some(driver), ClientOptions::default())
    }

    /// Creates a client with an explicit pool size. Without a driver every
    /// database operation fails with [`Error::ConnectionAbsent`].
    #[must_use]
    pub fn with_options(
        config: ConnectionConfig,
        driver: Option<Arc<dyn Driver>>,
        options: ClientOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                driver,
                catalog: Catalog::new(),
                correlator: Correlator::new(),
                cache: ResultCache::new(),
                pool: WorkerPool::new(options),
            }),
        }
    }

    /// A client without a connection.
    #[must_use]
    pub fn offline(config: ConnectionConfig) -> Self {
        Self::with_options(config, None, ClientOptions::default())
    }

    /// Connection parameters.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Database every table of this client lives in.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.inner.config.database
    }

    /// Returns whether a driver is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.driver.is_some()
    }

    /// Discovered table metadata.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Memoized correlations.
    #[must_use]
    pub fn correlator(&self) -> &Correlator {
        &self.inner.correlator
    }

    /// Result cache.
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// Returns a handle on `name`.
    #[must_use]
    pub fn table(&self, name: impl Into<String>) -> Table {
        Table {
            client: self.clone(),
            name: name.into(),
        }
    }

    fn driver(&self) -> Result<&dyn Driver> {
        self.inner.driver.as_deref().ok_or_else(|| {
            warn!(database = %self.database(), "No connection");
            Error::ConnectionAbsent {
                database: self.database().to_string(),
            }
        })
    }

    fn ensure(&self, table: &str) -> Result<Arc<TableMetadata>> {
        self.inner
            .catalog
            .ensure(self.inner.driver.as_deref(), self.database(), table)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<Row>> {
        let driver = self.driver()?;
        info!(sql = %stmt.inline, "Executing query");
        let rows = driver.query(&stmt.sql, &stmt.params).map_err(|source| {
            error!(sql = %stmt.inline, error = %source, "Query failed");
            Error::Execution {
                sql: stmt.inline.clone(),
                source,
            }
        })?;
        trace!(sql = %stmt.inline, rows = rows.len(), "Query returned");
        Ok(rows)
    }

    fn execute(&self, stmt: &Statement) -> Result<ExecResult> {
        let driver = self.driver()?;
        info!(sql = %stmt.inline, "Executing statement");
        driver.execute(&stmt.sql, &stmt.params).map_err(|source| {
            error!(sql = %stmt.inline, error = %source, "Statement failed");
            Error::Execution {
                sql: stmt.inline.clone(),
                source,
            }
        })
    }

    /// Returns whether `name` exists in the client's database.
    ///
    /// # Errors
    ///
    /// Fails without a connection or when the lookup query fails.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let rows = self.query(&query::table_exists(self.database(), name))?;
        let count = rows
            .first()
            .and_then(|row| row.get_index(0))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count > 0)
    }

    /// Creates a table from alternating column names and definitions.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTableDefinition`] for bad arguments.
    /// - [`Error::TableExists`] when the table is already there.
    /// - [`Error::TableMissing`] when the table is absent afterwards.
    pub fn create_table(&self, name: &str, definitions: &[&str]) -> Result<()> {
        let stmt = query::create_table(name, definitions)?;
        self.driver()?;
        if self.table_exists(name)? {
            warn!(table = %name, "Table already exists");
            return Err(Error::TableExists(name.to_string()));
        }
        self.execute(&stmt)?;
        if !self.table_exists(name)? {
            error!(table = %name, "Table missing after create");
            return Err(Error::TableMissing(name.to_string()));
        }
        info!(table = %name, "Created table");
        Ok(())
    }

    /// Drops a table and clears its cached results. Known metadata is kept.
    ///
    /// # Errors
    ///
    /// - [`Error::TableNotSelected`] for an empty name.
    /// - [`Error::TableMissing`] when the table does not exist.
    /// - [`Error::TableExists`] when the table is still there afterwards.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            warn!("Drop requested without a table name");
            return Err(Error::TableNotSelected);
        }
        self.driver()?;
        if !self.table_exists(name)? {
            warn!(table = %name, "Table does not exist");
            return Err(Error::TableMissing(name.to_string()));
        }
        self.execute(&query::drop_table(name))?;
        if self.table_exists(name)? {
            error!(table = %name, "Table still present after drop");
            return Err(Error::TableExists(name.to_string()));
        }
        self.inner.cache.invalidate_table(self.database(), name);
        info!(table = %name, "Dropped table");
        Ok(())
    }

    /// Queues [`Client::create_table`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn create_table_async<C>(&self, name: impl Into<String>, definitions: Vec<String>, completion: C) -> Result<TaskHandle>
    where
        C: Completion<()>,
    {
        let client = self.clone();
        let name = name.into();
        self.inner.pool.submit(
            move || {
                let definitions: Vec<&str> = definitions.iter().map(String::as_str).collect();
                client.create_table(&name, &definitions)
            },
            completion,
        )
    }

    /// Queues [`Client::drop_table`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn drop_table_async<C>(&self, name: impl Into<String>, completion: C) -> Result<TaskHandle>
    where
        C: Completion<()>,
    {
        let client = self.clone();
        let name = name.into();
        self.inner
            .pool
            .submit(move || client.drop_table(&name), completion)
    }
}

/// Handle on one table of a [`Client`].
#[derive(Debug, Clone)]
pub struct Table {
    client: Client,
    name: String,
}

impl Table {
    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn database(&self) -> &str {
        self.client.database()
    }

    fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            warn!("Operation issued without a table name");
            return Err(Error::TableNotSelected);
        }
        self.client.driver().map(|_| ())
    }

    /// Returns the table's metadata, discovering it on first use.
    ///
    /// # Errors
    ///
    /// Fails when the table is not selected, there is no connection, or
    /// discovery fails.
    pub fn metadata(&self) -> Result<Arc<TableMetadata>> {
        self.check()?;
        self.client.ensure(&self.name)
    }

    fn correlate<R: Record>(&self, meta: &TableMetadata, columns: &[String]) -> Arc<CorrelationMap> {
        self.client
            .inner
            .correlator
            .resolve::<R, _>(columns, &self.name, |c| meta.column_type(c).map(str::to_string))
    }

    /// Rows for `stmt`, from the cache when possible.
    fn cached_rows(&self, stmt: &Statement, depends_on: &[String]) -> Result<Arc<Vec<Row>>> {
        let cache = &self.client.inner.cache;
        if let Some(CachedValue::Rows(rows)) = cache.get(self.database(), &self.name, &stmt.inline) {
            return Ok(rows);
        }
        let rows = Arc::new(self.client.query(stmt)?);
        cache.put(
            self.database(),
            &self.name,
            &stmt.inline,
            CachedValue::Rows(Arc::clone(&rows)),
            depends_on.iter().cloned(),
        );
        Ok(rows)
    }

    fn invalidate(&self) {
        self.client
            .inner
            .cache
            .invalidate_table(self.database(), &self.name);
    }

    /// Reads records, optionally restricted by a raw `where` fragment.
    ///
    /// # Errors
    ///
    /// Fails on a missing table name, connection or metadata, and on driver
    /// errors.
    pub fn get<R: Record>(&self, filter: Option<&str>) -> Result<Vec<R>> {
        let meta = self.metadata()?;
        let map = self.correlate::<R>(&meta, &meta.column_names());
        let stmt = query::select(&meta, &map, filter);
        let rows = self.cached_rows(&stmt, &[])?;
        let records = RowDecoder::<R>::new(&self.name, &map).decode_all(&rows);
        trace!(table = %self.name, records = records.len(), "Decoded records");
        Ok(records)
    }

    /// Reads records from this table left-joined with others.
    ///
    /// The join list is checked before anything else; metadata of every
    /// joined table must be available.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidJoin`] for a bad join list, otherwise as
    /// [`Table::get`].
    pub fn get_joined<R: Record>(&self, joins: &[Join], filter: Option<&str>) -> Result<Vec<R>> {
        if self.name.trim().is_empty() {
            warn!("Operation issued without a table name");
            return Err(Error::TableNotSelected);
        }
        query::validate_joins(&self.name, joins).map_err(|e| {
            error!(table = %self.name, error = %e, "Invalid join");
            Error::from(e)
        })?;

        let meta = self.metadata()?;
        let joined = joins
            .iter()
            .map(|join| self.client.ensure(&join.table))
            .collect::<Result<Vec<_>>>()?;
        let tables = JoinedTables::new(
            &meta,
            joins.iter().zip(joined.iter().map(|m| &**m)).collect(),
        );

        let columns = tables.candidate_columns();
        let map = self
            .client
            .inner
            .correlator
            .resolve::<R, _>(&columns, &self.name, |c| tables.column_type(c));
        let stmt = query::select_joined(&tables, &map, filter);
        let depends_on: Vec<String> = joins.iter().map(|j| j.table.clone()).collect();
        let rows = self.cached_rows(&stmt, &depends_on)?;
        Ok(RowDecoder::<R>::new(&self.name, &map).decode_all(&rows))
    }

    /// Runs an aggregate and returns its scalar result.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownColumn`] for a column the table lacks, otherwise as
    /// [`Table::get`].
    pub fn aggregate(&self, aggregate: &Aggregate, filter: Option<&str>) -> Result<Value> {
        let meta = self.metadata()?;
        let stmt = query::aggregate(&meta, aggregate, filter)?;
        let cache = &self.client.inner.cache;
        if let Some(CachedValue::Scalar(value)) = cache.get(self.database(), &self.name, &stmt.inline) {
            return Ok(value);
        }
        let rows = self.client.query(&stmt)?;
        let value = rows
            .first()
            .and_then(|row| row.get_index(0))
            .cloned()
            .unwrap_or(Value::Null);
        cache.put(
            self.database(),
            &self.name,
            &stmt.inline,
            CachedValue::Scalar(value.clone()),
            Vec::<String>::new(),
        );
        Ok(value)
    }

    /// Counts rows by primary key.
    ///
    /// # Errors
    ///
    /// As [`Table::aggregate`].
    pub fn count(&self, filter: Option<&str>) -> Result<i64> {
        Ok(self.aggregate(&Aggregate::count(), filter)?.as_i64().unwrap_or(0))
    }

    /// SUM of a column.
    ///
    /// # Errors
    ///
    /// As [`Table::aggregate`].
    pub fn sum(&self, column: &str, filter: Option<&str>) -> Result<Value> {
        self.aggregate(&Aggregate::sum(column), filter)
    }

    /// AVG of a column.
    ///
    /// # Errors
    ///
    /// As [`Table::aggregate`].
    pub fn avg(&self, column: &str, filter: Option<&str>) -> Result<Value> {
        self.aggregate(&Aggregate::avg(column), filter)
    }

    /// MIN of a column.
    ///
    /// # Errors
    ///
    /// As [`Table::aggregate`].
    pub fn min(&self, column: &str, filter: Option<&str>) -> Result<Value> {
        self.aggregate(&Aggregate::min(column), filter)
    }

    /// MAX of a column.
    ///
    /// # Errors
    ///
    /// As [`Table::aggregate`].
    pub fn max(&self, column: &str, filter: Option<&str>) -> Result<Value> {
        self.aggregate(&Aggregate::max(column), filter)
    }

    /// Inserts a record and returns the generated key, if the server
    /// reported one.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroRowsAffected`] when nothing was inserted, otherwise as
    /// [`Table::get`].
    pub fn add<R: Record>(&self, record: &R) -> Result<Option<u64>> {
        let meta = self.metadata()?;
        let map = self.correlate::<R>(&meta, &meta.updatable_columns);
        let stmt = query::insert(&meta, &map, record);
        let result = self.client.execute(&stmt)?;
        if result.rows_affected == 0 {
            warn!(table = %self.name, sql = %stmt.inline, "Insert affected no rows");
            return Err(Error::ZeroRowsAffected {
                table: self.name.clone(),
                operation: "insert",
            });
        }
        self.invalidate();
        info!(table = %self.name, id = ?result.last_insert_id, "Inserted row");
        Ok(result.last_insert_id)
    }

    /// Updates the row whose primary key matches the record's.
    ///
    /// # Errors
    ///
    /// [`Error::CorrelationEmpty`] when no field maps to the primary key,
    /// [`Error::ZeroRowsAffected`] when no row matched, otherwise as
    /// [`Table::get`].
    pub fn update<R: Record>(&self, record: &R) -> Result<u64> {
        let meta = self.metadata()?;
        let mut columns = meta.updatable_columns.clone();
        if !columns.contains(&meta.primary_key) {
            columns.push(meta.primary_key.clone());
        }
        let map = self.correlate::<R>(&meta, &columns);
        let stmt = query::update(&meta, &map, record)?;
        let result = self.client.execute(&stmt)?;
        if result.rows_affected == 0 {
            warn!(table = %self.name, sql = %stmt.inline, "Update affected no rows");
            return Err(Error::ZeroRowsAffected {
                table: self.name.clone(),
                operation: "update",
            });
        }
        self.invalidate();
        Ok(result.rows_affected)
    }

    /// Deletes the rows matching a raw `where` fragment.
    ///
    /// A filter matching nothing is [`DeleteOutcome::NoEffect`] and leaves
    /// cached results alone.
    ///
    /// # Errors
    ///
    /// As [`Table::get`].
    pub fn delete(&self, filter: &str) -> Result<DeleteOutcome> {
        let meta = self.metadata()?;
        let stmt = query::delete(&meta, filter);
        let result = self.client.execute(&stmt)?;
        if result.rows_affected == 0 {
            info!(table = %self.name, sql = %stmt.inline, "Delete had no effect");
            return Ok(DeleteOutcome::NoEffect);
        }
        self.invalidate();
        info!(table = %self.name, rows = result.rows_affected, "Deleted rows");
        Ok(DeleteOutcome::Deleted(result.rows_affected))
    }

    /// Caches reads of this table for `ttl`.
    pub fn enable_cache(&self, ttl: Duration) {
        self.client.inner.cache.enable(self.database(), &self.name, ttl);
    }

    /// Stops caching reads of this table and drops its entries.
    pub fn disable_cache(&self) {
        self.client.inner.cache.disable(self.database(), &self.name);
    }

    /// Drops the cached reads of this table.
    pub fn clear_cache(&self) {
        self.client.inner.cache.clear(self.database(), &self.name);
    }

    fn submit<T, W, C>(&self, work: W, completion: C) -> Result<TaskHandle>
    where
        T: Send + 'static,
        W: FnOnce(Table) -> Result<T> + Send + 'static,
        C: Completion<T>,
    {
        let table = self.clone();
        self.client.inner.pool.submit(move || work(table), completion)
    }

    /// Queues [`Table::get`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn get_async<R, C>(&self, filter: Option<String>, completion: C) -> Result<TaskHandle>
    where
        R: Record,
        C: Completion<Vec<R>>,
    {
        self.submit(move |t| t.get::<R>(filter.as_deref()), completion)
    }

    /// Queues [`Table::get_joined`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn get_joined_async<R, C>(&self, joins: Vec<Join>, filter: Option<String>, completion: C) -> Result<TaskHandle>
    where
        R: Record,
        C: Completion<Vec<R>>,
    {
        self.submit(
            move |t| t.get_joined::<R>(&joins, filter.as_deref()),
            completion,
        )
    }

    /// Queues [`Table::aggregate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn aggregate_async<C>(&self, aggregate: Aggregate, filter: Option<String>, completion: C) -> Result<TaskHandle>
    where
        C: Completion<Value>,
    {
        self.submit(
            move |t| t.aggregate(&aggregate, filter.as_deref()),
            completion,
        )
    }

    /// Queues [`Table::count`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn count_async<C>(&self, filter: Option<String>, completion: C) -> Result<TaskHandle>
    where
        C: Completion<i64>,
    {
        self.submit(move |t| t.count(filter.as_deref()), completion)
    }

    /// Queues [`Table::add`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn add_async<R, C>(&self, record: R, completion: C) -> Result<TaskHandle>
    where
        R: Record,
        C: Completion<Option<u64>>,
    {
        self.submit(move |t| t.add(&record), completion)
    }

    /// Queues [`Table::update`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn update_async<R, C>(&self, record: R, completion: C) -> Result<TaskHandle>
    where
        R: Record,
        C: Completion<u64>,
    {
        self.submit(move |t| t.update(&record), completion)
    }

    /// Queues [`Table::delete`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the worker queue is full; the
    /// completion receives the same error.
    pub fn delete_async<C>(&self, filter: String, completion: C) -> Result<TaskHandle>
    where
        C: Completion<DeleteOutcome>,
    {
        self.submit(move |t| t.delete(&filter), completion)
    }
}
