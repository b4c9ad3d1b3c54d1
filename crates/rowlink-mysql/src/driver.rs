//! `sqlx`-backed implementation of [`rowlink::Driver`].

use std::time::Duration;

use rowlink::{ConnectionConfig, Driver, DriverError, ExecResult, Row, Value};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlDatabaseError, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::{Executor, MySql, MySqlPool};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::convert;
use crate::error::Result;

const MAX_CONNECTIONS: u32 = 8;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// MySQL error number for a missing table.
const ER_NO_SUCH_TABLE: u16 = 1146;
/// SQLSTATE for a missing table.
const SQLSTATE_NO_SUCH_TABLE: &str = "42S02";

/// A MySQL connection pool with its own runtime.
#[derive(Debug)]
pub struct MySqlDriver {
    runtime: Runtime,
    pool: MySqlPool,
}

impl MySqlDriver {
    /// Starts the runtime and opens the pool.
    ///
    /// # Errors
    ///
    /// Fails when the runtime cannot start or the first connection fails.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("rowlink-mysql")
            .enable_all()
            .build()?;

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        debug!(host = %config.host, port = config.port, database = %config.database, "Connecting");
        let pool = runtime.block_on(
            MySqlPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect_with(options),
        )?;
        info!(host = %config.host, database = %config.database, "Connected");

        Ok(Self { runtime, pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(n) => query.bind(*n),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Date(d) => query.bind(*d),
            Value::DateTime(dt) => query.bind(*dt),
            Value::Time(t) => query.bind(*t),
            Value::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

/// Returns whether a server error reports a missing table.
#[must_use]
pub fn is_no_such_table(number: Option<u16>, sqlstate: Option<&str>) -> bool {
    number == Some(ER_NO_SUCH_TABLE) || sqlstate == Some(SQLSTATE_NO_SUCH_TABLE)
}

#[must_use]
pub fn classify(error: sqlx::Error) -> DriverError {
    match error {
        sqlx::Error::Database(db) => {
            let number = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number);
            if is_no_such_table(number, db.code().as_deref()) {
                DriverError::NoSuchTable(db.message().to_string())
            } else {
                DriverError::Query(db.to_string())
            }
        }
        e @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed) => DriverError::Connection(e.to_string()),
        e => DriverError::Query(e.to_string()),
    }
}

impl Driver for MySqlDriver {
    fn query(&self, sql: &str, params: &[Value]) -> std::result::Result<Vec<Row>, DriverError> {
        let rows = self
            .runtime
            .block_on(async {
                if params.is_empty() {
                    // Text protocol: `show` statements cannot always be prepared.
                    self.pool.fetch_all(sql).await
                } else {
                    bind_all(sqlx::query(sql), params)
                        .fetch_all(&self.pool)
                        .await
                }
            })
            .map_err(classify)?;
        rows.iter().map(convert::row).collect()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> std::result::Result<ExecResult, DriverError> {
        let result = self
            .runtime
            .block_on(async {
                if params.is_empty() {
                    self.pool.execute(sql).await
                } else {
                    bind_all(sqlx::query(sql), params)
                        .execute(&self.pool)
                        .await
                }
            })
            .map_err(classify)?;
        let last_insert_id = result.last_insert_id();
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: (last_insert_id != 0).then_some(last_insert_id),
        })
    }
}
