#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rowlink::{Client, ClientOptions, ConnectionConfig, Driver, DriverError, ExecResult, Row, Value};

pub const DATABASE: &str = "shop";

/// A column of a scripted table.
#[derive(Debug, Clone)]
pub struct FakeColumn {
    pub name: &'static str,
    pub declared_type: &'static str,
    pub key: &'static str,
    pub default: Option<&'static str>,
    pub extra: &'static str,
}

pub fn pk(name: &'static str, declared_type: &'static str) -> FakeColumn {
    FakeColumn {
        name,
        declared_type,
        key: "PRI",
        default: None,
        extra: "auto_increment",
    }
}

pub fn column(name: &'static str, declared_type: &'static str) -> FakeColumn {
    FakeColumn {
        name,
        declared_type,
        key: "",
        default: None,
        extra: "",
    }
}

pub fn generated(name: &'static str, declared_type: &'static str) -> FakeColumn {
    FakeColumn {
        name,
        declared_type,
        key: "",
        default: Some("CURRENT_TIMESTAMP"),
        extra: "DEFAULT_GENERATED",
    }
}

pub fn users_columns() -> Vec<FakeColumn> {
    vec![
        pk("id", "int(11)"),
        column("user_name", "varchar(255)"),
        column("signup_date", "datetime"),
    ]
}

/// Scripted driver answering the introspection queries from an in-memory
/// schema and everything else from canned responses.
#[derive(Default)]
pub struct FakeDriver {
    schema: Mutex<Vec<(String, Vec<FakeColumn>)>>,
    existing: Mutex<HashSet<String>>,
    responses: Mutex<Vec<(String, Vec<Row>)>>,
    exec_results: Mutex<VecDeque<ExecResult>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
    bulk_fails: AtomicBool,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a table to the schema and marks it as existing.
    pub fn add_table(&self, name: &str, columns: Vec<FakeColumn>) {
        self.schema.lock().push((name.to_string(), columns));
        self.existing.lock().insert(name.to_string());
    }

    /// Makes the bulk information_schema query fail.
    pub fn fail_bulk_query(&self) {
        self.bulk_fails.store(true, Ordering::SeqCst);
    }

    /// Answers every query starting with `prefix` with `rows`.
    pub fn respond(&self, prefix: &str, rows: Vec<Row>) {
        self.responses.lock().push((prefix.to_string(), rows));
    }

    /// Result of the next `execute` call.
    pub fn push_exec(&self, rows_affected: u64, last_insert_id: Option<u64>) {
        self.exec_results.lock().push_back(ExecResult {
            rows_affected,
            last_insert_id,
        });
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn params_of(&self, prefix: &str) -> Option<Vec<Value>> {
        self.log
            .lock()
            .iter()
            .find(|(sql, _)| sql.starts_with(prefix))
            .map(|(_, params)| params.clone())
    }

    /// Number of logged statements starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|(sql, _)| sql.starts_with(prefix))
            .count()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn bulk_rows(&self) -> Vec<Row> {
        let schema = self.schema.lock();
        schema
            .iter()
            .flat_map(|(table, columns)| {
                columns.iter().map(move |c| {
                    Row::from_pairs([
                        ("table_name", Value::from(table.as_str())),
                        ("column_name", Value::from(c.name)),
                        ("column_type", Value::from(c.declared_type)),
                        ("collation_name", Value::Null),
                        ("is_nullable", Value::from("NO")),
                        ("column_key", Value::from(c.key)),
                        ("column_default", c.default.map_or(Value::Null, Value::from)),
                        ("extra", Value::from(c.extra)),
                        ("privileges", Value::from("select,insert,update,references")),
                    ])
                })
            })
            .collect()
    }

    fn describe_rows(&self, table: &str) -> Option<Vec<Row>> {
        let schema = self.schema.lock();
        let (_, columns) = schema.iter().find(|(name, _)| name == table)?;
        Some(
            columns
                .iter()
                .map(|c| {
                    Row::from_pairs([
                        ("Field", Value::from(c.name)),
                        ("Type", Value::from(c.declared_type)),
                        ("Collation", Value::Null),
                        ("Null", Value::from("NO")),
                        ("Key", Value::from(c.key)),
                        ("Default", c.default.map_or(Value::Null, Value::from)),
                        ("Extra", Value::from(c.extra)),
                        ("Privileges", Value::from("select,insert,update,references")),
                    ])
                })
                .collect(),
        )
    }
}

impl Driver for FakeDriver {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        self.log.lock().push((sql.to_string(), params.to_vec()));

        if sql.starts_with("select TABLE_NAME as table_name") {
            if self.bulk_fails.load(Ordering::SeqCst) {
                return Err(DriverError::Query("SELECT command denied".to_string()));
            }
            return Ok(self.bulk_rows());
        }
        if let Some(target) = sql.strip_prefix("show full columns from ") {
            let table = target.rsplit('.').next().unwrap_or(target);
            return self
                .describe_rows(table)
                .ok_or_else(|| DriverError::NoSuchTable(format!("Table '{target}' doesn't exist")));
        }
        if sql.starts_with("select count(*) from information_schema.tables") {
            let name = match params.get(1) {
                Some(Value::Text(name)) => name.clone(),
                _ => String::new(),
            };
            let count = i64::from(self.existing.lock().contains(&name));
            return Ok(vec![Row::from_pairs([("count(*)", Value::Int(count))])]);
        }

        let responses = self.responses.lock();
        Ok(responses
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult, DriverError> {
        self.log.lock().push((sql.to_string(), params.to_vec()));

        if let Some(rest) = sql.strip_prefix("create table if not exists ") {
            let name = rest.split([' ', '(']).next().unwrap_or_default();
            self.existing.lock().insert(name.to_string());
        } else if let Some(name) = sql.strip_prefix("drop table ") {
            self.existing.lock().remove(name.trim());
        }

        Ok(self.exec_results.lock().pop_front().unwrap_or(ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        }))
    }
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("localhost", 3306, DATABASE, "app", "secret")
}

pub fn client(driver: &Arc<FakeDriver>) -> Client {
    Client::with_options(
        config(),
        Some(Arc::clone(driver) as Arc<dyn Driver>),
        ClientOptions {
            workers: 2,
            queue_capacity: 16,
        },
    )
}
