//! # rowlink
//!
//! Maps plain Rust structs onto existing MySQL tables without a schema
//! definition step. Given a record type and a table name, rowlink discovers
//! the table's columns, pairs them with the record's fields by edit distance
//! under type compatibility rules, builds the SQL and decodes the result
//! rows back into records.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use chrono::{DateTime, Utc};
//! use rowlink::{Client, ConnectionConfig};
//! use rowlink_derive::Record;
//!
//! #[derive(Debug, Default, Clone, Record)]
//! struct User {
//!     id: i32,
//!     user_name: String,
//!     signup_date: DateTime<Utc>,
//! }
//!
//! let config = ConnectionConfig::from_env();
//! let driver = rowlink_mysql::connect(&config)?;
//! let client = Client::new(config, Arc::new(driver));
//! let users = client.table("users");
//!
//! let id = users.add(&User {
//!     user_name: "ana".into(),
//!     signup_date: Utc::now(),
//!     ..Default::default()
//! })?;
//! let found: Vec<User> = users.get(Some(&format!("id = {}", id.unwrap_or_default())))?;
//! ```
//!
//! Every operation also has an `_async` form that runs on the client's
//! worker pool and reports through a [`Completion`].

pub mod cache;
pub mod catalog;
pub mod client;
pub mod codec;
pub mod config;
pub mod correlate;
pub mod driver;
pub mod error;
pub mod query;
pub mod record;
pub mod types;
pub mod value;
pub mod worker;

pub use cache::{CachedValue, ResultCache};
pub use catalog::{Catalog, ColumnInfo, TableMetadata};
pub use client::{Client, DeleteOutcome, Table};
pub use config::{ClientOptions, ConnectionConfig};
pub use correlate::{edit_distance, CorrelationMap, Correlator};
pub use driver::{Driver, DriverError, ExecResult, Row};
pub use error::{Error, JoinError, Result};
pub use query::{Aggregate, AggregateOp, Join, Statement};
pub use record::{Field, FieldKind, Record};
pub use value::{NativeType, Value, ValueError};
pub use worker::{callbacks, Callbacks, Completion, TaskHandle};
