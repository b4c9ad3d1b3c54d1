//! MySQL driver for rowlink.
//!
//! Wraps a `sqlx` MySQL pool behind rowlink's synchronous [`Driver`]
//! interface. The driver owns a small tokio runtime and blocks on it for
//! every call, so it must not be used from inside another async runtime.
//!
//! ```ignore
//! use rowlink::{ClientOptions, ConnectionConfig};
//!
//! let client = rowlink_mysql::connect_or_offline(ConnectionConfig::from_env(), ClientOptions::default());
//! let total = client.table("users").count(None)?;
//! ```
//!
//! [`Driver`]: rowlink::Driver

mod convert;
mod driver;
mod error;

use std::sync::Arc;

use rowlink::{Client, ClientOptions, ConnectionConfig};
use tracing::error;

pub use driver::MySqlDriver;
pub use error::{Error, Result};

/// Connects to the configured server.
///
/// # Errors
///
/// Fails when the runtime cannot start or the server refuses the connection.
pub fn connect(config: &ConnectionConfig) -> Result<MySqlDriver> {
    MySqlDriver::connect(config)
}

/// Builds a client, falling back to an offline one when the server cannot
/// be reached. Operations on an offline client fail with
/// [`rowlink::Error::ConnectionAbsent`].
#[must_use]
pub fn connect_or_offline(config: ConnectionConfig, options: ClientOptions) -> Client {
    match MySqlDriver::connect(&config) {
        Ok(driver) => Client::with_options(config, Some(Arc::new(driver)), options),
        Err(e) => {
            error!(host = %config.host, database = %config.database, error = %e, "Connection failed, continuing offline");
            Client::with_options(config, None, options)
        }
    }
}
