//! Client configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

/// Connection parameters for one database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database (schema) every table belongs to.
    pub database: String,
    /// User name.
    pub user: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ConnectionConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Reads `ROWLINK_HOST`, `ROWLINK_PORT`, `ROWLINK_DATABASE`,
    /// `ROWLINK_USER` and `ROWLINK_PASSWORD`.
    ///
    /// Missing values fall back to `localhost`, port 3306 and empty strings.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("ROWLINK_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: lookup("ROWLINK_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database: lookup("ROWLINK_DATABASE").unwrap_or_default(),
            user: lookup("ROWLINK_USER").unwrap_or_default(),
            password: lookup("ROWLINK_PASSWORD").unwrap_or_default(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sizing of the async worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Number of worker threads.
    pub workers: usize,
    /// Jobs that may wait in the queue before submissions are refused.
    pub queue_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig::new("db", 3306, "shop", "app", "hunter2");
        let debug = format!("{config:?}");
        assert!(debug.contains("shop"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ROWLINK_HOST", "10.0.0.5"),
            ("ROWLINK_PORT", "3307"),
            ("ROWLINK_DATABASE", "shop"),
            ("ROWLINK_USER", "app"),
        ]
        .into_iter()
        .collect();
        let config = ConnectionConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 3307);
        assert_eq!(config.database, "shop");
        assert_eq!(config.password, "");
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ConnectionConfig::from_lookup(|_| None);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_deserialize() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"host":"h","database":"d","user":"u"}"#).unwrap();
        assert_eq!(config.port, 3306);
        let options: ClientOptions = serde_json::from_str(r#"{"workers":2}"#).unwrap();
        assert_eq!(options.workers, 2);
        assert_eq!(options.queue_capacity, 64);
    }
}
