//! Error types for the MySQL driver.

use thiserror::Error;

/// Errors raised while setting the driver up.
#[derive(Debug, Error)]
pub enum Error {
    /// The driver's runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// The server could not be reached or refused the credentials.
    #[error("failed to connect: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Result type alias for driver setup.
pub type Result<T> = std::result::Result<T, Error>;
