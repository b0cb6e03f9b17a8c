//! Error types for score persistence.

use thiserror::Error;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration problem (missing or malformed settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not establish or validate a database connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query failed after the pool was up.
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
