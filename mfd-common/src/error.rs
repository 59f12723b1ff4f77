//! Common error types for MFD

use thiserror::Error;

/// Common result type for MFD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across MFD services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tabular or timestamp content could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Object download from the file store failed
    #[error("Download failed for {path}: {reason}")]
    Download { path: String, reason: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
