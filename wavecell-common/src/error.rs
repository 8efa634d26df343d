//! Common error types for wavecell
//!
//! Capacity shortfalls in the sample buffers are deliberately *not* errors:
//! reads and writes report how much they moved and callers inspect the
//! count. The variants here cover configuration, ingestion, and index
//! persistence failures.

use thiserror::Error;

/// Common result type for wavecell operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the wavecell crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source audio file missing on ingestion
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Index serialization or checkpoint error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
