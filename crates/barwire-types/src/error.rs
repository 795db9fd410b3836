//! Error types for barwire.

use thiserror::Error;

/// Result type alias for barwire operations.
pub type Result<T> = std::result::Result<T, BarwireError>;

/// Errors shared across the barwire crates.
#[derive(Error, Debug)]
pub enum BarwireError {
    /// Invalid data format.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Asset symbol is not configured.
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Two configured assets share an id or a symbol.
    #[error("Duplicate asset: {0}")]
    DuplicateAsset(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
