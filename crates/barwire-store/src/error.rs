//! Storage errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing persisted data.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a JSON snapshot.
    #[error("Failed to parse snapshot '{path}': {source}")]
    ParseJson {
        /// The snapshot path.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize JSON.
    #[error("Failed to serialize snapshot: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// The backend is temporarily unable to serve requests.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A blocking storage task was cancelled or panicked.
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
