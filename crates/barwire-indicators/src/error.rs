//! Indicator errors.

use std::path::PathBuf;

use barwire_store::StoreError;
use thiserror::Error;

/// Errors raised while persisting or restoring indicator state.
#[derive(Error, Debug)]
pub enum IndicatorError {
    /// Writing an output file failed.
    #[error("Failed to write indicator output '{path}': {source}")]
    Write {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading or writing the snapshot failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The snapshot was written by an incompatible version.
    #[error("Indicator snapshot schema version {found} is not supported (expected {expected})")]
    SnapshotVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// The snapshot is structurally invalid.
    #[error("Corrupt indicator snapshot: {0}")]
    CorruptSnapshot(String),
}
