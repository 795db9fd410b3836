//! Pipeline errors.

use barwire_aggregate::AggregateError;
use barwire_fetch::FetchError;
use barwire_indicators::IndicatorError;
use barwire_store::StoreError;
use barwire_types::BarwireError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source failed with a non-transient error.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Storage failed outside of a write.
    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),

    /// A batch could not be written after all retries.
    #[error("Failed to write {unwritten} rows: {source}")]
    Write {
        /// Rows in the batch that was being written.
        unwritten: usize,
        /// The last storage error.
        source: StoreError,
    },

    /// The aggregator rejected a sample or snapshot.
    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    /// Indicator state could not be restored.
    #[error("Indicator state failed: {0}")]
    Indicator(#[from] IndicatorError),

    /// The run was cancelled.
    #[error("Cancelled with {unwritten} accepted rows not yet written")]
    Cancelled {
        /// Rows received by the writer but not persisted.
        unwritten: usize,
    },

    /// A stage's peer hung up unexpectedly.
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// A stage task panicked or was aborted.
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Returns true for errors caused by a peer stage stopping rather than
    /// by this stage itself.
    #[must_use]
    pub const fn is_secondary(&self) -> bool {
        matches!(self, Self::ChannelClosed(_) | Self::Cancelled { .. })
    }
}

impl From<BarwireError> for PipelineError {
    fn from(err: BarwireError) -> Self {
        Self::Config(err.to_string())
    }
}
