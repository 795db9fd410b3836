//! Aggregation errors.

use barwire_types::{AssetId, Level};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::SinkError;

/// Errors returned by the [`Aggregator`](crate::Aggregator).
///
/// Every variant except [`AggregateError::Sink`] is a caller contract
/// violation; the rejected sample leaves the aggregator untouched.
#[derive(Error, Debug)]
pub enum AggregateError {
    /// A sample was not strictly later than the previous one.
    #[error("Out-of-order sample: {got} is not after {last}")]
    OutOfOrder {
        /// Timestamp of the last accepted sample.
        last: DateTime<Utc>,
        /// Timestamp of the rejected sample.
        got: DateTime<Utc>,
    },

    /// A sample for a different asset was fed.
    #[error("Sample for asset {got} fed to aggregator for {expected}")]
    AssetMismatch {
        /// Asset the aggregator serves.
        expected: AssetId,
        /// Asset of the rejected sample.
        got: AssetId,
    },

    /// A sample timestamp was not on a whole minute.
    #[error("Sample time {0} is not minute-aligned")]
    Unaligned(DateTime<Utc>),

    /// A sample would mutate a bar that is already complete.
    #[error("{level} bar closing at {close_time} is already complete")]
    ClosedBar {
        /// Level of the closed bar.
        level: Level,
        /// Close time of the closed bar.
        close_time: DateTime<Utc>,
    },

    /// A snapshot was written by an incompatible schema.
    #[error("Snapshot schema version {found} is not supported (expected {expected})")]
    SnapshotVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// A snapshot failed structural validation.
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// The sink failed to checkpoint.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
