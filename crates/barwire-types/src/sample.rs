//! Minute sample representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AssetId;

/// A single one-minute OHLCV sample for one asset.
///
/// Samples are the base-resolution input of the aggregator. For a given
/// asset they must be fed in strictly increasing `time` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Asset the sample belongs to.
    pub asset: AssetId,
    /// Minute the sample covers (UTC, whole minute).
    pub time: DateTime<Utc>,
    /// Opening price.
    pub open: f64,
    /// Highest price during the minute.
    pub high: f64,
    /// Lowest price during the minute.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Number of ticks observed during the minute.
    pub volume: u64,
    /// Whether the source reported the minute as final.
    pub complete: bool,
}

impl Sample {
    /// Creates a new complete sample.
    #[must_use]
    pub const fn new(
        asset: AssetId,
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            asset,
            time,
            open,
            high,
            low,
            close,
            volume,
            complete: true,
        }
    }

    /// Returns the sample with its completion flag replaced.
    #[must_use]
    pub const fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Returns true if the prices are finite, positive and consistent
    /// (`low <= open, close <= high`).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.low <= self.high
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }

    /// Returns true if the timestamp falls on a whole minute.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        is_minute_aligned(self.time)
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Returns true if `time` has no seconds or sub-second component.
#[must_use]
pub fn is_minute_aligned(time: DateTime<Utc>) -> bool {
    time.timestamp().rem_euclid(60) == 0 && time.timestamp_subsec_nanos() == 0
}

/// A raw row as delivered by a data source, before normalization.
///
/// Prices use the short keys `o`, `h`, `l`, `c` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Minute the row covers.
    pub time: DateTime<Utc>,
    /// Whether the source considers the minute final.
    #[serde(default)]
    pub complete: bool,
    /// Tick count for the minute.
    #[serde(default)]
    pub volume: u64,
    /// Opening price.
    #[serde(rename = "o")]
    pub open: f64,
    /// Highest price.
    #[serde(rename = "h")]
    pub high: f64,
    /// Lowest price.
    #[serde(rename = "l")]
    pub low: f64,
    /// Closing price.
    #[serde(rename = "c")]
    pub close: f64,
}

impl RawRow {
    /// Converts the row into a sample for `asset` without validation.
    #[must_use]
    pub const fn into_sample(self, asset: AssetId) -> Sample {
        Sample {
            asset,
            time: self.time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            complete: self.complete,
        }
    }
}

/// A bounded page of raw rows returned by one source request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Symbol the page was requested for.
    pub asset: String,
    /// Rows in source order (not necessarily sorted or unique).
    pub rows: Vec<RawRow>,
}

impl RawPage {
    /// Creates a new page.
    #[must_use]
    pub fn new(asset: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self {
            asset: asset.into(),
            rows,
        }
    }

    /// Returns the number of rows in the page.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the page holds no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the latest row timestamp in the page.
    #[must_use]
    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.rows.iter().map(|row| row.time).max()
    }
}
