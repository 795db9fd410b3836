//! OHLCV bar for one aggregation level.

use barwire_calendar::{Period, TradingCalendar, period};
use barwire_types::{Level, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV aggregate of one level over one bucket.
///
/// Bars are owned and mutated only by the [`Aggregator`](crate::Aggregator);
/// sinks see them by shared reference. Once `complete` is set a bar is
/// never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Level this bar aggregates.
    pub level: Level,
    /// Opening price (first sample's open).
    pub open: f64,
    /// Highest price in the bucket so far.
    pub high: f64,
    /// Lowest price in the bucket so far.
    pub low: f64,
    /// Latest close.
    pub close: f64,
    /// Total tick volume.
    pub volume: u64,
    /// First minute of the bucket.
    pub open_time: DateTime<Utc>,
    /// Last minute of the bucket.
    pub close_time: DateTime<Utc>,
    /// Timestamp of the last sample (or repair instant) reflected here.
    pub as_of: DateTime<Utc>,
    /// Whether the bucket is closed.
    pub complete: bool,
}

impl Bar {
    /// Opens the bar of `level` containing `sample`, seeded from it.
    pub(crate) fn open<C>(level: Level, sample: &Sample, calendar: &C) -> Self
    where
        C: TradingCalendar + ?Sized,
    {
        let bucket = period(level, sample.time, calendar);
        let mut bar = Self {
            level,
            open: sample.open,
            high: sample.high,
            low: sample.low,
            close: sample.close,
            volume: sample.volume,
            open_time: bucket.open_time,
            close_time: bucket.close_time,
            as_of: sample.time,
            complete: false,
        };
        bar.settle(sample);
        bar
    }

    /// Opens a bar whose extremes are out of range, so that absorbing the
    /// first sample always reports a changed extreme.
    pub(crate) fn primed<C>(level: Level, sample: &Sample, calendar: &C) -> Self
    where
        C: TradingCalendar + ?Sized,
    {
        let bucket = period(level, sample.time, calendar);
        Self {
            level,
            open: sample.open,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            close: sample.open,
            volume: 0,
            open_time: bucket.open_time,
            close_time: bucket.close_time,
            as_of: sample.time,
            complete: false,
        }
    }

    /// Folds an in-bucket sample into the bar.
    ///
    /// Returns true if the high or the low moved.
    pub(crate) fn absorb(&mut self, sample: &Sample) -> bool {
        debug_assert!(!self.complete, "absorb into closed {} bar", self.level);
        let relevant = sample.high > self.high || sample.low < self.low;
        self.high = self.high.max(sample.high);
        self.low = self.low.min(sample.low);
        self.close = sample.close;
        self.volume += sample.volume;
        self.as_of = sample.time;
        self.settle(sample);
        relevant
    }

    /// Marks the bar complete if `sample` is its closing tick.
    ///
    /// An M1 bar is its own sample, so it is complete iff the sample is.
    fn settle(&mut self, sample: &Sample) {
        if self.is_closing_tick(sample.time) {
            self.complete = self.level != Level::M1 || sample.complete;
        }
    }

    /// Forces closure after a missed closing tick.
    pub(crate) const fn force_close(&mut self, as_of: DateTime<Utc>, close: f64) {
        self.complete = true;
        self.as_of = as_of;
        self.close = close;
    }

    /// Returns true if a sample at `time` is the bar's closing tick.
    #[must_use]
    pub fn is_closing_tick(&self, time: DateTime<Utc>) -> bool {
        time == self.close_time
    }

    /// Returns the bucket this bar covers.
    #[must_use]
    pub const fn period(&self) -> Period {
        Period::new(self.open_time, self.close_time)
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) bar.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) bar.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
