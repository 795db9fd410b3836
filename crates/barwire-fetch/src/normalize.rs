//! Raw row normalization.

use barwire_calendar::TradingCalendar;
use barwire_types::{Asset, RawPage, Sample};

/// Counts of rows dropped by [`normalize_page`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Rows the source had not finalized.
    pub incomplete: usize,
    /// Rows without ticks.
    pub zero_volume: usize,
    /// Rows with non-finite, non-positive or inconsistent prices.
    pub invalid: usize,
    /// Rows whose timestamp is not a whole minute.
    pub unaligned: usize,
    /// Rows outside trading hours.
    pub off_calendar: usize,
    /// Rows repeating an earlier timestamp in the same page.
    pub duplicates: usize,
}

impl NormalizeReport {
    /// Total rows dropped.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.incomplete
            + self.zero_volume
            + self.invalid
            + self.unaligned
            + self.off_calendar
            + self.duplicates
    }
}

/// Converts a raw page into clean, chronologically ordered samples.
///
/// Drops incomplete rows, zero-volume rows, invalid prices, unaligned
/// timestamps and instants outside the trading calendar. Within the page
/// the first row for a timestamp wins.
#[must_use]
pub fn normalize_page<C>(
    page: &RawPage,
    asset: &Asset,
    calendar: &C,
) -> (Vec<Sample>, NormalizeReport)
where
    C: TradingCalendar + ?Sized,
{
    let mut report = NormalizeReport::default();
    let mut samples = Vec::with_capacity(page.len());

    for row in &page.rows {
        let sample = row.into_sample(asset.id());
        if !sample.complete {
            report.incomplete += 1;
        } else if sample.volume == 0 {
            report.zero_volume += 1;
        } else if !sample.is_valid() {
            report.invalid += 1;
        } else if !sample.is_aligned() {
            report.unaligned += 1;
        } else if !calendar.is_trading_instant(sample.time) {
            report.off_calendar += 1;
        } else {
            samples.push(sample);
        }
    }

    samples.sort_by_key(|sample| sample.time);
    let before = samples.len();
    samples.dedup_by_key(|sample| sample.time);
    report.duplicates = before - samples.len();

    (samples, report)
}
