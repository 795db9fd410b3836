//! Deduplication, validation and ordering of stored rows.

use barwire_types::Sample;
use serde::{Deserialize, Serialize};

/// Outcome of one sanitize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    /// Rows before sanitizing.
    pub before: usize,
    /// Rows kept.
    pub after: usize,
    /// Rows dropped as duplicate timestamps.
    pub duplicates: usize,
    /// Rows dropped as invalid.
    pub invalid: usize,
}

impl SanitizeReport {
    /// Returns true if the pass changed nothing but possibly the order.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.duplicates == 0 && self.invalid == 0
    }
}

/// Drops invalid rows, keeps the first stored row per timestamp, and sorts
/// chronologically.
#[must_use]
pub fn sanitize(rows: Vec<Sample>) -> (Vec<Sample>, SanitizeReport) {
    let before = rows.len();
    let mut kept: Vec<Sample> = rows.into_iter().filter(Sample::is_valid).collect();
    let invalid = before - kept.len();

    // Stable, so the first stored occurrence of a timestamp stays first.
    kept.sort_by_key(|row| row.time);
    let valid = kept.len();
    kept.dedup_by_key(|row| row.time);

    let report = SanitizeReport {
        before,
        after: kept.len(),
        duplicates: valid - kept.len(),
        invalid,
    };
    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_types::AssetId;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap() + TimeDelta::minutes(minute)
    }

    fn row(minute: i64, close: f64) -> Sample {
        Sample::new(AssetId::new(1), at(minute), close, close, close, close, 5)
    }

    #[test]
    fn test_sanitize_dedups_and_sorts() {
        let rows = vec![row(3, 1.3), row(1, 1.1), row(3, 9.9), row(2, 1.2), row(1, 8.8)];
        let (clean, report) = sanitize(rows);

        let times: Vec<_> = clean.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![at(1), at(2), at(3)]);
        // First stored occurrence wins.
        assert!((clean[0].close - 1.1).abs() < 1e-10);
        assert!((clean[2].close - 1.3).abs() < 1e-10);
        assert_eq!(report.before, 5);
        assert_eq!(report.after, 3);
        assert_eq!(report.duplicates, 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_sanitize_drops_invalid_rows() {
        let mut broken = row(2, 1.2);
        broken.high = 1.0;
        let mut nan = row(4, 1.4);
        nan.close = f64::NAN;

        let (clean, report) = sanitize(vec![row(1, 1.1), broken, row(3, 1.3), nan]);
        assert_eq!(clean.len(), 2);
        assert_eq!(report.invalid, 2);
        assert_eq!(report.duplicates, 0);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let (once, _) = sanitize(vec![row(2, 1.2), row(1, 1.1), row(2, 1.5)]);
        let (twice, report) = sanitize(once.clone());
        assert_eq!(once, twice);
        assert!(report.is_clean());
    }
}
