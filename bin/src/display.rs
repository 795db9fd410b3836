//! Display utilities and output formatting for the barwire CLI.

use barwire_lib::{OutputRow, WARMING_UP};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner used while an asset is being ingested.
pub(crate) fn spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {prefix:.bold} {elapsed_precise} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(format!("{prefix:>10}"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Formats a duration as `1h 02m 03s`, `2m 03s` or `3.4s`.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        0..60 => format!("{:.1}s", elapsed.as_secs_f64()),
        60..3600 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60),
    }
}

/// Formats indicator values, showing warm-up placeholders as `-`.
pub(crate) fn format_values(columns: &[String], row: &OutputRow) -> String {
    columns
        .iter()
        .zip(&row.values)
        .map(|(name, value)| {
            if *value == WARMING_UP {
                format!("{name}=-")
            } else {
                format!("{name}={value:.5}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use barwire_lib::Level;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(3400)), "3.4s");
        assert_eq!(format_elapsed(Duration::from_secs(123)), "2m 03s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "1h 02m 03s");
    }

    #[test]
    fn test_format_values_marks_warm_up() {
        let row = OutputRow {
            level: Level::H1,
            as_of: Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap(),
            complete: true,
            values: vec![WARMING_UP, 1.5],
        };
        let columns = vec!["volume_abs".to_string(), "volume_rel".to_string()];
        assert_eq!(format_values(&columns, &row), "volume_abs=- volume_rel=1.50000");
    }
}
