//! Candle endpoint URL construction.

use barwire_types::Cursor;

/// Granularity requested from the source.
pub const GRANULARITY: &str = "M1";

/// Builds the URL for one page of one-minute candles.
///
/// URL format:
/// `{base}/instruments/{SYMBOL}/candles?granularity=M1&from={cursor}&count={count}`
///
/// # Example
///
/// ```
/// use barwire_fetch::url::candles_url;
/// use barwire_types::Cursor;
/// use chrono::{TimeZone, Utc};
///
/// let cursor = Cursor::at(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
/// let url = candles_url("https://api.example.com/v3/", "eur_usd", cursor, 5000);
/// assert_eq!(
///     url,
///     "https://api.example.com/v3/instruments/EUR_USD/candles?granularity=M1&from=2024-01-15T12:00:00Z&count=5000"
/// );
/// ```
#[must_use]
pub fn candles_url(base: &str, symbol: &str, cursor: Cursor, count: usize) -> String {
    format!(
        "{}/instruments/{}/candles?granularity={GRANULARITY}&from={}&count={count}",
        base.trim_end_matches('/'),
        symbol.to_uppercase(),
        cursor.time().format("%Y-%m-%dT%H:%M:%SZ"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_candles_url() {
        let cursor = Cursor::at(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap());
        let url = candles_url("http://localhost:8080", "XAU_USD", cursor, 500);
        assert_eq!(
            url,
            "http://localhost:8080/instruments/XAU_USD/candles?granularity=M1&from=2024-12-31T23:59:00Z&count=500"
        );
    }

    #[test]
    fn test_candles_url_uppercases_symbol() {
        let cursor = Cursor::at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let url = candles_url("http://localhost", "gbp_jpy", cursor, 1);
        assert!(url.contains("/GBP_JPY/"));
    }
}
