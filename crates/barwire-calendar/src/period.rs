//! Pure bucket arithmetic for every aggregation level.
//!
//! Sub-day levels use fixed epoch arithmetic. Day, week and month buckets
//! consult a [`TradingCalendar`] so that they start and end on session
//! boundaries rather than on raw UTC midnights.

use barwire_types::Level;
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::{TradingCalendar, floor_minute};

const DAY_SECONDS: i64 = 86_400;

/// The bucket of one level, `[open_time, close_time]`, inclusive at
/// minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// First minute of the bucket.
    pub open_time: DateTime<Utc>,
    /// Last minute of the bucket.
    pub close_time: DateTime<Utc>,
}

impl Period {
    /// Creates a new period.
    #[must_use]
    pub const fn new(open_time: DateTime<Utc>, close_time: DateTime<Utc>) -> Self {
        Self {
            open_time,
            close_time,
        }
    }

    /// Returns true if `time` falls inside the bucket.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.open_time <= time && time <= self.close_time
    }

    /// Returns true if a sample at `time` is the bucket's closing tick.
    #[must_use]
    pub fn is_closing(&self, time: DateTime<Utc>) -> bool {
        time == self.close_time
    }

    /// Widens the bucket so that it contains `minute`.
    fn clamped(self, minute: DateTime<Utc>) -> Self {
        Self {
            open_time: self.open_time.min(minute),
            close_time: self.close_time.max(minute),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.open_time.format("%Y-%m-%d %H:%M"),
            self.close_time.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Returns the bucket of `level` that contains `time`.
///
/// The result always contains `time` floored to the minute. Instants that
/// are not trading time (weekends, holidays) still get a bucket, widened
/// if needed so the containment holds.
#[must_use]
pub fn period<C>(level: Level, time: DateTime<Utc>, calendar: &C) -> Period
where
    C: TradingCalendar + ?Sized,
{
    let minute = floor_minute(time);
    let bucket = match level {
        Level::D1 => daily(minute, calendar),
        Level::W1 => weekly(minute, calendar),
        Level::Mo1 => monthly(minute, calendar),
        fixed => fixed_period(minute, fixed.seconds().unwrap_or(60)),
    };
    bucket.clamped(minute)
}

fn floor_to(minute: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    minute - TimeDelta::seconds(minute.timestamp().rem_euclid(seconds))
}

fn fixed_period(minute: DateTime<Utc>, seconds: i64) -> Period {
    let open = floor_to(minute, seconds);
    Period::new(open, open + TimeDelta::seconds(seconds - 60))
}

/// UTC days, with Sunday merged into Monday and Friday ending at the
/// weekly close.
fn daily<C: TradingCalendar + ?Sized>(minute: DateTime<Utc>, calendar: &C) -> Period {
    let day_open = floor_to(minute, DAY_SECONDS);
    let mut bucket = Period::new(day_open, day_open + TimeDelta::seconds(DAY_SECONDS - 60));
    match minute.weekday() {
        Weekday::Mon => bucket.open_time -= TimeDelta::days(1),
        Weekday::Sun => bucket.close_time += TimeDelta::days(1),
        Weekday::Fri => {
            let week_close = calendar.week_close_at_or_after(day_open);
            if week_close >= minute {
                bucket.close_time = week_close;
            }
        }
        _ => {}
    }
    bucket
}

/// Weekly open to weekly close, pulled back when the close is a holiday.
fn weekly<C: TradingCalendar + ?Sized>(minute: DateTime<Utc>, calendar: &C) -> Period {
    let week_close = calendar.week_close_at_or_after(minute);
    let open = calendar.week_open_at_or_before(week_close);
    Period::new(open, last_trading(week_close, calendar))
}

/// Calendar months, ending at the last trading minute of the month.
fn monthly<C: TradingCalendar + ?Sized>(minute: DateTime<Utc>, calendar: &C) -> Period {
    let date = minute.date_naive();
    let first = date - TimeDelta::days(i64::from(date.day0()));
    let probe = first + TimeDelta::days(31);
    let next_first = probe - TimeDelta::days(i64::from(probe.day0()));

    let open = first.and_time(NaiveTime::MIN).and_utc();
    let month_end = next_first.and_time(NaiveTime::MIN).and_utc() - TimeDelta::minutes(1);
    Period::new(open, last_trading(month_end, calendar))
}

fn last_trading<C: TradingCalendar + ?Sized>(time: DateTime<Utc>, calendar: &C) -> DateTime<Utc> {
    if calendar.is_trading_instant(time) {
        time
    } else {
        calendar.last_trading_instant_at_or_before(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FxCalendar;
    use chrono::{NaiveDate, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_fixed_levels() {
        let cal = FxCalendar::default();
        let t = utc(2024, 1, 3, 13, 7);

        assert_eq!(period(Level::M1, t, &cal), Period::new(t, t));
        assert_eq!(
            period(Level::M5, t, &cal),
            Period::new(utc(2024, 1, 3, 13, 5), utc(2024, 1, 3, 13, 9))
        );
        assert_eq!(
            period(Level::M15, t, &cal),
            Period::new(utc(2024, 1, 3, 13, 0), utc(2024, 1, 3, 13, 14))
        );
        assert_eq!(
            period(Level::M30, t, &cal),
            Period::new(utc(2024, 1, 3, 13, 0), utc(2024, 1, 3, 13, 29))
        );
        assert_eq!(
            period(Level::H1, t, &cal),
            Period::new(utc(2024, 1, 3, 13, 0), utc(2024, 1, 3, 13, 59))
        );
    }

    #[test]
    fn test_daily_sunday_merges_with_monday() {
        let cal = FxCalendar::default();
        let sunday = period(Level::D1, utc(2024, 1, 7, 22, 0), &cal);
        let monday = period(Level::D1, utc(2024, 1, 8, 10, 0), &cal);

        assert_eq!(sunday, monday);
        assert_eq!(sunday.open_time, utc(2024, 1, 7, 0, 0));
        assert_eq!(sunday.close_time, utc(2024, 1, 8, 23, 59));
    }

    #[test]
    fn test_daily_friday_ends_at_weekly_close() {
        let cal = FxCalendar::default();
        let friday = period(Level::D1, utc(2024, 1, 5, 10, 0), &cal);

        assert_eq!(friday.open_time, utc(2024, 1, 5, 0, 0));
        assert_eq!(friday.close_time, utc(2024, 1, 5, 21, 59));

        let wednesday = period(Level::D1, utc(2024, 1, 3, 10, 0), &cal);
        assert_eq!(
            wednesday,
            Period::new(utc(2024, 1, 3, 0, 0), utc(2024, 1, 3, 23, 59))
        );
    }

    #[test]
    fn test_weekly_closes_on_coming_friday() {
        let cal = FxCalendar::default();
        let week = period(Level::W1, utc(2024, 1, 3, 12, 0), &cal);

        assert_eq!(week.open_time, utc(2023, 12, 31, 22, 0));
        assert_eq!(week.close_time, utc(2024, 1, 5, 21, 59));
    }

    #[test]
    fn test_weekly_close_pulled_back_on_holiday() {
        let good_friday = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
        let cal = FxCalendar::default().with_holidays([good_friday]);
        let week = period(Level::W1, utc(2024, 3, 27, 12, 0), &cal);

        // Thursday 23:59 New York, the last trading minute before the holiday.
        assert_eq!(week.close_time, utc(2024, 3, 29, 3, 59));
        assert!(cal.is_trading_instant(week.close_time));

        let plain = period(Level::W1, utc(2024, 3, 27, 12, 0), &FxCalendar::default());
        assert_eq!(plain.close_time, utc(2024, 3, 29, 20, 59));
    }

    #[test]
    fn test_monthly_boundaries() {
        let cal = FxCalendar::default();

        // January 2024 ends on a Wednesday.
        let january = period(Level::Mo1, utc(2024, 1, 17, 9, 30), &cal);
        assert_eq!(january.open_time, utc(2024, 1, 1, 0, 0));
        assert_eq!(january.close_time, utc(2024, 1, 31, 23, 59));

        // August 2024 ends on a Saturday.
        let august = period(Level::Mo1, utc(2024, 8, 14, 9, 30), &cal);
        assert_eq!(august.close_time, utc(2024, 8, 30, 20, 59));

        // May 2024 ends on a Friday after the New York close.
        let may = period(Level::Mo1, utc(2024, 5, 2, 9, 30), &cal);
        assert_eq!(may.close_time, utc(2024, 5, 31, 20, 59));

        // December rolls into the next year.
        let december = period(Level::Mo1, utc(2024, 12, 3, 9, 30), &cal);
        assert_eq!(december.open_time, utc(2024, 12, 1, 0, 0));
        assert_eq!(december.close_time, utc(2024, 12, 31, 23, 59));
    }

    #[test]
    fn test_period_is_idempotent() {
        let cal = FxCalendar::default();
        let t = utc(2024, 1, 3, 12, 34);

        for level in Level::ALL {
            let bucket = period(level, t, &cal);
            assert!(bucket.contains(t), "{level} {bucket}");
            assert_eq!(period(level, bucket.open_time, &cal), bucket, "{level}");
            assert_eq!(period(level, bucket.close_time, &cal), bucket, "{level}");
        }
    }

    #[test]
    fn test_period_contains_every_instant() {
        let cal = FxCalendar::default();
        let mut t = utc(2024, 5, 29, 0, 0);
        let end = utc(2024, 6, 4, 0, 0);

        while t < end {
            for level in Level::ALL {
                let bucket = period(level, t, &cal);
                assert!(bucket.contains(t), "{level} {bucket} at {t}");
                assert!(bucket.is_closing(bucket.close_time));
            }
            t += TimeDelta::minutes(37);
        }
    }
}
