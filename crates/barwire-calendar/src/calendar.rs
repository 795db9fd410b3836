//! Trading calendar predicate and weekly session instants.

use chrono::offset::LocalResult;
use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use std::collections::BTreeSet;

/// How far back [`TradingCalendar::last_trading_instant_at_or_before`]
/// searches before giving up.
const MAX_LOOKBACK_MINUTES: i64 = 31 * 24 * 60;

/// Source of truth for which instants are valid market time.
///
/// Used by the processor to filter samples and by the period clock to
/// place day, week and month boundaries.
pub trait TradingCalendar: Send + Sync + std::fmt::Debug {
    /// Returns true if the minute starting at `time` is inside a trading session.
    fn is_trading_instant(&self, time: DateTime<Utc>) -> bool;

    /// Returns the first weekly close instant (the last trading minute of
    /// the week, ignoring holidays) at or after `time`.
    fn week_close_at_or_after(&self, time: DateTime<Utc>) -> DateTime<Utc>;

    /// Returns the most recent weekly open instant at or before `time`.
    fn week_open_at_or_before(&self, time: DateTime<Utc>) -> DateTime<Utc>;

    /// Returns the latest trading minute at or before `time`.
    ///
    /// Falls back to `time` itself (floored to the minute) if no trading
    /// minute exists within the previous 31 days.
    fn last_trading_instant_at_or_before(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let start = floor_minute(time);
        (0..=MAX_LOOKBACK_MINUTES)
            .map(|back| start - TimeDelta::minutes(back))
            .find(|candidate| self.is_trading_instant(*candidate))
            .unwrap_or(start)
    }
}

/// Truncates `time` to the start of its minute.
#[must_use]
pub fn floor_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = time.timestamp().rem_euclid(60);
    time - TimeDelta::seconds(seconds)
        - TimeDelta::nanoseconds(i64::from(time.timestamp_subsec_nanos()))
}

/// Spot FX calendar: the week opens Sunday at the rollover hour and closes
/// Friday at the rollover hour, both in the calendar's time zone.
///
/// The default is the New York 17:00 convention. Holidays close the whole
/// local date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxCalendar {
    tz: Tz,
    rollover: NaiveTime,
    holidays: BTreeSet<NaiveDate>,
}

impl Default for FxCalendar {
    fn default() -> Self {
        Self::new(chrono_tz::America::New_York)
    }
}

impl FxCalendar {
    /// Creates a calendar for `tz` with a 17:00 rollover and no holidays.
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            rollover: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            holidays: BTreeSet::new(),
        }
    }

    /// Returns the calendar with the given closed dates added.
    #[must_use]
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Returns the calendar time zone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Returns true if the local `date` is a configured holiday.
    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Returns the configured holidays in date order.
    pub fn holidays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.holidays.iter().copied()
    }

    /// Converts a local wall time to UTC.
    ///
    /// Ambiguous times resolve to the earlier instant; times inside a
    /// spring-forward gap shift forward by one hour.
    fn localize(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let resolved = match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
            LocalResult::None => self
                .tz
                .from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest(),
        };
        resolved.map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
    }

    fn last_minute(&self) -> NaiveTime {
        self.rollover - TimeDelta::minutes(1)
    }
}

impl TradingCalendar for FxCalendar {
    fn is_trading_instant(&self, time: DateTime<Utc>) -> bool {
        let local = time.with_timezone(&self.tz);
        if self.is_holiday(local.date_naive()) {
            return false;
        }
        let before_rollover = local.time() < self.rollover;
        match local.weekday() {
            Weekday::Sat => false,
            Weekday::Sun => !before_rollover,
            Weekday::Fri => before_rollover,
            _ => true,
        }
    }

    fn week_close_at_or_after(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let local = time.with_timezone(&self.tz);
        let days_ahead = (Weekday::Fri.num_days_from_monday() + 7
            - local.weekday().num_days_from_monday())
            % 7;
        let friday = local.date_naive() + TimeDelta::days(i64::from(days_ahead));
        let close = self.localize(friday.and_time(self.last_minute()));
        if close >= floor_minute(time) {
            close
        } else {
            self.localize((friday + TimeDelta::days(7)).and_time(self.last_minute()))
        }
    }

    fn week_open_at_or_before(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let local = time.with_timezone(&self.tz);
        let days_back = local.weekday().num_days_from_sunday();
        let sunday = local.date_naive() - TimeDelta::days(i64::from(days_back));
        let open = self.localize(sunday.and_time(self.rollover));
        if open <= time {
            open
        } else {
            self.localize((sunday - TimeDelta::days(7)).and_time(self.rollover))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_fx_trading_hours() {
        let cal = FxCalendar::default();

        // 2024-01-06 is a Saturday; New York is UTC-5 in January.
        assert!(!cal.is_trading_instant(utc(2024, 1, 6, 15, 0)));
        // Sunday 16:59 and 17:00 New York.
        assert!(!cal.is_trading_instant(utc(2024, 1, 7, 21, 59)));
        assert!(cal.is_trading_instant(utc(2024, 1, 7, 22, 0)));
        // Wednesday.
        assert!(cal.is_trading_instant(utc(2024, 1, 10, 3, 0)));
        // Friday 16:59 and 17:00 New York.
        assert!(cal.is_trading_instant(utc(2024, 1, 12, 21, 59)));
        assert!(!cal.is_trading_instant(utc(2024, 1, 12, 22, 0)));
    }

    #[test]
    fn test_fx_trading_hours_dst() {
        let cal = FxCalendar::default();

        // July: New York is UTC-4.
        assert!(cal.is_trading_instant(utc(2024, 7, 12, 20, 59)));
        assert!(!cal.is_trading_instant(utc(2024, 7, 12, 21, 0)));
        assert!(cal.is_trading_instant(utc(2024, 7, 14, 21, 0)));
    }

    #[test]
    fn test_holiday_closes_local_date() {
        let good_friday = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
        let cal = FxCalendar::default().with_holidays([good_friday]);

        assert!(cal.is_holiday(good_friday));
        // Friday 2024-03-29 10:00 New York (UTC-4).
        assert!(!cal.is_trading_instant(utc(2024, 3, 29, 14, 0)));
        // Thursday 23:59 New York is still open.
        assert!(cal.is_trading_instant(utc(2024, 3, 29, 3, 59)));
        assert_eq!(cal.holidays().count(), 1);
    }

    #[test]
    fn test_week_close_and_open() {
        let cal = FxCalendar::default();
        let wednesday = utc(2024, 1, 3, 12, 0);

        assert_eq!(
            cal.week_close_at_or_after(wednesday),
            utc(2024, 1, 5, 21, 59)
        );
        assert_eq!(
            cal.week_open_at_or_before(wednesday),
            utc(2023, 12, 31, 22, 0)
        );

        // Exactly at the close it is its own close.
        let close = utc(2024, 1, 5, 21, 59);
        assert_eq!(cal.week_close_at_or_after(close), close);
        // One minute later belongs to the following week.
        assert_eq!(
            cal.week_close_at_or_after(close + TimeDelta::minutes(1)),
            utc(2024, 1, 12, 21, 59)
        );
        // Sunday before the open still points at the previous open.
        assert_eq!(
            cal.week_open_at_or_before(utc(2024, 1, 7, 21, 0)),
            utc(2023, 12, 31, 22, 0)
        );
    }

    #[test]
    fn test_last_trading_instant() {
        let cal = FxCalendar::default();

        // Saturday 2024-08-31 falls back to Friday 16:59 New York.
        assert_eq!(
            cal.last_trading_instant_at_or_before(utc(2024, 8, 31, 23, 59)),
            utc(2024, 8, 30, 20, 59)
        );
        // A trading instant is its own answer.
        let open = utc(2024, 8, 28, 10, 0);
        assert_eq!(cal.last_trading_instant_at_or_before(open), open);
    }

    #[test]
    fn test_floor_minute() {
        let time = Utc.with_ymd_and_hms(2024, 1, 3, 12, 7, 45).unwrap();
        assert_eq!(floor_minute(time), utc(2024, 1, 3, 12, 7));
    }
}
