//! Recurrence calculator: computes the next scheduled occurrence for a
//! recurring schedule.
//!
//! Pure and deterministic. The base instant is `from` with the wall-clock
//! set to the schedule's anchor time (seconds zeroed), advanced by one
//! period of the schedule's frequency.

use chrono::{DateTime, Duration, Months, NaiveTime, Timelike, Utc};

use crate::domain::{Frequency, Period, Schedule};

/// Compute the next occurrence after `from`, or `None` when the schedule
/// is terminal (`once`) or malformed.
pub fn next_occurrence(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let anchor = schedule.time.unwrap_or(NaiveTime::MIN);
    let anchor = NaiveTime::from_hms_opt(anchor.hour(), anchor.minute(), 0)?;
    let base = from.date_naive().and_time(anchor).and_utc();

    match schedule.frequency {
        Frequency::Once => None,
        Frequency::Hourly => base.checked_add_signed(Duration::hours(1)),
        Frequency::Daily => base.checked_add_signed(Duration::days(1)),
        Frequency::Weekly => base.checked_add_signed(Duration::days(7)),
        // Calendar-month advance; end-of-month dates clamp (Jan 31 -> Feb 28)
        Frequency::Monthly => base.checked_add_months(Months::new(1)),
        Frequency::EveryXMinutes => {
            let interval = schedule.interval.filter(|i| *i > 0)?;
            base.checked_add_signed(Duration::minutes(interval as i64))
        }
        // Span divided by the occurrence count, floored to whole units
        Frequency::MultipleTimes => {
            let times = schedule.times.filter(|t| t.count > 0)?;
            let step = match times.per {
                Period::Hour => Duration::minutes((60 / times.count) as i64),
                Period::Day => Duration::hours((24 / times.count) as i64),
                Period::Week => Duration::days((7 / times.count) as i64),
                Period::Month => Duration::days((30 / times.count) as i64),
            };
            if step.is_zero() {
                return None;
            }
            base.checked_add_signed(step)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_once_is_terminal() {
        let s = Schedule::once(
            chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            t(14, 0),
        );
        assert_eq!(next_occurrence(&s, dt(2025, 3, 10, 14, 0, 0)), None);
    }

    #[test]
    fn test_hourly_advances_one_hour_from_anchor() {
        let s = Schedule::hourly(t(9, 15));
        let next = next_occurrence(&s, dt(2025, 3, 10, 9, 15, 12)).unwrap();
        assert_eq!(next, dt(2025, 3, 10, 10, 15, 0));
    }

    #[test]
    fn test_daily_round_trip_n_days() {
        let s = Schedule::daily(t(8, 30));
        let mut current = dt(2025, 3, 10, 8, 30, 7);
        for i in 1..=5 {
            current = next_occurrence(&s, current).unwrap();
            assert_eq!(current, dt(2025, 3, 10 + i, 8, 30, 0));
        }
    }

    #[test]
    fn test_weekly_advances_seven_days() {
        let s = Schedule::weekly(t(10, 0), Some("monday"));
        let next = next_occurrence(&s, dt(2025, 3, 10, 10, 0, 3)).unwrap();
        assert_eq!(next, dt(2025, 3, 17, 10, 0, 0));
    }

    #[test]
    fn test_monthly_clamps_end_of_month() {
        let s = Schedule::monthly(t(9, 0));
        // Jan 31 -> Feb 28 (2025 is not a leap year): no skip, no duplicate
        let next = next_occurrence(&s, dt(2025, 1, 31, 9, 0, 15)).unwrap();
        assert_eq!(next, dt(2025, 2, 28, 9, 0, 0));

        // And from there on it stays monthly
        let next = next_occurrence(&s, next).unwrap();
        assert_eq!(next, dt(2025, 3, 28, 9, 0, 0));
    }

    #[test]
    fn test_every_x_minutes_advances_from_anchor() {
        let s = Schedule::every_minutes(15, t(9, 0));
        // The base snaps to the anchor time on `from`'s date
        let next = next_occurrence(&s, dt(2025, 3, 10, 9, 0, 22)).unwrap();
        assert_eq!(next, dt(2025, 3, 10, 9, 15, 0));
    }

    #[test]
    fn test_every_x_minutes_requires_interval() {
        let mut s = Schedule::every_minutes(15, t(9, 0));
        s.interval = None;
        assert_eq!(next_occurrence(&s, dt(2025, 3, 10, 9, 0, 0)), None);
    }

    #[test]
    fn test_multiple_times_per_week_floors_spacing() {
        let s = Schedule::multiple_times(Period::Week, 3, t(12, 0));
        // floor(7/3) = 2 day spacing
        let next = next_occurrence(&s, dt(2025, 3, 10, 12, 0, 0)).unwrap();
        assert_eq!(next, dt(2025, 3, 12, 12, 0, 0));
    }

    #[test]
    fn test_multiple_times_per_hour() {
        let s = Schedule::multiple_times(Period::Hour, 4, t(9, 0));
        // floor(60/4) = 15 minute spacing
        let next = next_occurrence(&s, dt(2025, 3, 10, 9, 0, 0)).unwrap();
        assert_eq!(next, dt(2025, 3, 10, 9, 15, 0));
    }

    #[test]
    fn test_multiple_times_per_day() {
        let s = Schedule::multiple_times(Period::Day, 3, t(6, 0));
        // floor(24/3) = 8 hour spacing
        let next = next_occurrence(&s, dt(2025, 3, 10, 6, 0, 0)).unwrap();
        assert_eq!(next, dt(2025, 3, 10, 14, 0, 0));
    }

    #[test]
    fn test_multiple_times_degenerate_count() {
        let s = Schedule::multiple_times(Period::Hour, 0, t(9, 0));
        assert_eq!(next_occurrence(&s, dt(2025, 3, 10, 9, 0, 0)), None);

        // More occurrences than whole units in the span floors to zero
        let s = Schedule::multiple_times(Period::Week, 9, t(9, 0));
        assert_eq!(next_occurrence(&s, dt(2025, 3, 10, 9, 0, 0)), None);
    }

    #[test]
    fn test_missing_time_defaults_to_midnight() {
        let mut s = Schedule::daily(t(8, 0));
        s.time = None;
        let next = next_occurrence(&s, dt(2025, 3, 10, 15, 45, 0)).unwrap();
        assert_eq!(next, dt(2025, 3, 11, 0, 0, 0));
    }
}
