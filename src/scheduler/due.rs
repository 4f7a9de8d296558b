//! Due-ness predicate: decides whether a task's schedule indicates it
//! should run at the current instant.
//!
//! Pure and deterministic given its inputs. All comparisons tolerate a
//! fixed ±30 second band to absorb polling jitter. A schedule missing a
//! field its frequency requires is treated as never due, so one corrupt
//! task cannot halt the scan of the rest.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::domain::{Frequency, Schedule};

/// Tolerance band around scheduled instants, in seconds.
/// Fixed design constant, not configurable per task.
pub const DUE_TOLERANCE_SECS: i64 = 30;

/// Check whether `schedule` is due at `now`.
///
/// `last_execution` is the timestamp of the most recent run, used for the
/// per-frequency anti-duplicate rules.
pub fn is_due(
    schedule: &Schedule,
    now: DateTime<Utc>,
    last_execution: Option<DateTime<Utc>>,
) -> bool {
    let Some(time) = schedule.time else {
        return false;
    };

    let now_ssm = now.time().num_seconds_from_midnight() as i64;
    let sched_ssm = time.num_seconds_from_midnight() as i64;

    match schedule.frequency {
        // Date must match and the time-of-day must be inside the band.
        Frequency::Once => match schedule.date {
            Some(date) => date == now.date_naive() && within_band(now_ssm, sched_ssm),
            None => false,
        },

        // Minute-of-hour match, date-independent.
        Frequency::Hourly => {
            let now_soh = (now.minute() * 60 + now.second()) as i64;
            let sched_soh = (time.minute() * 60) as i64;
            within_band(now_soh, sched_soh)
        }

        // The interval must have elapsed since the last run and the current
        // time-of-day must sit on an interval boundary relative to the anchor.
        Frequency::EveryXMinutes => {
            let Some(interval) = schedule.interval.filter(|i| *i > 0) else {
                return false;
            };
            let elapsed_ok = match last_execution {
                Some(last) => (now - last).num_minutes() >= interval as i64,
                None => true,
            };
            let bucket = interval as i64 * 60;
            elapsed_ok && within_band(now_ssm % bucket, sched_ssm % bucket)
        }

        // Time window match, at most once per calendar date.
        Frequency::Daily => {
            let ran_today =
                last_execution.is_some_and(|last| last.date_naive() == now.date_naive());
            within_band(now_ssm, sched_ssm) && !ran_today
        }

        // Anti-duplicate keyed on the last run's weekday: fires only on the
        // weekday the task last ran, so it needs a seeding first run.
        Frequency::Weekly => {
            let day_matches = last_execution.is_some_and(|last| last.weekday() == now.weekday());
            within_band(now_ssm, sched_ssm) && day_matches
        }

        // Same pattern as weekly, keyed on day-of-month.
        Frequency::Monthly => {
            let day_matches = last_execution.is_some_and(|last| last.day() == now.day());
            within_band(now_ssm, sched_ssm) && day_matches
        }

        // Not reachable via the due scan; occurrences for this class are
        // driven purely by the recurrence calculator.
        Frequency::MultipleTimes => false,
    }
}

fn within_band(a: i64, b: i64) -> bool {
    (a - b).abs() <= DUE_TOLERANCE_SECS
}
