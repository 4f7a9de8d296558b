//! Schedule value object: the recurrence rule attached to a task.
//!
//! A schedule pairs a frequency class with the anchors that class needs
//! (time-of-day, calendar date, interval, occurrence count). The due
//! predicate and recurrence calculator in `crate::scheduler` interpret it;
//! this module only defines the shape and the per-class constructors.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Recurrence frequency class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Single run on a specific date, terminal afterwards
    Once,
    /// Every hour at a fixed minute
    Hourly,
    /// Every day at a fixed time
    Daily,
    /// Every week at a fixed time
    Weekly,
    /// Every calendar month at a fixed time
    Monthly,
    /// Fixed minute interval, aligned to the anchor time
    EveryXMinutes,
    /// N occurrences spread evenly over a period
    MultipleTimes,
}

impl Frequency {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::EveryXMinutes => "every_x_minutes",
            Frequency::MultipleTimes => "multiple_times",
        }
    }

    /// Check if this frequency reschedules after a run.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Frequency::Once)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Span that `multiple_times` occurrences are spread over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
}

/// Occurrence count per period for `multiple_times` schedules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimesPer {
    pub per: Period,
    pub count: u32,
}

/// The recurrence rule attached to a task.
///
/// Fields a frequency does not use stay `None`. A schedule missing a field
/// its frequency requires is malformed; the due predicate treats it as
/// never due rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    /// Recurrence class
    pub frequency: Frequency,

    /// Wall-clock anchor time (HH:mm, seconds zero)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,

    /// Day-of-week qualifier for weekly schedules (intent-layer hint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,

    /// Calendar date: required for `once`, creation anchor otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Minute interval for `every_x_minutes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,

    /// Occurrence count per period for `multiple_times`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<TimesPer>,
}

impl Schedule {
    fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            time: None,
            day: None,
            date: None,
            interval: None,
            times: None,
        }
    }

    /// One-shot schedule on a specific date and time.
    pub fn once(date: NaiveDate, time: NaiveTime) -> Self {
        let mut s = Self::new(Frequency::Once);
        s.date = Some(date);
        s.time = Some(time);
        s
    }

    /// Hourly schedule firing at the anchor's minute.
    pub fn hourly(time: NaiveTime) -> Self {
        let mut s = Self::new(Frequency::Hourly);
        s.time = Some(time);
        s
    }

    /// Daily schedule at a fixed time.
    pub fn daily(time: NaiveTime) -> Self {
        let mut s = Self::new(Frequency::Daily);
        s.time = Some(time);
        s
    }

    /// Weekly schedule at a fixed time, with an optional day hint.
    pub fn weekly(time: NaiveTime, day: Option<&str>) -> Self {
        let mut s = Self::new(Frequency::Weekly);
        s.time = Some(time);
        s.day = day.map(|d| d.to_string());
        s
    }

    /// Monthly schedule at a fixed time.
    pub fn monthly(time: NaiveTime) -> Self {
        let mut s = Self::new(Frequency::Monthly);
        s.time = Some(time);
        s
    }

    /// Interval schedule: every `interval` minutes, aligned to the anchor time.
    pub fn every_minutes(interval: u32, anchor: NaiveTime) -> Self {
        let mut s = Self::new(Frequency::EveryXMinutes);
        s.interval = Some(interval);
        s.time = Some(anchor);
        s
    }

    /// `count` occurrences spread evenly over `per`.
    pub fn multiple_times(per: Period, count: u32, anchor: NaiveTime) -> Self {
        let mut s = Self::new(Frequency::MultipleTimes);
        s.times = Some(TimesPer { per, count });
        s.time = Some(anchor);
        s
    }
}
