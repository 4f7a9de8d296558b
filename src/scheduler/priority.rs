//! Priority calculation for due tasks.
//!
//! Tasks are scored by:
//! - Overdue bonus (1000 + seconds overdue, capped at 2000)
//! - Kind weight (reminder > summary > learning > fetch)
//! - Frequency weight (tighter cadence = higher weight)
//!
//! Scores only order the execution queue; due-ness is decided elsewhere.

use chrono::{DateTime, Utc};

use crate::domain::{Frequency, Task, TaskKind};

/// Bonus floor applied the moment a task's scheduled instant is past.
pub const OVERDUE_BASE: i64 = 1000;
/// Overdue bonus cap.
pub const OVERDUE_CAP: i64 = 2000;

/// Kind weights. Higher = dispatched first.
pub const KIND_REMINDER: i64 = 100;
pub const KIND_SUMMARY: i64 = 50;
pub const KIND_LEARNING: i64 = 30;
pub const KIND_FETCH: i64 = 20;

/// Frequency weights, decreasing with period length.
pub const FREQ_HOURLY: i64 = 200;
pub const FREQ_EVERY_X_MINUTES: i64 = 150;
pub const FREQ_DAILY: i64 = 100;
pub const FREQ_WEEKLY: i64 = 50;
pub const FREQ_MONTHLY: i64 = 25;

/// Priority policy table. The weights are data, not law; callers can tune
/// them without touching the scorer.
#[derive(Debug, Clone)]
pub struct PriorityConfig {
    pub overdue_base: i64,
    pub overdue_cap: i64,
    pub reminder: i64,
    pub summary: i64,
    pub learning: i64,
    pub fetch: i64,
    pub hourly: i64,
    pub every_x_minutes: i64,
    pub daily: i64,
    pub weekly: i64,
    pub monthly: i64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            overdue_base: OVERDUE_BASE,
            overdue_cap: OVERDUE_CAP,
            reminder: KIND_REMINDER,
            summary: KIND_SUMMARY,
            learning: KIND_LEARNING,
            fetch: KIND_FETCH,
            hourly: FREQ_HOURLY,
            every_x_minutes: FREQ_EVERY_X_MINUTES,
            daily: FREQ_DAILY,
            weekly: FREQ_WEEKLY,
            monthly: FREQ_MONTHLY,
        }
    }
}

impl PriorityConfig {
    /// Weight for a task kind with this config.
    pub fn kind_weight(&self, kind: TaskKind) -> i64 {
        match kind {
            TaskKind::Reminder => self.reminder,
            TaskKind::Summary => self.summary,
            TaskKind::Learning => self.learning,
            TaskKind::Fetch => self.fetch,
        }
    }

    /// Weight for a frequency class with this config.
    ///
    /// `once` and `multiple_times` carry no cadence urgency.
    pub fn frequency_weight(&self, frequency: Frequency) -> i64 {
        match frequency {
            Frequency::Hourly => self.hourly,
            Frequency::EveryXMinutes => self.every_x_minutes,
            Frequency::Daily => self.daily,
            Frequency::Weekly => self.weekly,
            Frequency::Monthly => self.monthly,
            Frequency::Once | Frequency::MultipleTimes => 0,
        }
    }

    /// Score a due task for queue ordering.
    ///
    /// `scheduled_at` is the nominal scheduled instant of the current
    /// occurrence, as computed by the queue builder.
    pub fn score(&self, task: &Task, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let mut priority = 0;

        let seconds_overdue = (now - scheduled_at).num_seconds();
        if seconds_overdue > 0 {
            priority += (self.overdue_base + seconds_overdue).min(self.overdue_cap);
        }

        priority += self.kind_weight(task.kind());

        if let Some(schedule) = &task.schedule {
            priority += self.frequency_weight(schedule.frequency);
        }

        priority
    }
}

/// Score a task with the default policy table.
pub fn score(task: &Task, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    PriorityConfig::default().score(task, scheduled_at, now)
}
