//! Scheduling queue builder: turns the pending-task snapshot into an
//! ordered, windowed execution plan for one tick.
//!
//! Per tick: filter the snapshot through the due predicate, compute each
//! due task's nominal scheduled instant, priority score and execution
//! window, sort by score (scheduled instant breaks ties), and keep only
//! the items whose window contains the current instant. Everything else
//! stays pending and is re-evaluated next tick.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::domain::{Frequency, Schedule, Task};
use crate::scheduler::due::is_due;
use crate::scheduler::priority::PriorityConfig;

/// Half-width of the execution window around the scheduled instant,
/// in seconds. Fixed engine constant.
pub const EXECUTION_WINDOW_SECS: i64 = 30;

/// One entry of the per-tick execution plan.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub task: Task,
    pub priority: i64,
    pub scheduled_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl QueueItem {
    /// Check whether `now` falls inside this item's execution window.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.window_start <= now && now <= self.window_end
    }
}

/// Build the ordered execution plan for one tick.
pub fn build_queue(tasks: Vec<Task>, now: DateTime<Utc>, config: &PriorityConfig) -> Vec<QueueItem> {
    let mut queue: Vec<QueueItem> = tasks
        .into_iter()
        .filter(|task| task.is_active && task.status.is_schedulable())
        .filter_map(|task| {
            let schedule = task.schedule.clone()?;
            if !is_due(&schedule, now, task.last_execution_at) {
                return None;
            }
            let scheduled_at = nominal_scheduled_at(&schedule, now)?;
            let window = Duration::seconds(EXECUTION_WINDOW_SECS);
            let priority = config.score(&task, scheduled_at, now);
            Some(QueueItem {
                task,
                priority,
                scheduled_at,
                window_start: scheduled_at - window,
                window_end: scheduled_at + window,
            })
        })
        .collect();

    queue.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.scheduled_at.cmp(&b.scheduled_at))
    });

    queue.retain(|item| item.in_window(now));
    queue
}

/// The nominal scheduled instant of the schedule's current occurrence.
///
/// For interval schedules this is the most recent interval-aligned boundary
/// at or before `now` relative to the anchor time, so the execution window
/// tracks the occurrence the due predicate matched rather than the anchor.
fn nominal_scheduled_at(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let time = schedule.time?;
    let today = now.date_naive();

    match schedule.frequency {
        Frequency::Once => Some(schedule.date?.and_time(time).and_utc()),
        Frequency::Hourly => {
            let at = time.with_hour(now.hour())?;
            Some(today.and_time(at).and_utc())
        }
        Frequency::EveryXMinutes => {
            let interval = schedule.interval.filter(|i| *i > 0)?;
            let bucket = interval as i64 * 60;
            let now_ssm = now.time().num_seconds_from_midnight() as i64;
            let anchor_ssm = time.num_seconds_from_midnight() as i64;
            let occurrence_ssm = anchor_ssm + (now_ssm - anchor_ssm).div_euclid(bucket) * bucket;
            let midnight = today.and_time(chrono::NaiveTime::MIN).and_utc();
            Some(midnight + Duration::seconds(occurrence_ssm))
        }
        Frequency::Daily | Frequency::Weekly | Frequency::Monthly => {
            Some(today.and_time(time).and_utc())
        }
        Frequency::MultipleTimes => None,
    }
}
