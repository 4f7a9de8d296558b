//! Scheduling engine: decides what runs, when, and with how much
//! parallelism.
//!
//! - **due**: pure predicate deciding whether a schedule fires now.
//! - **recurrence**: pure next-occurrence arithmetic per frequency class.
//! - **priority**: policy-table scoring for queue ordering.
//! - **queue**: per-tick plan builder (filter, score, window, sort).
//! - **executor**: bounded-parallelism execution with single-flight locking.
//! - **manager**: the timer-driven tick loop with start/stop/trigger.
//!
//! # Architecture
//!
//! Data flows one way per tick: repository snapshot -> due predicate ->
//! priority scorer -> windowed queue -> executor -> repository. The pure
//! leaves never touch I/O; the executor owns every mutation.

mod due;
mod executor;
mod manager;
mod priority;
mod queue;
mod recurrence;

pub use due::{DUE_TOLERANCE_SECS, is_due};
pub use executor::{ExecOutcome, Executor, ExecutorConfig, InflightGuard, InflightSet};
pub use manager::{SchedulerConfig, TaskScheduler};
pub use priority::{
    FREQ_DAILY, FREQ_EVERY_X_MINUTES, FREQ_HOURLY, FREQ_MONTHLY, FREQ_WEEKLY, KIND_FETCH,
    KIND_LEARNING, KIND_REMINDER, KIND_SUMMARY, OVERDUE_BASE, OVERDUE_CAP, PriorityConfig, score,
};
pub use queue::{EXECUTION_WINDOW_SECS, QueueItem, build_queue};
pub use recurrence::next_occurrence;
