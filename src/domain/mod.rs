//! Domain types for schedr.
//!
//! `Task` is the unit of schedulable work; `Schedule` is the recurrence
//! rule attached to it. Both serialize as whole JSON records.

mod schedule;
mod task;

pub use schedule::{Frequency, Period, Schedule, TimesPer};
pub use task::{
    LearningSource, Task, TaskKind, TaskParameters, TaskStatus, generate_task_id, now_ms,
};
