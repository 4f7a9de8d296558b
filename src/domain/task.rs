//! Task record: the unit of schedulable work.
//!
//! A task pairs a kind-specific parameter set with an optional recurrence
//! schedule and a lifecycle status. The whole record serializes to JSON;
//! the repository persists it as-is and indexes a few columns for queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::schedule::Schedule;

/// Task kind, derived from the parameters variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Reminder,
    Summary,
    Fetch,
    Learning,
}

impl TaskKind {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Reminder => "reminder",
            TaskKind::Summary => "summary",
            TaskKind::Fetch => "fetch",
            TaskKind::Learning => "learning",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task lifecycle state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for its first run
    Pending,
    /// Currently executing
    Running,
    /// Finished a run, waiting for the next occurrence
    Recurring,
    /// One-shot task finished
    Completed,
    /// Unrecoverable error or failure cap reached
    Failed,
}

impl TaskStatus {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Recurring => "recurring",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Check if a task in this status is eligible for the pending scan.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Recurring)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External resource attached to a learning task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningSource {
    pub name: String,
    pub url: String,
}

/// Kind-specific task parameters.
///
/// Tagged by kind so the executor and content generator branch on a real
/// enum instead of an untyped bag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskParameters {
    Reminder {
        target: String,
    },
    Summary {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Fetch {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },
    Learning {
        topic: String,
        #[serde(default)]
        difficulty: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sources: Vec<LearningSource>,
    },
}

impl TaskParameters {
    /// The kind this parameter set belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskParameters::Reminder { .. } => TaskKind::Reminder,
            TaskParameters::Summary { .. } => TaskKind::Summary,
            TaskParameters::Fetch { .. } => TaskKind::Fetch,
            TaskParameters::Learning { .. } => TaskKind::Learning,
        }
    }
}

/// The task record persisted by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Timestamp-based ID, immutable
    pub id: String,

    /// Human-readable label
    pub description: String,

    /// Kind-specific parameters; `Task::kind()` derives from the variant
    pub params: TaskParameters,

    /// Recurrence rule; `None` only for ad-hoc non-recurring runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// Timestamp of the most recent run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution_at: Option<DateTime<Utc>>,

    /// Next planned run for recurring tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_execution_at: Option<DateTime<Utc>>,

    /// Soft-delete flag; inactive tasks never enter the pending scan
    pub is_active: bool,

    /// Consecutive failed runs since the last success
    #[serde(default)]
    pub failure_count: u32,

    /// Last generated payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_result: Option<String>,

    /// Unix timestamp in milliseconds
    pub created_at: i64,

    /// Unix timestamp in milliseconds
    pub updated_at: i64,
}

impl Task {
    /// Create a new pending task.
    pub fn new(description: &str, params: TaskParameters, schedule: Option<Schedule>) -> Self {
        let now = now_ms();
        Self {
            id: generate_task_id(),
            description: description.to_string(),
            params,
            schedule,
            status: TaskStatus::Pending,
            last_execution_at: None,
            next_execution_at: None,
            is_active: true,
            failure_count: 0,
            preview_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new reminder task.
    pub fn new_reminder(description: &str, target: &str, schedule: Option<Schedule>) -> Self {
        Self::new(
            description,
            TaskParameters::Reminder {
                target: target.to_string(),
            },
            schedule,
        )
    }

    /// Create a new summary task.
    pub fn new_summary(description: &str, target: &str, schedule: Option<Schedule>) -> Self {
        Self::new(
            description,
            TaskParameters::Summary {
                target: target.to_string(),
                source: None,
                format: None,
            },
            schedule,
        )
    }

    /// Create a new fetch task.
    pub fn new_fetch(description: &str, target: &str, schedule: Option<Schedule>) -> Self {
        Self::new(
            description,
            TaskParameters::Fetch {
                target: target.to_string(),
                count: None,
            },
            schedule,
        )
    }

    /// Create a new learning task.
    pub fn new_learning(description: &str, topic: &str, schedule: Option<Schedule>) -> Self {
        Self::new(
            description,
            TaskParameters::Learning {
                topic: topic.to_string(),
                difficulty: "beginner".to_string(),
                sources: Vec::new(),
            },
            schedule,
        )
    }

    /// The kind this task routes through.
    pub fn kind(&self) -> TaskKind {
        self.params.kind()
    }

    /// Update the timestamp to now.
    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}

/// Generate a unique task ID based on timestamp with sub-second precision.
///
/// Format: seconds + microseconds suffix (e.g., "1737802800123456")
/// This ensures uniqueness even when creating multiple records per second.
pub fn generate_task_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards");

    let secs = duration.as_secs();
    let micros = duration.subsec_micros();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("{}{:06}{:04}", secs, micros, counter % 10000)
}

/// Get current time in milliseconds since epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
