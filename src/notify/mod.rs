//! Notification boundary.
//!
//! Fire-and-forget: the executor publishes lifecycle events and moves on.
//! A notifier that cannot deliver logs the problem and swallows it; a
//! notification failure must never fail or block task execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::Task;

/// Lifecycle events published per task execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    TaskStarted,
    TaskCompleted,
    TaskFailed,
}

impl TaskEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEventKind::TaskStarted => "task_started",
            TaskEventKind::TaskCompleted => "task_completed",
            TaskEventKind::TaskFailed => "task_failed",
        }
    }
}

/// Severity attached to notification content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// The payload delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationContent {
    pub title: String,
    pub message: String,
    pub level: NotifyLevel,
    pub task_id: String,
    pub task_kind: String,
    pub timestamp: DateTime<Utc>,
}

/// Build notification content for a task event.
pub fn notification_content(task: &Task, message: &str, level: NotifyLevel) -> NotificationContent {
    NotificationContent {
        title: format!("Task {}", task.description),
        message: message.to_string(),
        level,
        task_id: task.id.clone(),
        task_kind: task.kind().as_str().to_string(),
        timestamp: Utc::now(),
    }
}

/// A published event with its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNotification {
    pub event: TaskEventKind,
    pub content: NotificationContent,
}

/// Notification sink. `publish` never errors toward the caller.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: TaskEventKind, content: NotificationContent);
}

/// Notifier backed by an mpsc channel, for in-process subscribers.
pub struct ChannelNotifier {
    tx: mpsc::Sender<TaskNotification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end for subscribers.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TaskNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn publish(&self, event: TaskEventKind, content: NotificationContent) {
        let notification = TaskNotification { event, content };
        if let Err(e) = self.tx.try_send(notification) {
            tracing::warn!(error = %e, "Dropping notification, channel unavailable");
        }
    }
}

/// Notifier that writes events to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn publish(&self, event: TaskEventKind, content: NotificationContent) {
        tracing::info!(
            event = event.as_str(),
            task_id = %content.task_id,
            message = %content.message,
            "Notification"
        );
    }
}
