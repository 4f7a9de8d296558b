//! Task repository trait and the in-memory implementation.
//!
//! The engine only ever sees this trait; the SQLite implementation in
//! `sqlite.rs` backs the daemon, the in-memory one backs tests and
//! embedders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Task, TaskStatus};
use crate::error::{Result, SchedrError};

/// Persistence boundary for task records.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task.
    async fn create(&self, task: &Task) -> Result<()>;

    /// Fetch a task by id.
    async fn get(&self, id: &str) -> Result<Option<Task>>;

    /// Snapshot of active tasks in a schedulable status.
    async fn find_pending_active(&self) -> Result<Vec<Task>>;

    /// List every task, newest last.
    async fn list_all(&self) -> Result<Vec<Task>>;

    /// Update a task's status, optionally stamping the last execution
    /// timestamp and the generated preview text.
    async fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
        last_execution: Option<DateTime<Utc>>,
        preview: Option<&str>,
    ) -> Result<()>;

    /// Set or clear the next planned occurrence.
    async fn set_next_execution(&self, id: &str, next: Option<DateTime<Utc>>) -> Result<()>;

    /// Increment the consecutive-failure counter, returning the new count.
    async fn record_failure(&self, id: &str) -> Result<u32>;

    /// Reset the consecutive-failure counter after a successful run.
    async fn reset_failures(&self, id: &str) -> Result<()>;

    /// Soft-delete (or restore) a task.
    async fn set_active(&self, id: &str, active: bool) -> Result<()>;
}

/// In-memory repository backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryTaskRepository {
    tasks: Mutex<HashMap<String, Task>>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_task<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| SchedrError::TaskNotFound(id.to_string()))?;
        f(task);
        task.touch();
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn create(&self, task: &Task) -> Result<()> {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.lock().unwrap().get(id).cloned())
    }

    async fn find_pending_active(&self) -> Result<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        let mut pending: Vec<Task> = tasks
            .values()
            .filter(|t| t.is_active && t.status.is_schedulable())
            .cloned()
            .collect();
        pending.sort_by_key(|t| t.created_at);
        Ok(pending)
    }

    async fn list_all(&self) -> Result<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        let mut all: Vec<Task> = tasks.values().cloned().collect();
        all.sort_by_key(|t| t.created_at);
        Ok(all)
    }

    async fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
        last_execution: Option<DateTime<Utc>>,
        preview: Option<&str>,
    ) -> Result<()> {
        self.with_task(id, |task| {
            task.status = status;
            if let Some(at) = last_execution {
                task.last_execution_at = Some(at);
            }
            if let Some(text) = preview {
                task.preview_result = Some(text.to_string());
            }
        })
    }

    async fn set_next_execution(&self, id: &str, next: Option<DateTime<Utc>>) -> Result<()> {
        self.with_task(id, |task| {
            task.next_execution_at = next;
        })
    }

    async fn record_failure(&self, id: &str) -> Result<u32> {
        let mut count = 0;
        self.with_task(id, |task| {
            task.failure_count += 1;
            count = task.failure_count;
        })?;
        Ok(count)
    }

    async fn reset_failures(&self, id: &str) -> Result<()> {
        self.with_task(id, |task| {
            task.failure_count = 0;
        })
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        self.with_task(id, |task| {
            task.is_active = active;
        })
    }
}
