//! SQLite-backed task repository.
//!
//! Each task is stored as a whole JSON record with a few indexed columns
//! (kind, status, is_active, created_at) for the queries the scheduler
//! actually runs. Updates go through `INSERT OR REPLACE` on the full
//! record, so the JSON column is always the source of truth.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::{Task, TaskStatus};
use crate::error::{Result, SchedrError};
use crate::store::repository::TaskRepository;

/// SQLite repository; the connection is mutex-guarded so the repository
/// can be shared behind an `Arc<dyn TaskRepository>`.
pub struct SqliteTaskRepository {
    db: Mutex<Connection>,
}

impl SqliteTaskRepository {
    /// Open or create the repository under the user's data directory.
    pub fn open() -> Result<Self> {
        let base_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("schedr");
        Self::open_at(&base_dir)
    }

    /// Open or create the repository at the specified directory.
    ///
    /// Useful for testing with custom paths.
    pub fn open_at(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir)?;
        let db_path = base_dir.join("schedr.db");

        let db = Connection::open(&db_path).map_err(storage_err)?;
        Self::init_schema(&db)?;

        Ok(Self { db: Mutex::new(db) })
    }

    /// Initialize the SQLite schema.
    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_kind ON tasks(kind);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_active ON tasks(is_active);
            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);
            "#,
        )
        .map_err(storage_err)?;

        Ok(())
    }

    /// Insert or replace a task record.
    fn save_record(db: &Connection, task: &Task) -> Result<()> {
        let json_data = serde_json::to_string(task)?;

        db.execute(
            r#"
            INSERT OR REPLACE INTO tasks
            (id, kind, status, is_active, created_at, updated_at, json_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                task.id,
                task.kind().as_str(),
                task.status.as_str(),
                task.is_active as i64,
                task.created_at,
                task.updated_at,
                json_data,
            ],
        )
        .map_err(storage_err)?;

        Ok(())
    }

    fn get_record(db: &Connection, id: &str) -> Result<Option<Task>> {
        let result = db.query_row("SELECT json_data FROM tasks WHERE id = ?1", [id], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        });

        match result {
            Ok(json) => {
                let task: Task = serde_json::from_str(&json)?;
                Ok(Some(task))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    fn query_records(db: &Connection, sql: &str) -> Result<Vec<Task>> {
        let mut stmt = db.prepare(sql).map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| {
                let json: String = row.get(0)?;
                Ok(json)
            })
            .map_err(storage_err)?;

        let mut tasks = Vec::new();
        for row in rows {
            let json = row.map_err(storage_err)?;
            let task: Task = serde_json::from_str(&json)?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    /// Load, mutate and replace a record under the connection lock.
    fn with_task<F>(&self, id: &str, f: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let db = self.db.lock().unwrap();
        let mut task =
            Self::get_record(&db, id)?.ok_or_else(|| SchedrError::TaskNotFound(id.to_string()))?;
        f(&mut task);
        task.touch();
        Self::save_record(&db, &task)?;
        Ok(task)
    }
}

fn storage_err(e: rusqlite::Error) -> SchedrError {
    SchedrError::Storage(e.to_string())
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> Result<()> {
        let db = self.db.lock().unwrap();
        Self::save_record(&db, task)
    }

    async fn get(&self, id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        Self::get_record(&db, id)
    }

    async fn find_pending_active(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        Self::query_records(
            &db,
            "SELECT json_data FROM tasks
             WHERE status IN ('pending', 'recurring') AND is_active = 1
             ORDER BY created_at",
        )
    }

    async fn list_all(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        Self::query_records(&db, "SELECT json_data FROM tasks ORDER BY created_at")
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
        })?;
        Ok(())
    }

    async fn set_next_execution(&self, id: &str, next: Option<DateTime<Utc>>) -> Result<()> {
        self.with_task(id, |task| {
            task.next_execution_at = next;
        })?;
        Ok(())
    }

    async fn record_failure(&self, id: &str) -> Result<u32> {
        let task = self.with_task(id, |task| {
            task.failure_count += 1;
        })?;
        Ok(task.failure_count)
    }

    async fn reset_failures(&self, id: &str) -> Result<()> {
        self.with_task(id, |task| {
            task.failure_count = 0;
        })?;
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        self.with_task(id, |task| {
            task.is_active = active;
        })?;
        Ok(())
    }
}
