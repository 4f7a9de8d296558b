//! Storage layer for schedr.
//!
//! The engine depends only on the `TaskRepository` trait. The daemon runs
//! on the SQLite implementation; tests and embedders can use the in-memory
//! one.

mod repository;
mod sqlite;

pub use repository::{MemoryTaskRepository, TaskRepository};
pub use sqlite::SqliteTaskRepository;
