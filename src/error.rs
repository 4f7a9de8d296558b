//! Error types for schedr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in schedr
#[derive(Debug, Error)]
pub enum SchedrError {
    /// Task not found in the repository
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Schedule is missing a field its frequency requires
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Content generation error
    #[error("Content error: {0}")]
    Content(String),

    /// Task execution exceeded its deadline
    #[error("Execution timed out after {0}ms")]
    Timeout(u64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for schedr operations
pub type Result<T> = std::result::Result<T, SchedrError>;
