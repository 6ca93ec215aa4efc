//! Error types for task queue operations.

use thiserror::Error;

/// Errors that can occur during task queue operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The shutdown signal fired before a task became available.
    #[error("dequeue cancelled")]
    Cancelled,

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for task queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
