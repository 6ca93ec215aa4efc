//! Queued task notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task id waiting to be claimed, created when a push notification arrives.
///
/// Queued tasks live only in memory; they are lost on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    /// Tracker task id.
    pub task_id: String,
    /// Tracker list/queue the task belongs to.
    pub source_queue_id: String,
    /// When the task was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedTask {
    /// Creates a queued task stamped with the current time.
    pub fn new(task_id: impl Into<String>, source_queue_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            source_queue_id: source_queue_id.into(),
            enqueued_at: Utc::now(),
        }
    }
}
