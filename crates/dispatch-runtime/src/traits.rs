//! Collaborator contracts.
//!
//! Workers never talk to a concrete tracker or agent CLI; they go through
//! these traits so the same lifecycle runs against ClickUp in production and
//! against in-memory doubles in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_models::{GetTasksOptions, Task};

use crate::error::CollaboratorError;

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Issue tracker access.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Fetches a single task.
    async fn get_task(&self, task_id: &str) -> CollaboratorResult<Task>;

    /// Lists the tasks of a source queue.
    async fn get_tasks(
        &self,
        queue_id: &str,
        options: &GetTasksOptions,
    ) -> CollaboratorResult<Vec<Task>>;

    /// Sets the status of a task.
    async fn update_task_status(&self, task_id: &str, status: &str) -> CollaboratorResult<()>;

    /// Moves a task to another queue.
    async fn move_task_to_list(&self, task_id: &str, queue_id: &str) -> CollaboratorResult<()>;
}

/// What the invoker reports after launching an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResult {
    /// Directory the agent was started in.
    pub work_dir: String,
    /// Prompt handed to the agent.
    pub prompt: String,
    /// Launch time.
    pub started_at: DateTime<Utc>,
}

impl InvokeResult {
    /// Creates a result stamped with the current time.
    pub fn new(work_dir: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            prompt: prompt.into(),
            started_at: Utc::now(),
        }
    }
}

/// Launches an AI agent in planning mode.
///
/// Implementations must return once the agent has been started; the agent's
/// end is observed later through lifecycle hooks.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Starts an agent in `work_dir` with `prompt`, tagged with `worker_id`.
    async fn invoke_plan(
        &self,
        work_dir: &str,
        prompt: &str,
        worker_id: &str,
    ) -> CollaboratorResult<InvokeResult>;
}

/// Turns a task into an agent prompt.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Renders the prompt for `task`.
    async fn format(&self, task: &Task) -> CollaboratorResult<String>;
}

/// Chat notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts `content` to `channel`.
    async fn post_message(&self, channel: &str, content: &str) -> CollaboratorResult<()>;
}
