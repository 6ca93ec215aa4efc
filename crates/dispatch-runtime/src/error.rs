//! Error types for the runtime crate.

use thiserror::Error;

/// Failure reported by an external collaborator (tracker, invoker,
/// formatter, notifier).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Transport-level failure (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The remote API answered with a non-success status.
    #[error("api error (status {status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The requested task does not exist.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The agent process could not be launched.
    #[error("launch failed: {0}")]
    Launch(String),

    /// The collaborator is missing required configuration.
    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Errors that can occur in worker lifecycle operations.
///
/// Every variant carries the worker slot id (and task id where one exists)
/// so a log line alone identifies what failed.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker already holds a claim.
    #[error("[{worker_id}] busy with task {current_task_id}")]
    Busy {
        worker_id: String,
        current_task_id: String,
    },

    /// Fetching the task or moving it to the working status failed.
    /// No agent was launched and the worker is idle.
    #[error("[{worker_id}] claim of task {task_id} failed: {source}")]
    Claim {
        worker_id: String,
        task_id: String,
        source: CollaboratorError,
    },

    /// The agent launch failed after the tracker status had already been
    /// changed, and the claim was kept. Nothing is running for this task.
    #[error("[{worker_id}] agent launch for task {task_id} failed after claim; worker left processing: {source}")]
    StuckClaim {
        worker_id: String,
        task_id: String,
        source: CollaboratorError,
    },

    /// The agent launch failed and the claim was rolled back.
    #[error("[{worker_id}] agent launch for task {task_id} failed; claim rolled back: {source}")]
    Invocation {
        worker_id: String,
        task_id: String,
        source: CollaboratorError,
    },

    /// Completion was requested while idle.
    #[error("[{worker_id}] no task in progress")]
    NoTaskInProgress { worker_id: String },

    /// Setting the completed status failed. The claim is kept.
    #[error("[{worker_id}] completing task {task_id} failed: {source}")]
    Completion {
        worker_id: String,
        task_id: String,
        source: CollaboratorError,
    },

    /// The completed status was set but moving the task to the destination
    /// queue failed. The claim is kept so a repeated completion retries.
    #[error("[{worker_id}] moving task {task_id} to {destination} failed: {source}")]
    Move {
        worker_id: String,
        task_id: String,
        destination: String,
        source: CollaboratorError,
    },

    /// Reverting the tracker status failed. The worker is idle regardless.
    #[error("[{worker_id}] rollback of task {task_id} failed: {source}")]
    Rollback {
        worker_id: String,
        task_id: String,
        source: CollaboratorError,
    },
}

impl WorkerError {
    /// Returns the worker slot id this error belongs to.
    pub fn worker_id(&self) -> &str {
        match self {
            WorkerError::Busy { worker_id, .. }
            | WorkerError::Claim { worker_id, .. }
            | WorkerError::StuckClaim { worker_id, .. }
            | WorkerError::Invocation { worker_id, .. }
            | WorkerError::NoTaskInProgress { worker_id }
            | WorkerError::Completion { worker_id, .. }
            | WorkerError::Move { worker_id, .. }
            | WorkerError::Rollback { worker_id, .. } => worker_id,
        }
    }

    /// Returns true if this error left a claim with no running agent.
    pub fn is_stuck_claim(&self) -> bool {
        matches!(self, WorkerError::StuckClaim { .. })
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
