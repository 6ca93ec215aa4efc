//! Worker slots.
//!
//! A [`Worker`] owns one source queue and one working directory and holds at
//! most one claimed task at a time. The claim lives in a `std::sync::Mutex`
//! that is never held across an `.await`; tracker and agent calls happen
//! outside the lock.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dispatch_models::{GetTasksOptions, Task, WorkerConfig};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::{InvokeFailurePolicy, RuntimeConfig};
use crate::error::{CollaboratorError, Result, WorkerError};
use crate::event::WorkerEvent;
use crate::traits::{CollaboratorResult, Formatter, Invoker, TrackerClient};

/// The task a worker is currently processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    /// Tracker task id.
    pub task_id: String,
    /// Task name at claim time.
    pub task_name: String,
    /// Issue key found in the description, if any.
    pub external_ref: Option<String>,
    /// Status the task had before it was claimed. `None` if the tracker
    /// reported no status, in which case a rollback only clears local state.
    pub original_status: Option<String>,
}

impl Claim {
    /// Builds a claim from a freshly fetched task.
    pub fn from_task(task: &Task) -> Self {
        let status = task.status_name().trim();
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            external_ref: task.external_ref(),
            original_status: if status.is_empty() {
                None
            } else {
                Some(status.to_string())
            },
        }
    }
}

/// Point-in-time view of a worker, for status endpoints and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSnapshot {
    pub id: String,
    pub source_queue_id: String,
    pub src_path: String,
    pub processing: bool,
    pub claim: Option<Claim>,
}

/// External services a worker talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub tracker: Arc<dyn TrackerClient>,
    pub invoker: Arc<dyn Invoker>,
    /// Optional prompt formatter. Without one, or when it fails, the
    /// built-in prompt is used.
    pub formatter: Option<Arc<dyn Formatter>>,
}

impl Collaborators {
    pub fn new(tracker: Arc<dyn TrackerClient>, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            tracker,
            invoker,
            formatter: None,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("formatter", &self.formatter.is_some())
            .finish_non_exhaustive()
    }
}

/// Renders the prompt used when no formatter is configured or it fails.
pub fn fallback_prompt(task: &Task) -> String {
    format!("# {}\n\n{}\n\nLink: {}", task.name, task.description, task.url)
}

/// A worker slot.
pub struct Worker {
    config: WorkerConfig,
    runtime: Arc<RuntimeConfig>,
    collaborators: Collaborators,
    claim: Mutex<Option<Claim>>,
    events: broadcast::Sender<WorkerEvent>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("config", &self.config)
            .field("claim", &self.current_claim())
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Creates an idle worker. Lifecycle events go to `events`.
    pub fn new(
        config: WorkerConfig,
        runtime: Arc<RuntimeConfig>,
        collaborators: Collaborators,
        events: broadcast::Sender<WorkerEvent>,
    ) -> Self {
        Self {
            config,
            runtime,
            collaborators,
            claim: Mutex::new(None),
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn source_queue_id(&self) -> &str {
        &self.config.source_queue_id
    }

    pub fn src_path(&self) -> &str {
        &self.config.src_path
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Returns true while a claim is held.
    pub fn is_processing(&self) -> bool {
        self.slot().is_some()
    }

    pub fn current_claim(&self) -> Option<Claim> {
        self.slot().clone()
    }

    pub fn current_task_id(&self) -> Option<String> {
        self.slot().as_ref().map(|c| c.task_id.clone())
    }

    pub fn current_task_name(&self) -> Option<String> {
        self.slot().as_ref().map(|c| c.task_name.clone())
    }

    pub fn current_external_ref(&self) -> Option<String> {
        self.slot().as_ref().and_then(|c| c.external_ref.clone())
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        let claim = self.current_claim();
        WorkerSnapshot {
            id: self.config.id.clone(),
            source_queue_id: self.config.source_queue_id.clone(),
            src_path: self.config.src_path.clone(),
            processing: claim.is_some(),
            claim,
        }
    }

    /// Lists the claimable tasks of this worker's source queue, oldest
    /// first, with terminal statuses removed.
    pub async fn pending_tasks(&self) -> CollaboratorResult<Vec<Task>> {
        let tasks = self
            .collaborators
            .tracker
            .get_tasks(&self.config.source_queue_id, &GetTasksOptions::oldest_first())
            .await?;

        Ok(tasks
            .into_iter()
            .filter(|t| !self.runtime.is_terminal_status(t.status_name()))
            .collect())
    }

    /// Claims `task_id` and launches a planning agent for it.
    ///
    /// On success the tracker shows the working status, the agent has been
    /// started in this worker's directory, and the worker is processing.
    pub async fn process_task(&self, task_id: &str) -> Result<()> {
        if let Some(current) = self.current_task_id() {
            return Err(self.busy(current));
        }

        info!(worker = %self.config.id, task_id, "Claiming task");

        let task = match self.collaborators.tracker.get_task(task_id).await {
            Ok(task) => task,
            Err(e) => return Err(self.claim_failed(task_id, e)),
        };

        let claim = Claim::from_task(&task);
        self.try_claim(claim.clone())?;

        if let Err(e) = self
            .collaborators
            .tracker
            .update_task_status(task_id, &self.runtime.status_working)
            .await
        {
            self.release(task_id);
            return Err(self.claim_failed(task_id, e));
        }

        let prompt = self.build_prompt(&task).await;

        match self
            .collaborators
            .invoker
            .invoke_plan(&self.config.src_path, &prompt, &self.config.id)
            .await
        {
            Ok(result) => {
                info!(
                    worker = %self.config.id,
                    task_id,
                    task_name = %claim.task_name,
                    work_dir = %result.work_dir,
                    "Agent launched"
                );
                self.emit(WorkerEvent::TaskClaimed {
                    worker_id: self.config.id.clone(),
                    claim,
                });
                Ok(())
            }
            Err(e) => self.invoke_failed(task_id, e).await,
        }
    }

    /// Marks the current task completed and releases the claim.
    ///
    /// Sets the completed status and, when a completed queue is configured,
    /// moves the task there. If either tracker call fails the claim is kept
    /// so a repeated completion can retry. Returns the released claim.
    pub async fn complete_task(&self) -> Result<Claim> {
        let claim = self
            .current_claim()
            .ok_or_else(|| WorkerError::NoTaskInProgress {
                worker_id: self.config.id.clone(),
            })?;

        self.collaborators
            .tracker
            .update_task_status(&claim.task_id, &self.runtime.status_completed)
            .await
            .map_err(|source| WorkerError::Completion {
                worker_id: self.config.id.clone(),
                task_id: claim.task_id.clone(),
                source,
            })?;

        if let Some(destination) = &self.runtime.completed_queue_id {
            self.collaborators
                .tracker
                .move_task_to_list(&claim.task_id, destination)
                .await
                .map_err(|source| WorkerError::Move {
                    worker_id: self.config.id.clone(),
                    task_id: claim.task_id.clone(),
                    destination: destination.clone(),
                    source,
                })?;
        }

        self.release(&claim.task_id);
        info!(
            worker = %self.config.id,
            task_id = %claim.task_id,
            task_name = %claim.task_name,
            "Task completed"
        );
        self.emit(WorkerEvent::TaskCompleted {
            worker_id: self.config.id.clone(),
            claim: claim.clone(),
        });

        Ok(claim)
    }

    /// Reverts the current task to its original status and releases the
    /// claim.
    ///
    /// The claim is released whatever the tracker answers; a failed revert
    /// is returned as [`WorkerError::Rollback`]. Idle workers return `Ok`.
    pub async fn rollback_status(&self) -> Result<()> {
        let Some(claim) = self.current_claim() else {
            debug!(worker = %self.config.id, "Nothing to roll back");
            return Ok(());
        };

        let outcome = match &claim.original_status {
            Some(original) => self
                .collaborators
                .tracker
                .update_task_status(&claim.task_id, original)
                .await
                .map_err(|source| WorkerError::Rollback {
                    worker_id: self.config.id.clone(),
                    task_id: claim.task_id.clone(),
                    source,
                }),
            None => Ok(()),
        };

        self.release(&claim.task_id);

        match &outcome {
            Ok(()) => info!(
                worker = %self.config.id,
                task_id = %claim.task_id,
                restored = claim.original_status.as_deref().unwrap_or(""),
                "Claim rolled back"
            ),
            Err(e) => warn!(worker = %self.config.id, error = %e, "Claim released without status revert"),
        }
        self.emit(WorkerEvent::TaskRolledBack {
            worker_id: self.config.id.clone(),
            claim,
            reverted: outcome.is_ok(),
        });

        outcome
    }

    async fn build_prompt(&self, task: &Task) -> String {
        if let Some(formatter) = &self.collaborators.formatter {
            match formatter.format(task).await {
                Ok(prompt) => return prompt,
                Err(e) => warn!(
                    worker = %self.config.id,
                    task_id = %task.id,
                    error = %e,
                    "Formatter failed, using built-in prompt"
                ),
            }
        }
        fallback_prompt(task)
    }

    async fn invoke_failed(&self, task_id: &str, source: CollaboratorError) -> Result<()> {
        match self.runtime.invoke_failure_policy {
            InvokeFailurePolicy::KeepClaim => {
                error!(
                    worker = %self.config.id,
                    task_id,
                    error = %source,
                    "Agent launch failed after claim; worker stays processing with no agent running"
                );
                self.emit(WorkerEvent::StuckClaim {
                    worker_id: self.config.id.clone(),
                    task_id: task_id.to_string(),
                    error: source.to_string(),
                });
                Err(WorkerError::StuckClaim {
                    worker_id: self.config.id.clone(),
                    task_id: task_id.to_string(),
                    source,
                })
            }
            InvokeFailurePolicy::Rollback => {
                warn!(
                    worker = %self.config.id,
                    task_id,
                    error = %source,
                    "Agent launch failed, rolling back claim"
                );
                // The revert outcome is reported by rollback_status itself.
                let _ = self.rollback_status().await;
                Err(WorkerError::Invocation {
                    worker_id: self.config.id.clone(),
                    task_id: task_id.to_string(),
                    source,
                })
            }
        }
    }

    fn claim_failed(&self, task_id: &str, source: CollaboratorError) -> WorkerError {
        warn!(worker = %self.config.id, task_id, error = %source, "Claim failed");
        self.emit(WorkerEvent::ClaimFailed {
            worker_id: self.config.id.clone(),
            task_id: task_id.to_string(),
            error: source.to_string(),
        });
        WorkerError::Claim {
            worker_id: self.config.id.clone(),
            task_id: task_id.to_string(),
            source,
        }
    }

    fn busy(&self, current_task_id: String) -> WorkerError {
        WorkerError::Busy {
            worker_id: self.config.id.clone(),
            current_task_id,
        }
    }

    fn try_claim(&self, claim: Claim) -> Result<()> {
        let mut slot = self.slot();
        if let Some(current) = slot.as_ref() {
            let current_task_id = current.task_id.clone();
            drop(slot);
            return Err(self.busy(current_task_id));
        }
        *slot = Some(claim);
        Ok(())
    }

    fn release(&self, task_id: &str) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|c| c.task_id == task_id) {
            *slot = None;
        }
    }

    fn emit(&self, event: WorkerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn slot(&self) -> MutexGuard<'_, Option<Claim>> {
        self.claim.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
