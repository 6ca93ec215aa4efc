//! In-memory collaborators for tests.
//!
//! Enabled inside this crate's tests and, for dependent crates, through the
//! `testing` feature.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dispatch_models::{GetTasksOptions, Task, TaskState};

use crate::error::CollaboratorError;
use crate::traits::{CollaboratorResult, Formatter, InvokeResult, Invoker, Notifier, TrackerClient};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A call received by [`MemoryTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    GetTask(String),
    GetTasks(String),
    UpdateStatus { task_id: String, status: String },
    Move { task_id: String, queue_id: String },
}

#[derive(Debug, Default)]
struct TrackerState {
    tasks: Vec<(String, Task)>,
    calls: Vec<TrackerCall>,
    failing_statuses: HashSet<String>,
    fail_moves: bool,
    fail_listing: bool,
    fail_get: bool,
}

/// Tracker backed by a vector of `(queue_id, task)` pairs.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    state: Mutex<TrackerState>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `task` to the end of `queue_id`.
    pub fn insert(&self, queue_id: &str, task: Task) {
        lock(&self.state).tasks.push((queue_id.to_string(), task));
    }

    /// Returns the stored copy of a task.
    pub fn task(&self, task_id: &str) -> Option<Task> {
        lock(&self.state)
            .tasks
            .iter()
            .find(|(_, t)| t.id == task_id)
            .map(|(_, t)| t.clone())
    }

    /// Returns the queue a task currently sits in.
    pub fn queue_of(&self, task_id: &str) -> Option<String> {
        lock(&self.state)
            .tasks
            .iter()
            .find(|(_, t)| t.id == task_id)
            .map(|(q, _)| q.clone())
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<TrackerCall> {
        lock(&self.state).calls.clone()
    }

    /// Returns the write calls (status updates and moves) received so far.
    pub fn writes(&self) -> Vec<TrackerCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, TrackerCall::UpdateStatus { .. } | TrackerCall::Move { .. }))
            .collect()
    }

    /// Makes every update to `status` fail.
    pub fn fail_status(&self, status: &str) {
        lock(&self.state).failing_statuses.insert(status.to_string());
    }

    /// Makes every move fail.
    pub fn fail_moves(&self) {
        lock(&self.state).fail_moves = true;
    }

    /// Makes listing fail.
    pub fn fail_listing(&self) {
        lock(&self.state).fail_listing = true;
    }

    /// Makes single-task lookups fail.
    pub fn fail_get_task(&self) {
        lock(&self.state).fail_get = true;
    }
}

#[async_trait]
impl TrackerClient for MemoryTracker {
    async fn get_task(&self, task_id: &str) -> CollaboratorResult<Task> {
        let mut state = lock(&self.state);
        state.calls.push(TrackerCall::GetTask(task_id.to_string()));
        if state.fail_get {
            return Err(CollaboratorError::Request("connection refused".into()));
        }
        state
            .tasks
            .iter()
            .find(|(_, t)| t.id == task_id)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| CollaboratorError::NotFound(task_id.to_string()))
    }

    async fn get_tasks(
        &self,
        queue_id: &str,
        _options: &GetTasksOptions,
    ) -> CollaboratorResult<Vec<Task>> {
        let mut state = lock(&self.state);
        state.calls.push(TrackerCall::GetTasks(queue_id.to_string()));
        if state.fail_listing {
            return Err(CollaboratorError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(state
            .tasks
            .iter()
            .filter(|(q, _)| q == queue_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn update_task_status(&self, task_id: &str, status: &str) -> CollaboratorResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(TrackerCall::UpdateStatus {
            task_id: task_id.to_string(),
            status: status.to_string(),
        });
        if state.failing_statuses.contains(status) {
            return Err(CollaboratorError::Status {
                status: 500,
                body: format!("cannot set status {}", status),
            });
        }
        match state.tasks.iter_mut().find(|(_, t)| t.id == task_id) {
            Some((_, task)) => {
                task.status = TaskState::new(status);
                Ok(())
            }
            None => Err(CollaboratorError::NotFound(task_id.to_string())),
        }
    }

    async fn move_task_to_list(&self, task_id: &str, queue_id: &str) -> CollaboratorResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(TrackerCall::Move {
            task_id: task_id.to_string(),
            queue_id: queue_id.to_string(),
        });
        if state.fail_moves {
            return Err(CollaboratorError::Request("move rejected".into()));
        }
        match state.tasks.iter_mut().find(|(_, t)| t.id == task_id) {
            Some((queue, _)) => {
                *queue = queue_id.to_string();
                Ok(())
            }
            None => Err(CollaboratorError::NotFound(task_id.to_string())),
        }
    }
}

/// A launch recorded by [`RecordingInvoker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeCall {
    pub work_dir: String,
    pub prompt: String,
    pub worker_id: String,
}

/// Invoker that records launches instead of starting anything.
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<InvokeCall>>,
    failing: AtomicBool,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an invoker whose launches always fail.
    pub fn failing() -> Self {
        let invoker = Self::default();
        invoker.set_failing(true);
        invoker
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<InvokeCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Invoker for RecordingInvoker {
    async fn invoke_plan(
        &self,
        work_dir: &str,
        prompt: &str,
        worker_id: &str,
    ) -> CollaboratorResult<InvokeResult> {
        lock(&self.calls).push(InvokeCall {
            work_dir: work_dir.to_string(),
            prompt: prompt.to_string(),
            worker_id: worker_id.to_string(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Launch("terminal unavailable".into()));
        }
        Ok(InvokeResult::new(work_dir, prompt))
    }
}

/// Formatter that returns a fixed prompt, or fails when built with
/// [`FixedFormatter::failing`].
#[derive(Debug, Clone)]
pub struct FixedFormatter {
    prompt: Option<String>,
}

impl FixedFormatter {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }

    pub fn failing() -> Self {
        Self { prompt: None }
    }
}

#[async_trait]
impl Formatter for FixedFormatter {
    async fn format(&self, _task: &Task) -> CollaboratorResult<String> {
        self.prompt
            .clone()
            .ok_or_else(|| CollaboratorError::Request("formatter offline".into()))
    }
}

/// Notifier that keeps posted messages as `(channel, content)` pairs.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        lock(&self.messages).clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn post_message(&self, channel: &str, content: &str) -> CollaboratorResult<()> {
        lock(&self.messages).push((channel.to_string(), content.to_string()));
        Ok(())
    }
}
