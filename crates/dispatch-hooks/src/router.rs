//! Hook routing.
//!
//! [`HookRouter`] turns the four agent notifications into worker lifecycle
//! calls on a [`Manager`] and then hands an event to the callback registered
//! for that kind. Only `TaskComplete` completes a task and only a
//! `prompt_input_exit` session end rolls one back; everything else is
//! forwarded for notification or logged.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use dispatch_runtime::{Claim, Manager, WorkerSnapshot};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::payload::{
    parse_payload, PlanReadyPayload, SessionEndPayload, StopPayload, TaskCompletePayload,
};
use crate::transcript::{classify_transcript, StopReason};

/// The four hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Stop,
    SessionEnd,
    PlanReady,
    TaskComplete,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::Stop,
        HookKind::SessionEnd,
        HookKind::PlanReady,
        HookKind::TaskComplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::Stop => "stop",
            HookKind::SessionEnd => "session-end",
            HookKind::PlanReady => "plan-ready",
            HookKind::TaskComplete => "task-complete",
        }
    }

    /// HTTP path the hook is posted to.
    pub fn path(self) -> &'static str {
        match self {
            HookKind::Stop => "/hook/stop",
            HookKind::SessionEnd => "/hook/session-end",
            HookKind::PlanReady => "/hook/plan-ready",
            HookKind::TaskComplete => "/hook/task-complete",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified `Stop` that was not `Unknown`.
#[derive(Debug, Clone)]
pub struct StopEvent {
    pub payload: StopPayload,
    pub reason: StopReason,
    /// The worker owning `cwd`, as it was when the hook arrived.
    pub worker: Option<WorkerSnapshot>,
}

#[derive(Debug, Clone)]
pub struct SessionEndEvent {
    pub payload: SessionEndPayload,
    pub worker: Option<WorkerSnapshot>,
    /// The claim released by a cancellation rollback.
    pub rolled_back: Option<Claim>,
}

#[derive(Debug, Clone)]
pub struct PlanReadyEvent {
    pub payload: PlanReadyPayload,
    pub worker: Option<WorkerSnapshot>,
}

#[derive(Debug, Clone)]
pub struct TaskCompleteEvent {
    pub payload: TaskCompletePayload,
    pub worker: Option<WorkerSnapshot>,
    /// The claim released by the completion, if one was held.
    pub completed: Option<Claim>,
}

/// A registered hook callback.
pub type HookCallback<E> = Arc<dyn Fn(E) -> BoxFuture<'static, ()> + Send + Sync>;

fn boxed<E, F, Fut>(f: F) -> HookCallback<E>
where
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)
}

/// One optional callback per hook kind.
#[derive(Clone, Default)]
pub struct HookCallbacks {
    pub on_stop: Option<HookCallback<StopEvent>>,
    pub on_session_end: Option<HookCallback<SessionEndEvent>>,
    pub on_plan_ready: Option<HookCallback<PlanReadyEvent>>,
    pub on_task_complete: Option<HookCallback<TaskCompleteEvent>>,
}

impl fmt::Debug for HookCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCallbacks")
            .field("on_stop", &self.on_stop.is_some())
            .field("on_session_end", &self.on_session_end.is_some())
            .field("on_plan_ready", &self.on_plan_ready.is_some())
            .field("on_task_complete", &self.on_task_complete.is_some())
            .finish()
    }
}

/// Callbacks run on their own task so a slow notifier never delays the
/// hook response.
fn fire<E: Send + 'static>(callback: &Option<HookCallback<E>>, event: E) {
    if let Some(callback) = callback {
        tokio::spawn(callback(event));
    }
}

/// Routes hook notifications to workers and callbacks.
#[derive(Debug, Default, Clone)]
pub struct HookRouter {
    manager: Option<Arc<Manager>>,
    callbacks: HookCallbacks,
}

impl HookRouter {
    /// Creates a router with no manager: hooks only reach callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router that drives `manager`'s workers.
    pub fn for_manager(manager: Arc<Manager>) -> Self {
        Self {
            manager: Some(manager),
            callbacks: HookCallbacks::default(),
        }
    }

    pub fn manager(&self) -> Option<&Arc<Manager>> {
        self.manager.as_ref()
    }

    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(StopEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks.on_stop = Some(boxed(f));
        self
    }

    pub fn on_session_end<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SessionEndEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks.on_session_end = Some(boxed(f));
        self
    }

    pub fn on_plan_ready<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PlanReadyEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks.on_plan_ready = Some(boxed(f));
        self
    }

    pub fn on_task_complete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(TaskCompleteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.callbacks.on_task_complete = Some(boxed(f));
        self
    }

    /// Parses a raw body of `kind` and routes it.
    pub async fn dispatch(&self, kind: HookKind, body: &[u8]) -> Result<()> {
        match kind {
            HookKind::Stop => {
                self.handle_stop(parse_payload(kind.as_str(), body)?).await;
            }
            HookKind::SessionEnd => {
                self.handle_session_end(parse_payload(kind.as_str(), body)?)
                    .await?;
            }
            HookKind::PlanReady => {
                self.handle_plan_ready(parse_payload(kind.as_str(), body)?)
                    .await;
            }
            HookKind::TaskComplete => {
                self.handle_task_complete(parse_payload(kind.as_str(), body)?)
                    .await?;
            }
        }
        Ok(())
    }

    /// Classifies a stopped turn from its transcript tail. `Unknown` is
    /// logged and goes no further.
    pub async fn handle_stop(&self, payload: StopPayload) -> StopReason {
        let reason = if payload.transcript_path.is_empty() {
            StopReason::Unknown
        } else {
            match classify_transcript(Path::new(&payload.transcript_path)).await {
                Ok(reason) => reason,
                Err(e) => {
                    warn!(cwd = %payload.cwd, error = %e, "transcript unreadable, stop left unclassified");
                    StopReason::Unknown
                }
            }
        };

        info!(
            cwd = %payload.cwd,
            reason = %reason,
            exit_code = payload.exit_code,
            permission_mode = %payload.permission_mode,
            "Stop hook received"
        );

        if !reason.is_actionable() {
            return reason;
        }

        let worker = self.snapshot_for(&payload.cwd);
        fire(
            &self.callbacks.on_stop,
            StopEvent {
                payload,
                reason,
                worker,
            },
        );
        reason
    }

    /// Rolls back the owning worker's claim when the user cancelled.
    /// Other reasons are logged and forwarded; they never complete a task.
    pub async fn handle_session_end(&self, payload: SessionEndPayload) -> Result<Option<Claim>> {
        info!(
            cwd = %payload.cwd,
            reason = payload.reason.description(),
            "SessionEnd hook received"
        );

        let worker = self.snapshot_for(&payload.cwd);
        let rolled_back = match (&self.manager, payload.reason.is_cancellation()) {
            (Some(manager), true) => manager.on_session_cancelled(&payload.cwd).await?,
            _ => {
                debug!(cwd = %payload.cwd, "session end without cancellation, claim kept");
                None
            }
        };

        fire(
            &self.callbacks.on_session_end,
            SessionEndEvent {
                payload,
                worker,
                rolled_back: rolled_back.clone(),
            },
        );
        Ok(rolled_back)
    }

    /// Forwards a plan-ready notification. Worker state is untouched.
    pub async fn handle_plan_ready(&self, payload: PlanReadyPayload) {
        info!(
            cwd = %payload.cwd,
            task_id = %payload.task_id,
            task_name = %payload.task_name,
            "PlanReady hook received"
        );

        let worker = self.snapshot_for(&payload.cwd);
        fire(
            &self.callbacks.on_plan_ready,
            PlanReadyEvent { payload, worker },
        );
    }

    /// Completes the owning worker's task.
    pub async fn handle_task_complete(
        &self,
        payload: TaskCompletePayload,
    ) -> Result<Option<Claim>> {
        info!(cwd = %payload.cwd, status = %payload.status, "TaskComplete hook received");

        // Snapshot before completing; once released, a shared src_path
        // resolves to a different worker.
        let (worker, completed) = match &self.manager {
            Some(manager) => match manager.worker_by_src_path(&payload.cwd) {
                Some(owner) => {
                    let snapshot = owner.snapshot();
                    (Some(snapshot), manager.complete_worker(&owner).await?)
                }
                None => {
                    debug!(cwd = %payload.cwd, "task complete from unknown directory");
                    (None, None)
                }
            },
            None => (None, None),
        };

        fire(
            &self.callbacks.on_task_complete,
            TaskCompleteEvent {
                payload,
                worker,
                completed: completed.clone(),
            },
        );
        Ok(completed)
    }

    fn snapshot_for(&self, cwd: &str) -> Option<WorkerSnapshot> {
        self.manager
            .as_ref()
            .and_then(|m| m.worker_by_src_path(cwd))
            .map(|w| w.snapshot())
    }
}
