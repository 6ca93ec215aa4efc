//! Worker pool management.

use std::collections::HashSet;
use std::sync::Arc;

use dispatch_models::WorkerConfig;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::event::WorkerEvent;
use crate::poller::TaskPoller;
use crate::worker::{Claim, Collaborators, Worker, WorkerSnapshot};

/// Owns the worker slots and routes hook notifications to them.
#[derive(Debug)]
pub struct Manager {
    runtime: Arc<RuntimeConfig>,
    workers: Vec<Arc<Worker>>,
    source_queues: HashSet<String>,
    events: broadcast::Sender<WorkerEvent>,
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/')
    } else {
        trimmed
    }
}

impl Manager {
    /// Creates a manager with one worker per config, in declaration order.
    ///
    /// Two workers sharing a directory is allowed but logged; see
    /// [`Manager::worker_by_src_path`] for how hooks resolve then.
    pub fn new(
        runtime: RuntimeConfig,
        configs: Vec<WorkerConfig>,
        collaborators: Collaborators,
    ) -> Self {
        let runtime = Arc::new(runtime);
        let (events, _) = broadcast::channel(256);

        let mut seen_paths = HashSet::new();
        for config in &configs {
            if !seen_paths.insert(normalize_path(&config.src_path).to_string()) {
                warn!(
                    worker = %config.id,
                    src_path = %config.src_path,
                    "source path shared with an earlier worker"
                );
            }
        }

        let source_queues = configs.iter().map(|c| c.source_queue_id.clone()).collect();
        let workers = configs
            .into_iter()
            .map(|config| {
                Arc::new(Worker::new(
                    config,
                    Arc::clone(&runtime),
                    collaborators.clone(),
                    events.clone(),
                ))
            })
            .collect();

        Self {
            runtime,
            workers,
            source_queues,
            events,
        }
    }

    /// Subscribe to worker lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    pub fn snapshots(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(|w| w.snapshot()).collect()
    }

    pub fn worker_by_id(&self, id: &str) -> Option<Arc<Worker>> {
        self.workers.iter().find(|w| w.id() == id).cloned()
    }

    /// Resolves the worker whose directory is `path`, ignoring trailing
    /// slashes.
    ///
    /// When several workers share the directory, the one currently
    /// processing wins, otherwise the first in declaration order.
    pub fn worker_by_src_path(&self, path: &str) -> Option<Arc<Worker>> {
        let path = normalize_path(path);
        if path.is_empty() {
            return None;
        }

        let mut first = None;
        for worker in self
            .workers
            .iter()
            .filter(|w| normalize_path(w.src_path()) == path)
        {
            if worker.is_processing() {
                return Some(Arc::clone(worker));
            }
            first.get_or_insert_with(|| Arc::clone(worker));
        }
        first
    }

    pub fn worker_by_source_queue(&self, queue_id: &str) -> Option<Arc<Worker>> {
        self.workers
            .iter()
            .find(|w| w.source_queue_id() == queue_id)
            .cloned()
    }

    /// Returns true if some worker polls `queue_id`.
    pub fn is_source_queue(&self, queue_id: &str) -> bool {
        self.source_queues.contains(queue_id)
    }

    /// Returns true if no worker holds a claim.
    pub fn all_idle(&self) -> bool {
        self.workers.iter().all(|w| !w.is_processing())
    }

    /// Spawns one polling loop per worker and returns their handles.
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            workers = self.workers.len(),
            poll_interval_secs = self.runtime.poll_interval.as_secs(),
            "starting worker pollers"
        );

        self.workers
            .iter()
            .map(|worker| {
                let worker = Arc::clone(worker);
                let poll_interval = self.runtime.poll_interval;
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    TaskPoller::new(worker, poll_interval, shutdown).run().await;
                })
            })
            .collect()
    }

    /// Runs all polling loops until shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        for handle in self.start(shutdown) {
            if let Err(e) = handle.await {
                warn!(error = %e, "poller task panicked");
            }
        }
        info!("all worker pollers stopped");
    }

    /// Handles a task-complete notification from the agent running in
    /// `cwd`.
    ///
    /// Unknown directories and idle workers are no-ops (`Ok(None)`), so a
    /// duplicate notification does nothing. Returns the released claim.
    pub async fn on_hook_received(&self, cwd: &str) -> Result<Option<Claim>> {
        let Some(worker) = self.worker_by_src_path(cwd) else {
            debug!(cwd, "task complete from unknown directory");
            return Ok(None);
        };

        self.complete_worker(&worker).await
    }

    /// Completes the claim held by `worker`, already resolved by the caller.
    /// An idle worker is a no-op.
    pub async fn complete_worker(&self, worker: &Arc<Worker>) -> Result<Option<Claim>> {
        if !worker.is_processing() {
            debug!(worker = %worker.id(), "task complete for idle worker ignored");
            return Ok(None);
        }

        worker.complete_task().await.map(Some)
    }

    /// Handles a user-cancelled session in `cwd` by rolling back the claim.
    ///
    /// Returns the claim that was released, if any.
    pub async fn on_session_cancelled(&self, cwd: &str) -> Result<Option<Claim>> {
        let Some(worker) = self.worker_by_src_path(cwd) else {
            debug!(cwd, "session end from unknown directory");
            return Ok(None);
        };

        let Some(claim) = worker.current_claim() else {
            debug!(worker = %worker.id(), "session end for idle worker ignored");
            return Ok(None);
        };

        worker.rollback_status().await?;
        Ok(Some(claim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryTracker, RecordingInvoker};
    use dispatch_models::Task;
    use std::time::Duration;

    fn manager_with(tracker: Arc<MemoryTracker>, runtime: RuntimeConfig) -> Manager {
        Manager::new(
            runtime,
            vec![
                WorkerConfig::new("AI_01", "list-1", "/src/app"),
                WorkerConfig::new("AI_02", "list-2", "/src/web/"),
            ],
            Collaborators::new(tracker, Arc::new(RecordingInvoker::new())),
        )
    }

    fn seeded_tracker() -> Arc<MemoryTracker> {
        let tracker = Arc::new(MemoryTracker::new());
        tracker.insert("list-1", Task::new("t1", "Fix login", "open"));
        tracker.insert("list-2", Task::new("t2", "Landing page", "to do"));
        tracker
    }

    #[test]
    fn test_lookups() {
        let manager = manager_with(seeded_tracker(), RuntimeConfig::default());

        assert_eq!(manager.worker_by_id("AI_02").unwrap().id(), "AI_02");
        assert_eq!(manager.worker_by_src_path("/src/app/").unwrap().id(), "AI_01");
        assert_eq!(manager.worker_by_src_path("/src/web").unwrap().id(), "AI_02");
        assert_eq!(manager.worker_by_source_queue("list-2").unwrap().id(), "AI_02");
        assert!(manager.worker_by_src_path("/elsewhere").is_none());
        assert!(manager.worker_by_src_path("").is_none());
        assert!(manager.is_source_queue("list-1"));
        assert!(!manager.is_source_queue("done"));
        assert!(manager.all_idle());
    }

    fn shared_path_manager() -> Manager {
        Manager::new(
            RuntimeConfig::default(),
            vec![
                WorkerConfig::new("AI_01", "list-1", "/src/shared"),
                WorkerConfig::new("AI_02", "list-2", "/src/shared"),
            ],
            Collaborators::new(seeded_tracker(), Arc::new(RecordingInvoker::new())),
        )
    }

    #[test]
    fn test_shared_path_resolves_to_first_declared_when_idle() {
        let manager = shared_path_manager();
        assert_eq!(manager.worker_by_src_path("/src/shared").unwrap().id(), "AI_01");
    }

    #[tokio::test]
    async fn test_shared_path_prefers_processing_worker() {
        let manager = shared_path_manager();
        manager.worker_by_id("AI_02").unwrap().process_task("t2").await.unwrap();

        assert_eq!(manager.worker_by_src_path("/src/shared").unwrap().id(), "AI_02");

        manager.on_hook_received("/src/shared").await.unwrap();
        assert!(manager.all_idle());
    }

    #[tokio::test]
    async fn test_on_hook_received_completes_matching_worker() {
        let tracker = seeded_tracker();
        let manager = manager_with(tracker.clone(), RuntimeConfig::default());
        manager.worker_by_id("AI_01").unwrap().process_task("t1").await.unwrap();

        let claim = manager.on_hook_received("/src/app").await.unwrap();

        assert_eq!(claim.unwrap().task_id, "t1");
        assert!(manager.all_idle());
        assert_eq!(tracker.task("t1").unwrap().status.status, "dev complete");
    }

    #[tokio::test]
    async fn test_on_hook_received_duplicate_is_noop() {
        let tracker = seeded_tracker();
        let manager = manager_with(tracker.clone(), RuntimeConfig::default());
        manager.worker_by_id("AI_01").unwrap().process_task("t1").await.unwrap();
        manager.on_hook_received("/src/app").await.unwrap();
        let writes = tracker.writes().len();

        assert!(manager.on_hook_received("/src/app").await.unwrap().is_none());
        assert_eq!(tracker.writes().len(), writes);
    }

    #[tokio::test]
    async fn test_on_hook_received_unknown_cwd_is_noop() {
        let tracker = seeded_tracker();
        let manager = manager_with(tracker.clone(), RuntimeConfig::default());

        assert!(manager.on_hook_received("/tmp").await.unwrap().is_none());
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_on_session_cancelled_rolls_back() {
        let tracker = seeded_tracker();
        let manager = manager_with(tracker.clone(), RuntimeConfig::default());
        let worker = manager.worker_by_id("AI_02").unwrap();
        worker.process_task("t2").await.unwrap();

        let claim = manager.on_session_cancelled("/src/web").await.unwrap();

        assert_eq!(claim.unwrap().task_id, "t2");
        assert!(!worker.is_processing());
        assert_eq!(tracker.task("t2").unwrap().status.status, "to do");
    }

    #[tokio::test]
    async fn test_events_are_broadcast_from_all_workers() {
        let manager = manager_with(seeded_tracker(), RuntimeConfig::default());
        let mut events = manager.subscribe();

        manager.worker_by_id("AI_02").unwrap().process_task("t2").await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.worker_id(), "AI_02");
        assert_eq!(event.task_id(), "t2");
    }

    #[tokio::test]
    async fn test_start_claims_tasks_and_stops_on_shutdown() {
        let tracker = seeded_tracker();
        let manager = manager_with(
            tracker.clone(),
            RuntimeConfig::default().with_poll_interval(Duration::from_millis(10)),
        );
        let (tx, rx) = watch::channel(false);

        let handles = manager.start(rx);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(manager.worker_by_id("AI_01").unwrap().current_task_id().as_deref(), Some("t1"));
        assert_eq!(manager.worker_by_id("AI_02").unwrap().current_task_id().as_deref(), Some("t2"));

        tx.send(true).unwrap();
        for handle in handles {
            tokio::time::timeout(Duration::from_millis(100), handle)
                .await
                .expect("poller should stop")
                .unwrap();
        }
    }
}
