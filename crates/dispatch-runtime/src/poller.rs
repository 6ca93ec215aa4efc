//! Per-worker polling loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::error::WorkerError;
use crate::worker::Worker;

/// Polls one worker's source queue and claims the oldest pending task
/// whenever the worker is idle.
pub struct TaskPoller {
    /// The worker this poller feeds.
    worker: Arc<Worker>,
    /// Delay between iterations.
    poll_interval: Duration,
    /// Shutdown signal receiver.
    shutdown: watch::Receiver<bool>,
}

impl TaskPoller {
    /// Creates a new poller.
    pub fn new(
        worker: Arc<Worker>,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            worker,
            poll_interval,
            shutdown,
        }
    }

    /// Run the polling loop until the shutdown signal is set.
    pub async fn run(&mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            worker = %self.worker.id(),
            queue = %self.worker.source_queue_id(),
            poll_interval_ms = self.poll_interval.as_millis(),
            "starting task poller"
        );

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!(worker = %self.worker.id(), "poller received shutdown signal");
                        break;
                    }
                }
            }
        }

        debug!(worker = %self.worker.id(), "task poller stopped");
    }

    /// One iteration: skip when busy, otherwise claim the oldest pending task.
    pub async fn poll_once(&self) {
        if self.worker.is_processing() {
            trace!(worker = %self.worker.id(), "worker busy, skipping poll");
            return;
        }

        let tasks = match self.worker.pending_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(worker = %self.worker.id(), error = %e, "failed to list pending tasks");
                return;
            }
        };

        let Some(task) = tasks.first() else {
            trace!(worker = %self.worker.id(), "no pending tasks");
            return;
        };

        match self.worker.process_task(&task.id).await {
            Ok(()) => {}
            // Lost a race with the webhook dispatcher.
            Err(WorkerError::Busy { .. }) => {
                debug!(worker = %self.worker.id(), task_id = %task.id, "worker claimed elsewhere");
            }
            // Already logged by the worker.
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::testing::{MemoryTracker, RecordingInvoker};
    use crate::worker::Collaborators;
    use dispatch_models::{Task, WorkerConfig};
    use tokio::sync::broadcast;

    fn worker(tracker: Arc<MemoryTracker>, invoker: Arc<RecordingInvoker>) -> Arc<Worker> {
        let (tx, _) = broadcast::channel(8);
        Arc::new(Worker::new(
            WorkerConfig::new("AI_01", "list-1", "/src/app"),
            Arc::new(RuntimeConfig::default()),
            Collaborators::new(tracker, invoker),
            tx,
        ))
    }

    #[tokio::test]
    async fn test_poll_once_claims_oldest_pending() {
        let tracker = Arc::new(MemoryTracker::new());
        tracker.insert("list-1", Task::new("done", "Old", "cancelled"));
        tracker.insert("list-1", Task::new("t1", "First", "open"));
        tracker.insert("list-1", Task::new("t2", "Second", "open"));
        let invoker = Arc::new(RecordingInvoker::new());
        let worker = worker(tracker, invoker.clone());
        let (_tx, rx) = watch::channel(false);

        let poller = TaskPoller::new(worker.clone(), Duration::from_millis(10), rx);
        poller.poll_once().await;

        assert_eq!(worker.current_task_id().as_deref(), Some("t1"));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_once_skips_busy_worker() {
        let tracker = Arc::new(MemoryTracker::new());
        tracker.insert("list-1", Task::new("t1", "First", "open"));
        tracker.insert("list-1", Task::new("t2", "Second", "open"));
        let invoker = Arc::new(RecordingInvoker::new());
        let worker = worker(tracker.clone(), invoker.clone());
        worker.process_task("t1").await.unwrap();
        let calls_before = tracker.calls().len();
        let (_tx, rx) = watch::channel(false);

        TaskPoller::new(worker.clone(), Duration::from_millis(10), rx)
            .poll_once()
            .await;

        assert_eq!(tracker.calls().len(), calls_before);
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_once_survives_listing_failure() {
        let tracker = Arc::new(MemoryTracker::new());
        tracker.fail_listing();
        let invoker = Arc::new(RecordingInvoker::new());
        let worker = worker(tracker, invoker.clone());
        let (_tx, rx) = watch::channel(false);

        TaskPoller::new(worker.clone(), Duration::from_millis(10), rx)
            .poll_once()
            .await;

        assert!(!worker.is_processing());
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let tracker = Arc::new(MemoryTracker::new());
        let invoker = Arc::new(RecordingInvoker::new());
        let worker = worker(tracker, invoker);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            TaskPoller::new(worker, Duration::from_millis(10), rx).run().await;
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("poller should stop within 100ms")
            .unwrap();
    }
}
