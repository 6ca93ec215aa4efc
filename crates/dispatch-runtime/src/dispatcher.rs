//! Webhook-driven dispatch.
//!
//! Tracker webhooks push task ids into a [`TaskQueue`]; the dispatcher
//! drains it and hands each task to the idle worker that owns its source
//! queue. Busy owners drop the task: their poller picks it up later.

use std::sync::Arc;

use dispatch_models::QueuedTask;
use dispatch_work::{QueueError, TaskQueue};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::manager::Manager;

/// Consumes the shared task queue.
pub struct QueueDispatcher {
    manager: Arc<Manager>,
    queue: Arc<TaskQueue>,
    shutdown: watch::Receiver<bool>,
}

impl QueueDispatcher {
    pub fn new(
        manager: Arc<Manager>,
        queue: Arc<TaskQueue>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            manager,
            queue,
            shutdown,
        }
    }

    /// Run until shutdown.
    pub async fn run(&mut self) {
        debug!("starting queue dispatcher");

        loop {
            match self.queue.dequeue(&mut self.shutdown).await {
                Ok(task) => self.dispatch(task),
                Err(QueueError::Cancelled) => break,
                Err(e) => {
                    warn!(error = %e, "queue dispatcher stopping on queue error");
                    break;
                }
            }
        }

        debug!("queue dispatcher stopped");
    }

    /// Routes one queued task. The claim runs on its own task so a slow
    /// tracker does not hold up the rest of the queue.
    pub fn dispatch(&self, task: QueuedTask) {
        let Some(worker) = self.manager.worker_by_source_queue(&task.source_queue_id) else {
            warn!(
                task_id = %task.task_id,
                queue = %task.source_queue_id,
                "queued task has no owning worker"
            );
            return;
        };

        if worker.is_processing() {
            info!(
                worker = %worker.id(),
                task_id = %task.task_id,
                "owning worker busy, leaving task to the poller"
            );
            return;
        }

        tokio::spawn(async move {
            if let Err(e) = worker.process_task(&task.task_id).await {
                debug!(error = %e, "webhook claim did not go through");
            }
        });
    }
}
