//! TaskQueue - unbounded FIFO of task ids waiting to be claimed.
//!
//! Concurrency pattern:
//! - `Mutex<VecDeque<QueuedTask>>` is the only place tasks live; every push
//!   and pop happens under it, which is what makes ordering strict.
//! - `Notify` only wakes waiters. It holds at most one stored permit, so
//!   bursts of `enqueue` coalesce into a single wake-up and `dequeue`
//!   re-checks the deque after every wake.

use std::collections::VecDeque;
use std::sync::Mutex;

use dispatch_models::QueuedTask;
use tokio::sync::{watch, Notify};
use tracing::trace;

use crate::error::{QueueError, Result};

/// Thread-safe FIFO task queue.
///
/// # Example
///
/// ```
/// use dispatch_work::TaskQueue;
///
/// let queue = TaskQueue::new();
/// queue.enqueue("t1", "list-1").unwrap();
/// queue.enqueue("t2", "list-1").unwrap();
///
/// assert_eq!(queue.try_dequeue().unwrap().task_id, "t1");
/// assert_eq!(queue.try_dequeue().unwrap().task_id, "t2");
/// assert!(queue.try_dequeue().is_none());
/// ```
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<QueuedTask>>,
    has_data: Notify,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task and wakes one waiting consumer.
    pub fn enqueue(
        &self,
        task_id: impl Into<String>,
        source_queue_id: impl Into<String>,
    ) -> Result<()> {
        let task = QueuedTask::new(task_id, source_queue_id);
        trace!(task_id = %task.task_id, source_queue_id = %task.source_queue_id, "enqueue");

        {
            let mut tasks = self
                .tasks
                .lock()
                .map_err(|e| QueueError::LockPoisoned(e.to_string()))?;
            tasks.push_back(task);
        }

        self.has_data.notify_one();
        Ok(())
    }

    /// Removes and returns the oldest task, waiting until one is available.
    ///
    /// Returns `QueueError::Cancelled` once `shutdown` is (or becomes) `true`,
    /// or when its sender is dropped.
    pub async fn dequeue(&self, shutdown: &mut watch::Receiver<bool>) -> Result<QueuedTask> {
        loop {
            if *shutdown.borrow() {
                return Err(QueueError::Cancelled);
            }

            if let Some(task) = self.pop_front()? {
                return Ok(task);
            }

            tokio::select! {
                _ = self.has_data.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Err(QueueError::Cancelled);
                    }
                }
            }
        }
    }

    /// Removes and returns the oldest task without waiting.
    pub fn try_dequeue(&self) -> Option<QueuedTask> {
        self.pop_front().ok().flatten()
    }

    /// Returns the number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Returns true if no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every queued task.
    pub fn clear(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.clear();
        }
    }

    fn pop_front(&self) -> Result<Option<QueuedTask>> {
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|e| QueueError::LockPoisoned(e.to_string()))?;
        Ok(tasks.pop_front())
    }
}
