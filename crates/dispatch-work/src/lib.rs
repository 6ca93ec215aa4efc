//! FIFO task queue for AI Dispatch.
//!
//! This crate provides the `TaskQueue` that decouples push-notification
//! ingestion from task processing:
//! - Thread-safe queue using `Mutex<VecDeque<T>>`
//! - Strict insertion order (FIFO) for any number of producers and consumers
//! - Async `dequeue` that waits for data or a shutdown signal
//!
//! # Example
//!
//! ```no_run
//! use dispatch_work::TaskQueue;
//! use tokio::sync::watch;
//!
//! # async fn run() -> dispatch_work::Result<()> {
//! let queue = TaskQueue::new();
//! let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
//!
//! queue.enqueue("task-1", "list-1")?;
//!
//! let task = queue.dequeue(&mut shutdown_rx).await?;
//! println!("Claiming: {}", task.task_id);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod queue;

pub use error::{QueueError, Result};
pub use queue::TaskQueue;
