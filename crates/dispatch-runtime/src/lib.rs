//! Worker runtime for AI Dispatch.
//!
//! This crate owns the claim lifecycle of tracker tasks:
//! - `Worker` - one slot bound to a source queue and a working directory
//! - `Manager` - the fixed pool of workers plus hook routing by directory
//! - `TaskPoller` - per-worker loop claiming the oldest pending task
//! - `QueueDispatcher` - claims tasks pushed by tracker webhooks
//!
//! Tracker, agent launcher, prompt formatter and chat notifier are reached
//! through the traits in [`traits`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dispatch_models::WorkerConfig;
//! use dispatch_runtime::{Collaborators, Manager, RuntimeConfig};
//! use tokio::sync::watch;
//!
//! let manager = Arc::new(Manager::new(
//!     RuntimeConfig::default(),
//!     vec![WorkerConfig::new("AI_01", "list-1", "/src/app")],
//!     Collaborators::new(tracker, invoker),
//! ));
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let pollers = manager.start(shutdown_rx);
//!
//! // Later, from the hook server:
//! manager.on_hook_received("/src/app").await?;
//!
//! shutdown_tx.send(true)?;
//! ```
//!
//! # Claim lifecycle
//!
//! Idle → (fetch, set working status, launch agent) → Processing →
//! (completed status, optional move) → Idle, or → (revert status) → Idle.
//! A worker never holds more than one claim, and `is_processing()` is true
//! exactly when `current_task_id()` is `Some`.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod manager;
pub mod poller;
pub mod traits;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{InvokeFailurePolicy, RuntimeConfig, DEFAULT_TERMINAL_STATUSES};
pub use dispatcher::QueueDispatcher;
pub use error::{CollaboratorError, Result, WorkerError};
pub use event::WorkerEvent;
pub use manager::Manager;
pub use poller::TaskPoller;
pub use traits::{CollaboratorResult, Formatter, InvokeResult, Invoker, Notifier, TrackerClient};
pub use worker::{fallback_prompt, Claim, Collaborators, Worker, WorkerSnapshot};
