//! Core data models for AI Dispatch.
//!
//! This crate provides the data types shared across the dispatch workspace:
//! tracker tasks, worker slot configuration and queued work notifications.

pub mod queued;
pub mod task;
pub mod worker;

// Re-export main types
pub use queued::QueuedTask;
pub use task::{extract_external_ref, GetTasksOptions, Task, TaskAttachment, TaskState};
pub use worker::WorkerConfig;
