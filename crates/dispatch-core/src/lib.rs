//! Process configuration for AI Dispatch.
//!
//! [`DispatchConfig`] gathers worker slots, runtime settings, listener ports
//! and collaborator credentials from the environment.

pub mod config;
pub mod error;

pub use config::{DispatchConfig, DEFAULT_AGENT_COMMAND, MAX_WORKER_SLOTS};
pub use error::{ConfigError, Result};
