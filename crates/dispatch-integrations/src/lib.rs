//! Concrete collaborators for AI Dispatch.
//!
//! - [`ClickUpClient`]: the tracker, over the ClickUp REST API
//! - [`SlackNotifier`]: chat notifications
//! - [`CommandInvoker`]: launches the agent CLI in a worker's source directory

pub mod clickup;
pub mod error;
pub mod invoker;
pub mod slack;

pub use clickup::{ClickUpClient, CLICKUP_API_V2, CLICKUP_API_V3};
pub use error::{IntegrationError, Result};
pub use invoker::{CommandInvoker, INVOCATION_ID_ENV, WORKER_ID_ENV};
pub use slack::{SlackNotifier, SLACK_POST_MESSAGE_URL};
