//! Application state shared across handlers.

use std::sync::Arc;

use dispatch_hooks::HookRouter;
use dispatch_runtime::Manager;
use dispatch_work::TaskQueue;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Hook router (owns the manager, if any).
    pub hooks: Arc<HookRouter>,
    /// Queue fed by tracker webhooks.
    pub queue: Arc<TaskQueue>,
}

impl AppState {
    pub fn new(config: ApiConfig, hooks: HookRouter, queue: Arc<TaskQueue>) -> Self {
        Self {
            config: Arc::new(config),
            hooks: Arc::new(hooks),
            queue,
        }
    }

    pub fn manager(&self) -> Option<&Arc<Manager>> {
        self.hooks.manager()
    }
}
