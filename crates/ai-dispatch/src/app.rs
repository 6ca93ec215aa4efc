//! Process wiring.
//!
//! Builds the collaborators from [`DispatchConfig`], then runs the worker
//! pollers, the queue dispatcher, the event forwarder and both HTTP
//! listeners off one shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use dispatch_api::{serve_hooks, serve_webhooks, ApiConfig, AppState};
use dispatch_core::{ConfigError, DispatchConfig};
use dispatch_hooks::{default_settings_path, HookError, HookRouter, HookSettings};
use dispatch_integrations::{ClickUpClient, CommandInvoker, IntegrationError, SlackNotifier};
use dispatch_runtime::{Collaborators, Manager, QueueDispatcher};
use dispatch_work::TaskQueue;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::notify::{forward_worker_events, wire_callbacks, Notifications};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Hooks(#[from] HookError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not set")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Tracker client and agent launcher from the environment.
pub fn build_collaborators(config: &DispatchConfig) -> Result<Collaborators> {
    let token = config
        .clickup_api_token
        .clone()
        .ok_or(AppError::Missing("CLICKUP_API_TOKEN"))?;
    let mut tracker = ClickUpClient::new(token)?;
    match &config.clickup_team_id {
        Some(team_id) => tracker = tracker.with_team_id(team_id.clone()),
        None if config.runtime.completed_queue_id.is_some() => {
            warn!("AI_COMPLETED_LIST_ID is set without CLICKUP_TEAM_ID; completed tasks cannot be moved")
        }
        None => {}
    }

    let invoker = CommandInvoker::new(&config.agent_command)?;
    Ok(Collaborators::new(Arc::new(tracker), Arc::new(invoker)))
}

/// Slack notifications when both token and channel are set.
pub fn build_notifications(config: &DispatchConfig) -> Result<Notifications> {
    let notifications = match (&config.slack_bot_token, &config.slack_channel) {
        (Some(token), Some(channel)) => {
            Notifications::new(Arc::new(SlackNotifier::new(token.clone())?), channel.clone())
        }
        (None, Some(_)) => {
            warn!("SLACK_NOTIFY_CHANNEL is set without SLACK_BOT_TOKEN; notifications disabled");
            Notifications::disabled()
        }
        _ => Notifications::disabled(),
    };
    Ok(notifications.with_issue_base_url(config.issue_base_url.clone()))
}

/// A configured dispatch process.
#[derive(Debug)]
pub struct App {
    config: DispatchConfig,
    manager: Arc<Manager>,
    queue: Arc<TaskQueue>,
    notifications: Arc<Notifications>,
}

impl App {
    pub fn new(
        config: DispatchConfig,
        collaborators: Collaborators,
        notifications: Notifications,
    ) -> Self {
        let manager = Arc::new(Manager::new(
            config.runtime.clone(),
            config.workers.clone(),
            collaborators,
        ));
        Self {
            config,
            manager,
            queue: Arc::new(TaskQueue::new()),
            notifications: Arc::new(notifications),
        }
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Hook router with the notification callbacks registered.
    pub fn hook_router(&self) -> HookRouter {
        wire_callbacks(
            HookRouter::for_manager(Arc::clone(&self.manager)),
            Arc::clone(&self.notifications),
        )
    }

    pub fn api_config(&self, host: &str) -> ApiConfig {
        let api = ApiConfig::new(host, self.config.hook_port, self.config.webhook_port);
        match &self.config.webhook_secret {
            Some(secret) => api.with_webhook_secret(secret.clone()),
            None => api,
        }
    }

    /// Starts every long-running task. All of them end once `shutdown`
    /// becomes true.
    pub fn spawn(&self, host: &str, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = self.manager.start(shutdown.clone());

        let mut dispatcher = QueueDispatcher::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.queue),
            shutdown.clone(),
        );
        handles.push(tokio::spawn(async move { dispatcher.run().await }));

        handles.push(tokio::spawn(forward_worker_events(
            self.manager.subscribe(),
            Arc::clone(&self.notifications),
            shutdown.clone(),
        )));

        let state = AppState::new(self.api_config(host), self.hook_router(), Arc::clone(&self.queue));
        if state.config.webhook_secret.is_none() {
            warn!("WEBHOOK_SECRET is not set; tracker webhooks are accepted unsigned");
        }

        let hooks_state = state.clone();
        let hooks_shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = serve_hooks(hooks_state, hooks_shutdown).await {
                error!(error = %e, "hook server failed");
            }
        }));
        handles.push(tokio::spawn(async move {
            if let Err(e) = serve_webhooks(state, shutdown).await {
                error!(error = %e, "webhook server failed");
            }
        }));

        handles
    }
}

/// Runs until ctrl-c.
pub async fn run(config: DispatchConfig, host: &str) -> Result<()> {
    let collaborators = build_collaborators(&config)?;
    let notifications = build_notifications(&config)?;
    let app = App::new(config, collaborators, notifications);

    info!(
        workers = app.manager().workers().len(),
        hook_port = app.config.hook_port,
        webhook_port = app.config.webhook_port,
        "starting ai-dispatch"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = app.spawn(host, shutdown_rx);

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            warn!(error = %e, "task ended abnormally");
        }
    }

    for worker in app.manager().workers() {
        if let Some(task_id) = worker.current_task_id() {
            warn!(worker_id = %worker.id(), task_id = %task_id, "exiting with a claimed task");
        }
    }
    info!("ai-dispatch stopped");
    Ok(())
}

/// Human-readable summary of a configuration.
pub fn describe(config: &DispatchConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("Workers ({}):\n", config.workers.len()));
    for worker in &config.workers {
        out.push_str(&format!(
            "  {}  list={}  src={}\n",
            worker.id, worker.source_queue_id, worker.src_path
        ));
    }
    let runtime = &config.runtime;
    out.push_str(&format!(
        "Statuses: working={:?} completed={:?}\n",
        runtime.status_working, runtime.status_completed
    ));
    out.push_str(&format!(
        "Completed list: {}\n",
        runtime.completed_queue_id.as_deref().unwrap_or("(none)")
    ));
    out.push_str(&format!("Terminal statuses: {}\n", runtime.terminal_statuses.join(", ")));
    out.push_str(&format!(
        "Poll interval: {}s  Invoke failure policy: {}\n",
        runtime.poll_interval.as_secs(),
        runtime.invoke_failure_policy
    ));
    out.push_str(&format!(
        "Ports: hooks={} webhooks={}  Webhook signature: {}\n",
        config.hook_port,
        config.webhook_port,
        if config.webhook_secret.is_some() { "required" } else { "not checked" }
    ));
    out.push_str(&format!("Agent command: {}\n", config.agent_command));
    out.push_str(&format!(
        "Slack: {}\n",
        match (&config.slack_bot_token, &config.slack_channel) {
            (Some(_), Some(channel)) => channel.as_str(),
            _ => "disabled",
        }
    ));
    out
}

/// Installs the agent hooks pointing at `port`.
pub fn install_hooks(settings: Option<PathBuf>, port: u16) -> Result<PathBuf> {
    let path = settings
        .or_else(default_settings_path)
        .ok_or(AppError::Missing("home directory"))?;
    HookSettings::new(port).install(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_hooks::HookKind;
    use dispatch_models::{Task, WorkerConfig};
    use dispatch_runtime::testing::{MemoryNotifier, MemoryTracker, RecordingInvoker};
    use std::time::Duration;

    fn config() -> DispatchConfig {
        DispatchConfig {
            workers: vec![WorkerConfig::new("AI_01", "list-1", "/src/app")],
            hook_port: 0,
            webhook_port: 0,
            ..DispatchConfig::default()
        }
    }

    fn app(notifier: Arc<MemoryNotifier>) -> (App, Arc<MemoryTracker>) {
        let tracker = Arc::new(MemoryTracker::new());
        tracker.insert(
            "list-1",
            Task::new("t1", "Fix login", "open").with_description("See ITSM-42"),
        );
        let collaborators = Collaborators::new(tracker.clone(), Arc::new(RecordingInvoker::new()));
        let notifications = Notifications::new(notifier, "C1")
            .with_issue_base_url(Some("https://issues.example.com/browse/".into()));
        (App::new(config(), collaborators, notifications), tracker)
    }

    async fn wait_for_messages(notifier: &MemoryNotifier, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            let messages = notifier.messages();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        notifier.messages()
    }

    #[tokio::test]
    async fn test_task_complete_posts_completion() {
        let notifier = Arc::new(MemoryNotifier::new());
        let (app, tracker) = app(notifier.clone());
        let worker = app.manager().worker_by_id("AI_01").unwrap();
        worker.process_task("t1").await.unwrap();

        app.hook_router()
            .dispatch(HookKind::TaskComplete, br#"{"cwd":"/src/app","status":"completed"}"#)
            .await
            .unwrap();

        assert!(!worker.is_processing());
        assert_eq!(tracker.task("t1").unwrap().status_name(), "dev complete");
        let messages = wait_for_messages(&notifier, 1).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "C1");
        assert!(messages[0].1.starts_with("AI task completed\nWorker: AI_01\n"));
        assert!(messages[0].1.contains("Issue: https://issues.example.com/browse/ITSM-42"));
    }

    #[tokio::test]
    async fn test_cancelled_session_posts_rollback() {
        let notifier = Arc::new(MemoryNotifier::new());
        let (app, tracker) = app(notifier.clone());
        let worker = app.manager().worker_by_id("AI_01").unwrap();
        worker.process_task("t1").await.unwrap();

        app.hook_router()
            .dispatch(
                HookKind::SessionEnd,
                br#"{"cwd":"/src/app","reason":"prompt_input_exit"}"#,
            )
            .await
            .unwrap();

        assert!(!worker.is_processing());
        assert_eq!(tracker.task("t1").unwrap().status_name(), "open");
        let messages = wait_for_messages(&notifier, 1).await;
        assert!(messages[0].1.starts_with("AI task cancelled"));
    }

    #[tokio::test]
    async fn test_duplicate_completion_posts_once() {
        let notifier = Arc::new(MemoryNotifier::new());
        let (app, _tracker) = app(notifier.clone());
        app.manager()
            .worker_by_id("AI_01")
            .unwrap()
            .process_task("t1")
            .await
            .unwrap();

        let router = app.hook_router();
        let body = br#"{"cwd":"/src/app"}"#;
        router.dispatch(HookKind::TaskComplete, body).await.unwrap();
        router.dispatch(HookKind::TaskComplete, body).await.unwrap();

        wait_for_messages(&notifier, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_stops_on_shutdown() {
        let notifier = Arc::new(MemoryNotifier::new());
        let (app, _tracker) = app(notifier);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = app.spawn("127.0.0.1", shutdown_rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let joined = tokio::time::timeout(
            Duration::from_secs(5),
            futures::future::join_all(handles),
        )
        .await
        .unwrap();
        assert!(joined.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_build_collaborators_requires_token() {
        assert!(matches!(
            build_collaborators(&config()),
            Err(AppError::Missing("CLICKUP_API_TOKEN"))
        ));

        let mut with_token = config();
        with_token.clickup_api_token = Some("pk_1".into());
        assert!(build_collaborators(&with_token).is_ok());
    }

    #[test]
    fn test_build_notifications() {
        let mut config = config();
        assert!(!build_notifications(&config).unwrap().is_enabled());

        config.slack_channel = Some("C1".into());
        assert!(!build_notifications(&config).unwrap().is_enabled());

        config.slack_bot_token = Some("xoxb".into());
        assert!(build_notifications(&config).unwrap().is_enabled());
    }

    #[test]
    fn test_describe_lists_workers() {
        let text = describe(&config());
        assert!(text.starts_with("Workers (1):\n  AI_01  list=list-1  src=/src/app\n"));
        assert!(text.contains("Webhook signature: not checked"));
        assert!(text.contains("Slack: disabled"));
    }

    #[test]
    fn test_install_hooks_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let written = install_hooks(Some(path.clone()), 9100).unwrap();
        assert_eq!(written, path);
        assert!(std::fs::read_to_string(path).unwrap().contains("localhost:9100/hook/stop"));
    }
}
