//! Chat notifications.
//!
//! Hook callbacks and worker events are turned into short plain-text
//! messages and posted to one channel. Delivery is best effort: a failed
//! post is logged and dropped.

use std::sync::Arc;

use dispatch_hooks::{HookRouter, PlanReadyEvent, SessionEndEvent, StopEvent, StopReason, TaskCompleteEvent};
use dispatch_integrations::ClickUpClient;
use dispatch_runtime::{Claim, Notifier, WorkerEvent, WorkerSnapshot};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Where and how messages are posted.
#[derive(Clone, Default)]
pub struct Notifications {
    notifier: Option<Arc<dyn Notifier>>,
    channel: Option<String>,
    issue_base_url: Option<String>,
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifications")
            .field("enabled", &self.is_enabled())
            .field("channel", &self.channel)
            .field("issue_base_url", &self.issue_base_url)
            .finish()
    }
}

impl Notifications {
    pub fn new(notifier: Arc<dyn Notifier>, channel: impl Into<String>) -> Self {
        Self {
            notifier: Some(notifier),
            channel: Some(channel.into()),
            issue_base_url: None,
        }
    }

    /// Messages are rendered and logged but never posted.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_issue_base_url(mut self, base: Option<String>) -> Self {
        self.issue_base_url = base.filter(|b| !b.is_empty());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some() && self.channel.is_some()
    }

    /// Link to an external issue, when a base URL is configured.
    pub fn issue_link(&self, key: &str) -> Option<String> {
        let base = self.issue_base_url.as_deref()?;
        if base.ends_with('/') {
            Some(format!("{}{}", base, key))
        } else {
            Some(format!("{}/{}", base, key))
        }
    }

    fn task_lines(&self, message: &mut String, worker_id: &str, claim: &Claim) {
        message.push_str(&format!("Worker: {}\n", worker_id));
        if !claim.task_name.is_empty() {
            message.push_str(&format!("Title: {}\n", claim.task_name));
        }
        if !claim.task_id.is_empty() {
            message.push_str(&format!("ClickUp: {}\n", ClickUpClient::task_link(&claim.task_id)));
        }
        if let Some(key) = &claim.external_ref {
            match self.issue_link(key) {
                Some(link) => message.push_str(&format!("Issue: {}\n", link)),
                None => message.push_str(&format!("Issue: {}\n", key)),
            }
        }
    }

    pub fn task_completed_message(&self, worker_id: &str, claim: &Claim) -> String {
        let mut message = String::from("AI task completed\n");
        self.task_lines(&mut message, worker_id, claim);
        message
    }

    pub fn task_cancelled_message(&self, worker_id: &str, claim: &Claim) -> String {
        let mut message = String::from("AI task cancelled, status reverted\n");
        self.task_lines(&mut message, worker_id, claim);
        message
    }

    pub fn plan_ready_message(&self, event: &PlanReadyEvent) -> String {
        let mut message = String::from("AI plan ready for review\n");
        let claim = event.worker.as_ref().and_then(|w| w.claim.clone());
        let worker_id = worker_label(event.worker.as_ref());

        // The payload wins over the worker's claim when it names a task.
        let claim = match claim {
            Some(mut claim) => {
                if !event.payload.task_id.is_empty() {
                    claim.task_id = event.payload.task_id.clone();
                }
                if !event.payload.task_name.is_empty() {
                    claim.task_name = event.payload.task_name.clone();
                }
                claim
            }
            None => Claim {
                task_id: event.payload.task_id.clone(),
                task_name: event.payload.task_name.clone(),
                external_ref: None,
                original_status: None,
            },
        };
        self.task_lines(&mut message, worker_id, &claim);
        if !event.payload.plan_title.is_empty() {
            message.push_str(&format!("Plan: {}\n", event.payload.plan_title));
        }
        message
    }

    pub fn stop_alert_message(&self, event: &StopEvent) -> String {
        let mut message = format!("AI agent stopped: {}\n", reason_label(event.reason));
        match event.worker.as_ref().and_then(|w| w.claim.as_ref()) {
            Some(claim) => self.task_lines(&mut message, worker_label(event.worker.as_ref()), claim),
            None => message.push_str(&format!("Directory: {}\n", event.payload.cwd)),
        }
        message
    }

    pub fn stuck_claim_message(&self, worker_id: &str, task_id: &str, error: &str) -> String {
        format!(
            "AI agent failed to start, task left in progress\nWorker: {}\nClickUp: {}\nError: {}\n",
            worker_id,
            ClickUpClient::task_link(task_id),
            error
        )
    }

    /// Posts `text`, logging instead when notifications are disabled.
    pub async fn send(&self, text: String) {
        let (Some(notifier), Some(channel)) = (&self.notifier, &self.channel) else {
            debug!(message = %text, "notifications disabled");
            return;
        };
        if let Err(e) = notifier.post_message(channel, &text).await {
            warn!(channel = %channel, error = %e, "failed to post notification");
        }
    }
}

fn worker_label(worker: Option<&WorkerSnapshot>) -> &str {
    worker.map(|w| w.id.as_str()).unwrap_or("unknown")
}

fn reason_label(reason: StopReason) -> &'static str {
    match reason {
        StopReason::PlanReady => "plan ready for review",
        StopReason::RateLimit => "rate limit reached",
        StopReason::ContextExceeded => "context window exceeded",
        StopReason::ApiError => "API error",
        StopReason::Unknown => "unknown",
    }
}

/// Registers the notification callbacks on `router`.
pub fn wire_callbacks(router: HookRouter, notifications: Arc<Notifications>) -> HookRouter {
    let on_complete = Arc::clone(&notifications);
    let on_plan = Arc::clone(&notifications);
    let on_stop = Arc::clone(&notifications);
    let on_end = notifications;

    router
        .on_task_complete(move |event: TaskCompleteEvent| {
            let notifications = Arc::clone(&on_complete);
            async move {
                let Some(claim) = event.completed else {
                    debug!(cwd = %event.payload.cwd, "task-complete without a claim, nothing to announce");
                    return;
                };
                let worker_id = worker_label(event.worker.as_ref()).to_string();
                info!(worker_id = %worker_id, task_id = %claim.task_id, "announcing completion");
                let text = notifications.task_completed_message(&worker_id, &claim);
                notifications.send(text).await;
            }
        })
        .on_plan_ready(move |event: PlanReadyEvent| {
            let notifications = Arc::clone(&on_plan);
            async move {
                let text = notifications.plan_ready_message(&event);
                notifications.send(text).await;
            }
        })
        .on_stop(move |event: StopEvent| {
            let notifications = Arc::clone(&on_stop);
            async move {
                let text = notifications.stop_alert_message(&event);
                notifications.send(text).await;
            }
        })
        .on_session_end(move |event: SessionEndEvent| {
            let notifications = Arc::clone(&on_end);
            async move {
                let Some(claim) = event.rolled_back else {
                    return;
                };
                let worker_id = worker_label(event.worker.as_ref()).to_string();
                info!(worker_id = %worker_id, task_id = %claim.task_id, "session cancelled, task rolled back");
                let text = notifications.task_cancelled_message(&worker_id, &claim);
                notifications.send(text).await;
            }
        })
}

/// Posts alerts for stuck claims until shutdown.
pub async fn forward_worker_events(
    mut events: broadcast::Receiver<WorkerEvent>,
    notifications: Arc<Notifications>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(WorkerEvent::StuckClaim { worker_id, task_id, error }) => {
                    let text = notifications.stuck_claim_message(&worker_id, &task_id, &error);
                    notifications.send(text).await;
                }
                Ok(event) => {
                    debug!(worker_id = %event.worker_id(), task_id = %event.task_id(), "worker event: {:?}", event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "worker event listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("worker event forwarding stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_hooks::{PlanReadyPayload, StopPayload};
    use dispatch_runtime::testing::MemoryNotifier;
    use std::time::Duration;

    fn claim() -> Claim {
        Claim {
            task_id: "86abc".into(),
            task_name: "Fix login redirect".into(),
            external_ref: Some("ITSM-5168".into()),
            original_status: Some("open".into()),
        }
    }

    fn snapshot(claim: Option<Claim>) -> WorkerSnapshot {
        WorkerSnapshot {
            id: "AI_01".into(),
            source_queue_id: "list-1".into(),
            src_path: "/src/app".into(),
            processing: claim.is_some(),
            claim,
        }
    }

    #[test]
    fn test_completed_message_with_issue_link() {
        let notifications = Notifications::disabled()
            .with_issue_base_url(Some("https://jira.example.com/browse".into()));

        let message = notifications.task_completed_message("AI_01", &claim());
        assert_eq!(
            message,
            "AI task completed\n\
             Worker: AI_01\n\
             Title: Fix login redirect\n\
             ClickUp: https://app.clickup.com/t/86abc\n\
             Issue: https://jira.example.com/browse/ITSM-5168\n"
        );
    }

    #[test]
    fn test_completed_message_without_base_url() {
        let message = Notifications::disabled().task_completed_message("AI_02", &claim());
        assert!(message.contains("Issue: ITSM-5168\n"));

        let bare = Claim {
            external_ref: None,
            task_name: String::new(),
            ..claim()
        };
        let message = Notifications::disabled().task_completed_message("AI_02", &bare);
        assert!(!message.contains("Title"));
        assert!(!message.contains("Issue"));
    }

    #[test]
    fn test_plan_ready_prefers_payload_names() {
        let event = PlanReadyEvent {
            payload: PlanReadyPayload {
                cwd: "/src/app".into(),
                task_id: String::new(),
                task_name: "Renamed".into(),
                plan_title: "Refactor session cookies".into(),
            },
            worker: Some(snapshot(Some(claim()))),
        };

        let message = Notifications::disabled().plan_ready_message(&event);
        assert!(message.starts_with("AI plan ready for review\nWorker: AI_01\n"));
        assert!(message.contains("Title: Renamed\n"));
        assert!(message.contains("https://app.clickup.com/t/86abc"));
        assert!(message.ends_with("Plan: Refactor session cookies\n"));
    }

    #[test]
    fn test_stop_alert_without_worker() {
        let event = StopEvent {
            payload: StopPayload {
                cwd: "/src/other".into(),
                ..Default::default()
            },
            reason: StopReason::RateLimit,
            worker: None,
        };
        let message = Notifications::disabled().stop_alert_message(&event);
        assert_eq!(message, "AI agent stopped: rate limit reached\nDirectory: /src/other\n");
    }

    #[tokio::test]
    async fn test_send_posts_to_channel() {
        let notifier = Arc::new(MemoryNotifier::new());
        let notifications = Notifications::new(notifier.clone(), "C123");
        assert!(notifications.is_enabled());

        notifications.send("hello".into()).await;
        assert_eq!(notifier.messages(), vec![("C123".to_string(), "hello".to_string())]);

        Notifications::disabled().send("dropped".into()).await;
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_stuck_claim_events_are_forwarded() {
        let notifier = Arc::new(MemoryNotifier::new());
        let notifications = Arc::new(Notifications::new(notifier.clone(), "C1"));
        let (events_tx, events_rx) = broadcast::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(forward_worker_events(events_rx, notifications, shutdown_rx));

        events_tx
            .send(WorkerEvent::TaskClaimed {
                worker_id: "AI_01".into(),
                claim: claim(),
            })
            .unwrap();
        events_tx
            .send(WorkerEvent::StuckClaim {
                worker_id: "AI_01".into(),
                task_id: "86abc".into(),
                error: "launch failed".into(),
            })
            .unwrap();

        for _ in 0..50 {
            if !notifier.messages().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("Error: launch failed"));
    }
}
