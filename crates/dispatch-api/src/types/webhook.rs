//! Tracker webhook payloads.

use serde::Deserialize;
use serde_json::Value;

/// Webhook event kinds that may make a task claimable.
pub const TASK_CHANGE_EVENTS: &[&str] = &["taskCreated", "taskUpdated", "taskStatusUpdated"];

/// A tracker webhook delivery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerWebhookEvent {
    /// Event kind, e.g. `taskCreated`.
    pub event: String,
    pub task_id: String,
    pub webhook_id: String,
    pub history_items: Vec<HistoryItem>,
}

/// One change recorded in a webhook delivery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryItem {
    /// Unix milliseconds.
    pub date: Value,
    pub field: String,
    pub before: Value,
    pub after: Value,
}

impl TrackerWebhookEvent {
    /// The list the task now belongs to, from the `parent_id` history item.
    pub fn list_id(&self) -> Option<&str> {
        self.history_items
            .iter()
            .filter(|item| item.field == "parent_id")
            .find_map(|item| item.after.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Returns true for events that may make a task claimable.
    pub fn is_task_change(&self) -> bool {
        TASK_CHANGE_EVENTS.contains(&self.event.as_str())
    }
}
