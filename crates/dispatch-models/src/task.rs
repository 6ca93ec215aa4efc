//! Tracker task types.
//!
//! A `Task` is the detail record returned by the external tracker. Only the
//! fields the dispatch core reads are modelled; unknown fields are ignored
//! when deserializing.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Status block attached to a tracker task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    /// Status name as configured in the tracker (e.g. "open").
    pub status: String,
    /// Display colour, if the tracker provides one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
}

impl TaskState {
    /// Creates a status block with the given name.
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            color: String::new(),
        }
    }
}

/// File attached to a tracker task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAttachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "mimetype")]
    pub mime_type: String,
}

/// A work item as stored in the external tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Tracker-assigned task identifier.
    pub id: String,

    /// Task title.
    #[serde(default)]
    pub name: String,

    /// Free-form description (markdown in most trackers).
    #[serde(default)]
    pub description: String,

    /// Current tracker status.
    #[serde(default)]
    pub status: TaskState,

    /// Link to the task in the tracker UI.
    #[serde(default)]
    pub url: String,

    /// Creation timestamp as reported by the tracker (epoch millis string).
    #[serde(default)]
    pub date_created: String,

    /// Last update timestamp as reported by the tracker.
    #[serde(default)]
    pub date_updated: String,

    /// Attachments on the task.
    #[serde(default)]
    pub attachments: Vec<TaskAttachment>,
}

impl Task {
    /// Creates a task with an id, name and status; other fields are empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TaskState::new(status),
            ..Default::default()
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the tracker URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Returns the current status name.
    pub fn status_name(&self) -> &str {
        &self.status.status
    }

    /// Returns the external reference found in the description, if any.
    pub fn external_ref(&self) -> Option<String> {
        extract_external_ref(&self.description)
    }
}

/// Options for listing the tasks of a tracker queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTasksOptions {
    /// Sort key: "created", "updated" or "due_date".
    pub order_by: Option<String>,
    /// When true the tracker returns results in reverse order.
    pub reverse: bool,
    /// Restrict to these statuses.
    pub statuses: Vec<String>,
    /// Include closed tasks.
    pub include_closed: bool,
}

impl GetTasksOptions {
    /// Oldest-first listing by creation date.
    pub fn oldest_first() -> Self {
        Self {
            order_by: Some("created".to_string()),
            reverse: false,
            ..Default::default()
        }
    }
}

/// Extracts the first issue key (e.g. `ITSM-5168`) from free text.
///
/// Matches `[A-Z]+-\d+`, which covers both bare keys and markdown links such
/// as `[ITSM-5168](https://...)`.
pub fn extract_external_ref(text: &str) -> Option<String> {
    static ISSUE_KEY: OnceLock<Regex> = OnceLock::new();
    let re = ISSUE_KEY.get_or_init(|| Regex::new(r"[A-Z]+-\d+").expect("valid issue key regex"));
    re.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_external_ref_bare() {
        assert_eq!(
            extract_external_ref("see ITSM-5168 for details"),
            Some("ITSM-5168".to_string())
        );
    }

    #[test]
    fn test_extract_external_ref_markdown_link() {
        let text = "[BUGS-42](https://example.atlassian.net/browse/BUGS-42) crash on login";
        assert_eq!(extract_external_ref(text), Some("BUGS-42".to_string()));
    }

    #[test]
    fn test_extract_external_ref_none() {
        assert_eq!(extract_external_ref("no key here, itsm-12 is lowercase"), None);
        assert_eq!(extract_external_ref(""), None);
    }

    #[test]
    fn test_task_deserialize_ignores_unknown_fields() {
        let json = r##"{
            "id": "abc123",
            "name": "Fix login",
            "description": "ITSM-1 broken",
            "status": {"status": "open", "color": "#fff"},
            "url": "https://tracker/t/abc123",
            "priority": {"id": "1"},
            "assignees": []
        }"##;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "abc123");
        assert_eq!(task.status_name(), "open");
        assert_eq!(task.external_ref(), Some("ITSM-1".to_string()));
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("t1", "Title", "open")
            .with_description("body")
            .with_url("https://tracker/t/t1");

        assert_eq!(task.status_name(), "open");
        assert_eq!(task.description, "body");
        assert_eq!(task.url, "https://tracker/t/t1");
    }

    #[test]
    fn test_oldest_first_options() {
        let opts = GetTasksOptions::oldest_first();
        assert_eq!(opts.order_by.as_deref(), Some("created"));
        assert!(!opts.reverse);
    }
}
