//! Runtime configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Statuses that are never picked up again by a polling loop.
pub const DEFAULT_TERMINAL_STATUSES: &[&str] = &[
    "dev complete",
    "deployed (qa)",
    "cancelled",
    "complete (store)",
    "on hold",
];

/// What a worker does when the agent launch fails after the tracker status
/// has already been changed to the working status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvokeFailurePolicy {
    /// Keep the claim and report a stuck claim. The slot stays busy until an
    /// operator intervenes or a hook arrives for it.
    #[default]
    KeepClaim,
    /// Revert the tracker status and release the slot.
    Rollback,
}

impl fmt::Display for InvokeFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeFailurePolicy::KeepClaim => write!(f, "keep_claim"),
            InvokeFailurePolicy::Rollback => write!(f, "rollback"),
        }
    }
}

impl FromStr for InvokeFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep_claim" | "keep" => Ok(InvokeFailurePolicy::KeepClaim),
            "rollback" => Ok(InvokeFailurePolicy::Rollback),
            other => Err(format!("unknown invoke failure policy: {}", other)),
        }
    }
}

/// Configuration shared by all workers of a manager.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Delay between two polling iterations of one worker.
    pub poll_interval: Duration,
    /// Tracker status set when a task is claimed.
    pub status_working: String,
    /// Tracker status set when a task completes.
    pub status_completed: String,
    /// Queue completed tasks are moved to, if any.
    pub completed_queue_id: Option<String>,
    /// Statuses excluded from polling (compared case-insensitively).
    pub terminal_statuses: Vec<String>,
    /// Behaviour when the agent launch fails after a claim.
    pub invoke_failure_policy: InvokeFailurePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            status_working: "in progress".to_string(),
            status_completed: "dev complete".to_string(),
            completed_queue_id: None,
            terminal_statuses: DEFAULT_TERMINAL_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            invoke_failure_policy: InvokeFailurePolicy::default(),
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the working status.
    pub fn with_status_working(mut self, status: impl Into<String>) -> Self {
        self.status_working = status.into();
        self
    }

    /// Sets the completed status.
    pub fn with_status_completed(mut self, status: impl Into<String>) -> Self {
        self.status_completed = status.into();
        self
    }

    /// Sets the destination queue for completed tasks. Empty clears it.
    pub fn with_completed_queue(mut self, queue_id: impl Into<String>) -> Self {
        let queue_id = queue_id.into();
        self.completed_queue_id = if queue_id.is_empty() {
            None
        } else {
            Some(queue_id)
        };
        self
    }

    /// Replaces the terminal status set.
    pub fn with_terminal_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminal_statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the invoke failure policy.
    pub fn with_invoke_failure_policy(mut self, policy: InvokeFailurePolicy) -> Self {
        self.invoke_failure_policy = policy;
        self
    }

    /// Returns true if tasks in `status` must not be claimed.
    pub fn is_terminal_status(&self, status: &str) -> bool {
        let status = status.trim();
        self.terminal_statuses
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.status_working, "in progress");
        assert_eq!(config.status_completed, "dev complete");
        assert!(config.completed_queue_id.is_none());
        assert_eq!(config.invoke_failure_policy, InvokeFailurePolicy::KeepClaim);
    }

    #[test]
    fn test_config_builder() {
        let config = RuntimeConfig::new()
            .with_poll_interval(Duration::from_millis(100))
            .with_status_working("Working")
            .with_status_completed("Completed")
            .with_completed_queue("done-list")
            .with_terminal_statuses(["Completed"])
            .with_invoke_failure_policy(InvokeFailurePolicy::Rollback);

        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.status_working, "Working");
        assert_eq!(config.completed_queue_id.as_deref(), Some("done-list"));
        assert_eq!(config.terminal_statuses, vec!["Completed".to_string()]);
        assert_eq!(config.invoke_failure_policy, InvokeFailurePolicy::Rollback);
    }

    #[test]
    fn test_empty_completed_queue_clears() {
        let config = RuntimeConfig::new()
            .with_completed_queue("x")
            .with_completed_queue("");
        assert!(config.completed_queue_id.is_none());
    }

    #[test]
    fn test_terminal_status_is_case_insensitive() {
        let config = RuntimeConfig::default();
        assert!(config.is_terminal_status("Cancelled"));
        assert!(config.is_terminal_status(" on hold "));
        assert!(!config.is_terminal_status("open"));
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!(
            "rollback".parse::<InvokeFailurePolicy>().unwrap(),
            InvokeFailurePolicy::Rollback
        );
        assert_eq!(
            "KEEP_CLAIM".parse::<InvokeFailurePolicy>().unwrap(),
            InvokeFailurePolicy::KeepClaim
        );
        assert!("retry".parse::<InvokeFailurePolicy>().is_err());
        assert_eq!(InvokeFailurePolicy::Rollback.to_string(), "rollback");
    }
}
