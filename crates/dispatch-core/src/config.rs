//! Dispatch configuration.
//!
//! Everything is read from environment variables, optionally seeded from a
//! dotenv file. Empty values count as unset.
//!
//! # Environment Variables
//!
//! - `AI_01_LIST_ID` / `AI_01_SRC_PATH` … `AI_04_*`: worker slots
//! - `AI_LIST_IDS` + `AI_SRC_PATH`: legacy form, used only when no slot is set
//! - `AI_STATUS_WORKING`, `AI_STATUS_COMPLETED`: tracker status names
//! - `AI_COMPLETED_LIST_ID`: where completed tasks are moved
//! - `AI_TERMINAL_STATUSES`: comma list of statuses never picked up
//! - `AI_POLL_INTERVAL_SECS`: delay between polls
//! - `AI_INVOKE_FAILURE_POLICY`: `keep_claim` or `rollback`
//! - `AI_AGENT_COMMAND`: agent command line
//! - `HOOK_SERVER_PORT`, `WEBHOOK_PORT`, `WEBHOOK_SECRET`
//! - `CLICKUP_API_TOKEN`, `CLICKUP_TEAM_ID`
//! - `SLACK_BOT_TOKEN`, `SLACK_NOTIFY_CHANNEL`
//! - `ISSUE_BASE_URL`: prefix for external issue links in notifications

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use dispatch_models::WorkerConfig;
use dispatch_runtime::{InvokeFailurePolicy, RuntimeConfig};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

/// Number of numbered worker slots (`AI_01` … `AI_04`).
pub const MAX_WORKER_SLOTS: usize = 4;

/// Default agent command line.
pub const DEFAULT_AGENT_COMMAND: &str = "claude --permission-mode plan";

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Worker slots in declaration order.
    pub workers: Vec<WorkerConfig>,
    /// Settings shared by all workers.
    pub runtime: RuntimeConfig,
    /// Agent hook server port.
    pub hook_port: u16,
    /// Tracker webhook server port.
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,
    /// Agent command line; the first word is the program.
    pub agent_command: String,
    pub clickup_api_token: Option<String>,
    pub clickup_team_id: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_channel: Option<String>,
    /// Prefix for external issue links, e.g. `https://jira.example.com/browse/`.
    pub issue_base_url: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: Vec::new(),
            runtime: RuntimeConfig::default(),
            hook_port: 8081,
            webhook_port: 8080,
            webhook_secret: None,
            agent_command: DEFAULT_AGENT_COMMAND.to_string(),
            clickup_api_token: None,
            clickup_team_id: None,
            slack_bot_token: None,
            slack_channel: None,
            issue_base_url: None,
        }
    }
}

impl DispatchConfig {
    /// Loads `path` into the process environment if it exists. Variables
    /// already set win. Returns whether a file was loaded.
    pub fn load_env_file(path: &Path) -> Result<bool> {
        if !path.exists() {
            debug!(path = %path.display(), "no env file");
            return Ok(false);
        }
        dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "loaded env file");
        Ok(true)
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self {
            workers: load_workers(&get),
            ..Self::default()
        };

        let mut runtime = RuntimeConfig::default();
        if let Some(status) = get("AI_STATUS_WORKING") {
            runtime = runtime.with_status_working(status);
        }
        if let Some(status) = get("AI_STATUS_COMPLETED") {
            runtime = runtime.with_status_completed(status);
        }
        if let Some(list_id) = get("AI_COMPLETED_LIST_ID") {
            runtime = runtime.with_completed_queue(list_id);
        }
        if let Some(statuses) = get("AI_TERMINAL_STATUSES") {
            runtime = runtime.with_terminal_statuses(split_list(&statuses));
        }
        if let Some(secs) = get("AI_POLL_INTERVAL_SECS") {
            let secs: u64 = parse("AI_POLL_INTERVAL_SECS", &secs)?;
            if secs == 0 {
                return Err(invalid("AI_POLL_INTERVAL_SECS", "0", "must be at least 1"));
            }
            runtime = runtime.with_poll_interval(Duration::from_secs(secs));
        }
        if let Some(policy) = get("AI_INVOKE_FAILURE_POLICY") {
            let policy = InvokeFailurePolicy::from_str(&policy)
                .map_err(|reason| invalid("AI_INVOKE_FAILURE_POLICY", &policy, &reason))?;
            runtime = runtime.with_invoke_failure_policy(policy);
        }
        config.runtime = runtime;

        if let Some(port) = get("HOOK_SERVER_PORT") {
            config.hook_port = parse("HOOK_SERVER_PORT", &port)?;
        }
        if let Some(port) = get("WEBHOOK_PORT") {
            config.webhook_port = parse("WEBHOOK_PORT", &port)?;
        }
        if let Some(command) = get("AI_AGENT_COMMAND") {
            config.agent_command = command;
        }

        config.webhook_secret = get("WEBHOOK_SECRET");
        config.clickup_api_token = get("CLICKUP_API_TOKEN");
        config.clickup_team_id = get("CLICKUP_TEAM_ID");
        config.slack_bot_token = get("SLACK_BOT_TOKEN");
        config.slack_channel = get("SLACK_NOTIFY_CHANNEL");
        config.issue_base_url = get("ISSUE_BASE_URL");

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration. Shared source paths only warn.
    pub fn validate(&self) -> Result<()> {
        if self.workers.is_empty() {
            return Err(ConfigError::NoWorkers);
        }
        if self.hook_port == self.webhook_port {
            return Err(invalid(
                "HOOK_SERVER_PORT",
                &self.hook_port.to_string(),
                "must differ from WEBHOOK_PORT",
            ));
        }

        let mut paths = HashSet::new();
        for worker in &self.workers {
            if !paths.insert(worker.src_path.as_str()) {
                warn!(
                    worker = %worker.id,
                    src_path = %worker.src_path,
                    "several workers share a source path; hooks go to the processing one"
                );
            }
        }
        Ok(())
    }

    /// Source queue ids of all workers.
    pub fn source_queue_ids(&self) -> Vec<&str> {
        self.workers
            .iter()
            .map(|w| w.source_queue_id.as_str())
            .collect()
    }
}

fn load_workers<G>(get: &G) -> Vec<WorkerConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let mut workers = Vec::new();

    for slot in 1..=MAX_WORKER_SLOTS {
        let id = format!("AI_{:02}", slot);
        let list_id = get(&format!("{}_LIST_ID", id));
        let src_path = get(&format!("{}_SRC_PATH", id));
        match (list_id, src_path) {
            (Some(list_id), Some(src_path)) => {
                info!(worker = %id, list_id = %list_id, src_path = %src_path, "worker configured");
                workers.push(WorkerConfig::new(id, list_id, src_path));
            }
            (None, None) => {}
            _ => warn!(worker = %id, "worker slot needs both LIST_ID and SRC_PATH, skipped"),
        }
    }

    if workers.is_empty() {
        if let (Some(list_ids), Some(src_path)) = (get("AI_LIST_IDS"), get("AI_SRC_PATH")) {
            for (i, list_id) in split_list(&list_ids).into_iter().enumerate() {
                let id = format!("AI_{:02}", i + 1);
                info!(worker = %id, list_id = %list_id, "worker configured from AI_LIST_IDS");
                workers.push(WorkerConfig::new(id, list_id, src_path.clone()));
            }
        }
    }

    workers
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn load(vars: &[(&str, &str)]) -> Result<DispatchConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DispatchConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_numbered_slots() {
        let config = load(&[
            ("AI_01_LIST_ID", "list-1"),
            ("AI_01_SRC_PATH", "/src/app"),
            ("AI_03_LIST_ID", "list-3"),
            ("AI_03_SRC_PATH", "/src/web"),
            ("AI_02_LIST_ID", "list-2"),
        ])
        .unwrap();

        let ids: Vec<&str> = config.workers.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["AI_01", "AI_03"]);
        assert_eq!(config.source_queue_ids(), vec!["list-1", "list-3"]);
    }

    #[test]
    fn test_legacy_list_ids() {
        let config = load(&[("AI_LIST_IDS", "a, b,,c"), ("AI_SRC_PATH", "/src/app")]).unwrap();

        assert_eq!(config.workers.len(), 3);
        assert_eq!(config.workers[2].id, "AI_03");
        assert_eq!(config.workers[2].source_queue_id, "c");
        assert!(config.workers.iter().all(|w| w.src_path == "/src/app"));
    }

    #[test]
    fn test_numbered_slots_take_precedence_over_legacy() {
        let config = load(&[
            ("AI_01_LIST_ID", "list-1"),
            ("AI_01_SRC_PATH", "/src/app"),
            ("AI_LIST_IDS", "x,y"),
            ("AI_SRC_PATH", "/src/legacy"),
        ])
        .unwrap();
        assert_eq!(config.workers.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("AI_01_LIST_ID", "l"), ("AI_01_SRC_PATH", "/p")]).unwrap();

        assert_eq!(config.hook_port, 8081);
        assert_eq!(config.webhook_port, 8080);
        assert_eq!(config.runtime.status_working, "in progress");
        assert_eq!(config.runtime.status_completed, "dev complete");
        assert_eq!(config.runtime.poll_interval, Duration::from_secs(10));
        assert_eq!(config.agent_command, DEFAULT_AGENT_COMMAND);
        assert!(config.webhook_secret.is_none());
        assert!(config.runtime.is_terminal_status("On Hold"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("AI_01_LIST_ID", "l"),
            ("AI_01_SRC_PATH", "/p"),
            ("AI_STATUS_WORKING", "Working"),
            ("AI_STATUS_COMPLETED", "Completed"),
            ("AI_COMPLETED_LIST_ID", "done"),
            ("AI_TERMINAL_STATUSES", "Completed, Archived"),
            ("AI_POLL_INTERVAL_SECS", "30"),
            ("AI_INVOKE_FAILURE_POLICY", "rollback"),
            ("HOOK_SERVER_PORT", "9001"),
            ("WEBHOOK_PORT", "9000"),
            ("WEBHOOK_SECRET", "s3cret"),
            ("SLACK_NOTIFY_CHANNEL", "C123"),
            ("AI_AGENT_COMMAND", "codex --plan"),
        ])
        .unwrap();

        assert_eq!(config.runtime.status_working, "Working");
        assert_eq!(config.runtime.completed_queue_id.as_deref(), Some("done"));
        assert!(config.runtime.is_terminal_status("archived"));
        assert!(!config.runtime.is_terminal_status("cancelled"));
        assert_eq!(config.runtime.poll_interval, Duration::from_secs(30));
        assert_eq!(
            config.runtime.invoke_failure_policy,
            InvokeFailurePolicy::Rollback
        );
        assert_eq!(config.hook_port, 9001);
        assert_eq!(config.webhook_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.slack_channel.as_deref(), Some("C123"));
        assert_eq!(config.agent_command, "codex --plan");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = load(&[
            ("AI_01_LIST_ID", "l"),
            ("AI_01_SRC_PATH", "/p"),
            ("WEBHOOK_SECRET", "  "),
            ("AI_STATUS_WORKING", ""),
        ])
        .unwrap();
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.runtime.status_working, "in progress");
    }

    #[test]
    fn test_no_workers_is_error() {
        assert!(matches!(load(&[]), Err(ConfigError::NoWorkers)));
        assert!(matches!(
            load(&[("AI_01_LIST_ID", "only-list")]),
            Err(ConfigError::NoWorkers)
        ));
    }

    #[test]
    fn test_invalid_values() {
        let base = [("AI_01_LIST_ID", "l"), ("AI_01_SRC_PATH", "/p")];

        let mut vars = base.to_vec();
        vars.push(("HOOK_SERVER_PORT", "eighty"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "HOOK_SERVER_PORT"
        ));

        let mut vars = base.to_vec();
        vars.push(("AI_INVOKE_FAILURE_POLICY", "retry"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue { .. })));

        let mut vars = base.to_vec();
        vars.push(("AI_POLL_INTERVAL_SECS", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue { .. })));

        let mut vars = base.to_vec();
        vars.push(("HOOK_SERVER_PORT", "8080"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_shared_src_path_is_allowed() {
        let config = load(&[
            ("AI_01_LIST_ID", "l1"),
            ("AI_01_SRC_PATH", "/p"),
            ("AI_02_LIST_ID", "l2"),
            ("AI_02_SRC_PATH", "/p"),
        ])
        .unwrap();
        assert_eq!(config.workers.len(), 2);
    }

    #[test]
    fn test_load_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DISPATCH_TEST_ONLY_VAR=from-file").unwrap();

        assert!(DispatchConfig::load_env_file(file.path()).unwrap());
        assert_eq!(
            std::env::var("DISPATCH_TEST_ONLY_VAR").as_deref(),
            Ok("from-file")
        );
        assert!(!DispatchConfig::load_env_file(Path::new("/nonexistent/.env")).unwrap());
    }
}
