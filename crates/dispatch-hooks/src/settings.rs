//! Agent hook settings.
//!
//! Writes the `Stop` and `SessionEnd` hook entries into the agent's
//! `settings.json` so every session reports to the local hook server. Each
//! hook pipes the agent's JSON payload from stdin straight to the endpoint.
//! Other keys and other hook kinds in the file are left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{HookError, Result};
use crate::router::HookKind;

/// Per-hook timeout written into the settings, in milliseconds.
pub const HOOK_TIMEOUT_MS: u64 = 5000;

/// `~/.claude/settings.json`, if a home directory is known.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("settings.json"))
}

/// Hook entries pointing at a hook server.
#[derive(Debug, Clone)]
pub struct HookSettings {
    host: String,
    port: u16,
}

impl HookSettings {
    pub fn new(port: u16) -> Self {
        Self {
            host: "localhost".to_string(),
            port,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Shell command that forwards the stdin payload of `kind`.
    pub fn command(&self, kind: HookKind) -> String {
        format!(
            "curl -s -X POST http://{}:{}{} -H 'Content-Type: application/json' -d @-",
            self.host,
            self.port,
            kind.path()
        )
    }

    fn entry(&self, kind: HookKind) -> Value {
        json!([{
            "matcher": "",
            "hooks": [{
                "type": "command",
                "command": self.command(kind),
                "timeout": HOOK_TIMEOUT_MS,
            }],
        }])
    }

    /// The `hooks` object this installer manages.
    pub fn hooks(&self) -> Map<String, Value> {
        let mut hooks = Map::new();
        hooks.insert("Stop".to_string(), self.entry(HookKind::Stop));
        hooks.insert("SessionEnd".to_string(), self.entry(HookKind::SessionEnd));
        hooks
    }

    /// Merges the managed entries into an existing settings document.
    pub fn merge(&self, mut settings: Value) -> Value {
        if !settings.is_object() {
            settings = Value::Object(Map::new());
        }
        if let Value::Object(root) = &mut settings {
            let hooks = root
                .entry("hooks")
                .or_insert_with(|| Value::Object(Map::new()));
            if !hooks.is_object() {
                *hooks = Value::Object(Map::new());
            }
            if let Value::Object(hooks) = hooks {
                hooks.extend(self.hooks());
            }
        }
        settings
    }

    /// Merges into the file at `path`, creating it (and its directory) if
    /// needed. An unreadable or invalid file is replaced.
    pub fn install(&self, path: &Path) -> Result<()> {
        let existing = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "settings file is not valid JSON, replacing");
                Value::Null
            }),
            Err(_) => Value::Null,
        };
        let merged = self.merge(existing);

        let to_error = |message: String| HookError::Settings {
            path: path.to_path_buf(),
            message,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| to_error(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&merged).map_err(|e| to_error(e.to_string()))?;
        fs::write(path, content).map_err(|e| to_error(e.to_string()))?;

        info!(path = %path.display(), port = self.port, "agent hooks installed");
        Ok(())
    }
}
