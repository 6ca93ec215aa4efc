//! Worker slot configuration.

use serde::{Deserialize, Serialize};

/// Immutable configuration of one worker slot.
///
/// `src_path` is the only key the agent's hook notifications carry back, so
/// it should be unique per slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Slot identifier (e.g. "AI_01"). Also used to identify the agent's terminal.
    pub id: String,
    /// Tracker list/queue this slot serves.
    pub source_queue_id: String,
    /// Absolute working directory the agent runs in.
    pub src_path: String,
}

impl WorkerConfig {
    /// Creates a new worker slot configuration.
    pub fn new(
        id: impl Into<String>,
        source_queue_id: impl Into<String>,
        src_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_queue_id: source_queue_id.into(),
            src_path: src_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_new() {
        let config = WorkerConfig::new("AI_01", "list-1", "/src/app");
        assert_eq!(config.id, "AI_01");
        assert_eq!(config.source_queue_id, "list-1");
        assert_eq!(config.src_path, "/src/app");
    }
}
