//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// No worker slot is configured.
    #[error("no workers configured: set AI_0N_LIST_ID and AI_0N_SRC_PATH (or AI_LIST_IDS and AI_SRC_PATH)")]
    NoWorkers,

    /// A variable holds a value that cannot be used.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The env file exists but cannot be parsed.
    #[error("cannot load env file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
