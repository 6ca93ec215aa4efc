//! Hook handling errors.

use std::path::PathBuf;

use dispatch_runtime::WorkerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    /// The hook body was not valid JSON for its kind.
    #[error("invalid {kind} payload: {message}")]
    Payload { kind: &'static str, message: String },

    /// The session transcript could not be read.
    #[error("cannot read transcript {path}: {source}")]
    Transcript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The agent settings file could not be updated.
    #[error("cannot update settings {path}: {message}")]
    Settings { path: PathBuf, message: String },

    /// A worker lifecycle call triggered by the hook failed.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

pub type Result<T> = std::result::Result<T, HookError>;
