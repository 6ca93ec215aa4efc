//! Integration errors.

use dispatch_runtime::CollaboratorError;
use thiserror::Error;

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Slack answers 200 with `ok: false` on failure.
    #[error("slack rejected message: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    Parse(String),

    #[error("missing configuration: {0}")]
    NotConfigured(&'static str),

    #[error("agent command is empty")]
    EmptyCommand,

    #[error("cannot start {program}: {message}")]
    Launch { program: String, message: String },
}

impl IntegrationError {
    pub(crate) fn api(service: &'static str, status: u16, body: String) -> Self {
        let body = if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body
        };
        Self::Api {
            service,
            status,
            body,
        }
    }
}

impl From<IntegrationError> for CollaboratorError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::Http(e) if e.is_decode() => CollaboratorError::Parse(e.to_string()),
            IntegrationError::Http(e) => CollaboratorError::Request(e.to_string()),
            IntegrationError::Api { status: 404, body, .. } => CollaboratorError::NotFound(body),
            IntegrationError::Api { status, body, .. } => CollaboratorError::Status { status, body },
            IntegrationError::Rejected(reason) => CollaboratorError::Request(reason),
            IntegrationError::Parse(message) => CollaboratorError::Parse(message),
            IntegrationError::NotConfigured(what) => {
                CollaboratorError::NotConfigured(what.to_string())
            }
            IntegrationError::EmptyCommand => {
                CollaboratorError::NotConfigured("agent command".to_string())
            }
            e @ IntegrationError::Launch { .. } => CollaboratorError::Launch(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
