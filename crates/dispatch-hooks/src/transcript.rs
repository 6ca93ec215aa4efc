//! Session transcript inspection for `Stop` hooks.
//!
//! A `Stop` fires for every ended turn, so the payload alone cannot tell a
//! finished plan from a rate limit. The last bytes of the transcript are
//! classified by an ordered rule list; the first rule with a matching
//! pattern wins.

use std::fmt;
use std::io::SeekFrom;
use std::path::Path;

use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{HookError, Result};
use crate::patterns::{
    api_error_patterns, context_exceeded_patterns, first_match, plan_ready_patterns,
    rate_limit_patterns, Pattern,
};

/// Bytes read from the end of a transcript.
pub const TRANSCRIPT_TAIL_BYTES: u64 = 4096;

/// Outcome of classifying a stopped turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The agent proposed a plan and waits for review.
    PlanReady,
    /// The provider rejected requests for rate or usage limits.
    RateLimit,
    /// The conversation outgrew the context window.
    ContextExceeded,
    /// Some other API failure.
    ApiError,
    /// Nothing recognisable. Logged only.
    Unknown,
}

impl StopReason {
    /// Returns true if this reason warrants a notification.
    pub fn is_actionable(self) -> bool {
        !matches!(self, StopReason::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::PlanReady => "plan_ready",
            StopReason::RateLimit => "rate_limit",
            StopReason::ContextExceeded => "context_exceeded",
            StopReason::ApiError => "api_error",
            StopReason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification rules, in evaluation order.
///
/// Plan phrases go first because a plan proposal may quote error text.
/// Rate limits precede context errors, which precede the generic error
/// terms that both of them usually also contain.
fn rules() -> [(StopReason, &'static [Pattern]); 4] {
    [
        (StopReason::PlanReady, plan_ready_patterns()),
        (StopReason::RateLimit, rate_limit_patterns()),
        (StopReason::ContextExceeded, context_exceeded_patterns()),
        (StopReason::ApiError, api_error_patterns()),
    ]
}

/// Classifies transcript text.
pub fn classify(text: &str) -> StopReason {
    rules()
        .into_iter()
        .find(|(_, patterns)| first_match(text, patterns).is_some())
        .map(|(reason, _)| reason)
        .unwrap_or(StopReason::Unknown)
}

/// Reads at most [`TRANSCRIPT_TAIL_BYTES`] from the end of `path`.
///
/// The cut may split a UTF-8 sequence; invalid bytes are replaced.
pub async fn read_tail(path: &Path) -> Result<String> {
    let io_err = |source| HookError::Transcript {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).await.map_err(io_err)?;
    let len = file.metadata().await.map_err(io_err)?.len();
    let start = len.saturating_sub(TRANSCRIPT_TAIL_BYTES);
    file.seek(SeekFrom::Start(start)).await.map_err(io_err)?;

    let mut buf = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut buf).await.map_err(io_err)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads the tail of `path` and classifies it.
pub async fn classify_transcript(path: &Path) -> Result<StopReason> {
    Ok(classify(&read_tail(path).await?))
}
