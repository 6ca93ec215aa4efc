//! Hook payloads.
//!
//! Every field defaults when absent: the agent's hook configuration decides
//! what gets sent, and only `cwd` is needed for routing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{HookError, Result};

/// Body of `POST /hook/stop`, sent whenever an agent turn ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopPayload {
    pub cwd: String,
    pub session_id: String,
    pub transcript_path: String,
    pub exit_code: i32,
    /// e.g. "plan" or "default".
    pub permission_mode: String,
    pub stop_hook_active: bool,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// `/clear` was issued.
    Clear,
    /// The user logged out.
    Logout,
    /// The user exited while the agent waited for input.
    PromptInputExit,
    /// Anything else, including a normal exit.
    #[default]
    #[serde(other)]
    Other,
}

impl SessionEndReason {
    /// Returns true if this end means the user abandoned the task.
    pub fn is_cancellation(self) -> bool {
        matches!(self, SessionEndReason::PromptInputExit)
    }

    pub fn description(self) -> &'static str {
        match self {
            SessionEndReason::Clear => "session cleared",
            SessionEndReason::Logout => "logged out",
            SessionEndReason::PromptInputExit => "cancelled by user",
            SessionEndReason::Other => "exited",
        }
    }
}

/// Body of `POST /hook/session-end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEndPayload {
    pub cwd: String,
    pub session_id: String,
    pub transcript_path: String,
    pub reason: SessionEndReason,
    pub hook_event_name: String,
}

/// Body of `POST /hook/plan-ready`, sent by the agent when its plan awaits
/// review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanReadyPayload {
    pub cwd: String,
    pub task_id: String,
    pub task_name: String,
    pub plan_title: String,
}

/// Body of `POST /hook/task-complete`, sent by the agent once it has
/// confirmed the work is done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCompletePayload {
    pub cwd: String,
    /// e.g. "completed".
    pub status: String,
}

/// Parses a raw hook body. `kind` names the hook in the error.
pub fn parse_payload<T: DeserializeOwned>(kind: &'static str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| HookError::Payload {
        kind,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_payload_full() {
        let payload: StopPayload = parse_payload(
            "stop",
            br#"{"cwd":"/src/app","session_id":"s1","transcript_path":"/tmp/t.jsonl","exit_code":1,"permission_mode":"plan","stop_hook_active":true}"#,
        )
        .unwrap();

        assert_eq!(payload.cwd, "/src/app");
        assert_eq!(payload.exit_code, 1);
        assert_eq!(payload.permission_mode, "plan");
        assert!(payload.stop_hook_active);
    }

    #[test]
    fn test_missing_fields_default() {
        let payload: StopPayload = parse_payload("stop", br#"{"cwd":"/src/app"}"#).unwrap();
        assert_eq!(payload.exit_code, 0);
        assert!(payload.transcript_path.is_empty());
    }

    #[test]
    fn test_session_end_reasons() {
        let payload: SessionEndPayload =
            parse_payload("session-end", br#"{"cwd":"/a","reason":"prompt_input_exit"}"#).unwrap();
        assert_eq!(payload.reason, SessionEndReason::PromptInputExit);
        assert!(payload.reason.is_cancellation());

        let payload: SessionEndPayload =
            parse_payload("session-end", br#"{"cwd":"/a","reason":"logout"}"#).unwrap();
        assert_eq!(payload.reason, SessionEndReason::Logout);
        assert!(!payload.reason.is_cancellation());

        let payload: SessionEndPayload =
            parse_payload("session-end", br#"{"cwd":"/a","reason":"something_new"}"#).unwrap();
        assert_eq!(payload.reason, SessionEndReason::Other);

        let payload: SessionEndPayload = parse_payload("session-end", br#"{"cwd":"/a"}"#).unwrap();
        assert_eq!(payload.reason, SessionEndReason::Other);
    }

    #[test]
    fn test_invalid_json_is_payload_error() {
        let err = parse_payload::<TaskCompletePayload>("task-complete", b"{not json").unwrap_err();
        assert!(matches!(err, HookError::Payload { kind: "task-complete", .. }));
    }

    #[test]
    fn test_wrong_field_type_is_payload_error() {
        let err = parse_payload::<StopPayload>("stop", br#"{"exit_code":"one"}"#).unwrap_err();
        assert!(matches!(err, HookError::Payload { .. }));
    }
}
