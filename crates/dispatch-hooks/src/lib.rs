//! Agent lifecycle hooks for AI Dispatch.
//!
//! The agent (or its host) posts four notifications, all correlated only by
//! the working directory `cwd`:
//! - `stop` - a turn ended; the transcript tail is classified
//! - `session-end` - the session closed; `prompt_input_exit` rolls back
//! - `plan-ready` - the agent asks for plan review; notification only
//! - `task-complete` - the agent confirmed completion; completes the task
//!
//! [`HookRouter`] maps them onto a `Manager` and registered callbacks.
//! [`HookSettings`] installs the agent-side hook commands.

pub mod error;
pub mod patterns;
pub mod payload;
pub mod router;
pub mod settings;
pub mod transcript;

pub use error::{HookError, Result};
pub use payload::{
    parse_payload, PlanReadyPayload, SessionEndPayload, SessionEndReason, StopPayload,
    TaskCompletePayload,
};
pub use router::{
    HookCallback, HookCallbacks, HookKind, HookRouter, PlanReadyEvent, SessionEndEvent,
    StopEvent, TaskCompleteEvent,
};
pub use settings::{default_settings_path, HookSettings, HOOK_TIMEOUT_MS};
pub use transcript::{classify, classify_transcript, read_tail, StopReason, TRANSCRIPT_TAIL_BYTES};
