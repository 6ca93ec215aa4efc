//! Agent hook handlers.
//!
//! Bodies are taken as raw bytes so that a malformed body is reported as
//! 400 by the hook parser, whatever its content type.

use axum::{body::Bytes, extract::State};
use dispatch_hooks::HookKind;

use crate::error::Result;
use crate::state::AppState;

async fn dispatch(state: &AppState, kind: HookKind, body: &Bytes) -> Result<&'static str> {
    state.hooks.dispatch(kind, body).await?;
    Ok("OK")
}

/// POST /hook/stop
pub async fn hook_stop(State(state): State<AppState>, body: Bytes) -> Result<&'static str> {
    dispatch(&state, HookKind::Stop, &body).await
}

/// POST /hook/session-end
pub async fn hook_session_end(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str> {
    dispatch(&state, HookKind::SessionEnd, &body).await
}

/// POST /hook/plan-ready
pub async fn hook_plan_ready(State(state): State<AppState>, body: Bytes) -> Result<&'static str> {
    dispatch(&state, HookKind::PlanReady, &body).await
}

/// POST /hook/task-complete
pub async fn hook_task_complete(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str> {
    dispatch(&state, HookKind::TaskComplete, &body).await
}
