//! Health and status handlers.

use axum::{extract::State, Json};

use crate::state::AppState;
use crate::types::WorkersResponse;

/// GET /health - Liveness probe.
pub async fn health() -> &'static str {
    "OK"
}

/// GET /workers - Worker slots and their claims.
pub async fn list_workers(State(state): State<AppState>) -> Json<WorkersResponse> {
    let workers = state
        .manager()
        .map(|m| m.snapshots())
        .unwrap_or_default();
    let processing = workers.iter().filter(|w| w.processing).count();

    Json(WorkersResponse {
        total: workers.len(),
        processing,
        workers,
        queued: state.queue.len(),
        uptime_seconds: state.config.uptime_seconds(),
    })
}
