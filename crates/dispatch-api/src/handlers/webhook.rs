//! Tracker webhook handler.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::signature::{verify_signature, SIGNATURE_HEADER};
use crate::state::AppState;
use crate::types::TrackerWebhookEvent;

/// POST /webhook/tracker - Queue tasks created or changed in a source queue.
pub async fn tracker_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, &body, signature) {
            warn!("webhook signature mismatch");
            return Err(ApiError::Unauthorized("invalid signature".to_string()));
        }
    }

    let event: TrackerWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid webhook event: {}", e)))?;

    debug!(event = %event.event, task_id = %event.task_id, "webhook received");

    let Some(list_id) = event.list_id() else {
        debug!(task_id = %event.task_id, "no list id in webhook, ignored");
        return Ok("OK");
    };

    let is_source = state
        .manager()
        .map(|m| m.is_source_queue(list_id))
        .unwrap_or(false);
    if !is_source {
        debug!(list_id, "webhook for a list no worker polls, ignored");
        return Ok("OK");
    }

    if !event.is_task_change() {
        debug!(event = %event.event, "webhook event kind ignored");
        return Ok("OK");
    }

    if event.task_id.is_empty() {
        return Err(ApiError::BadRequest("missing task_id".to_string()));
    }

    state.queue.enqueue(event.task_id.as_str(), list_id)?;
    info!(task_id = %event.task_id, list_id, "task queued from webhook");

    Ok("OK")
}
