//! Router configuration and server setup.

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Creates the agent hook router.
pub fn create_hook_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/workers", get(handlers::list_workers))
        .route("/hook/stop", post(handlers::hook_stop))
        .route("/hook/session-end", post(handlers::hook_session_end))
        .route("/hook/plan-ready", post(handlers::hook_plan_ready))
        .route("/hook/task-complete", post(handlers::hook_task_complete))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Creates the tracker webhook router.
pub fn create_webhook_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhook/tracker", post(handlers::tracker_webhook))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Serves `router` on `addr` until `shutdown` becomes true.
pub async fn serve(
    addr: &str,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // A dropped sender also ends the server.
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    info!("server on {} stopped", addr);
    Ok(())
}

/// Starts the hook server.
pub async fn serve_hooks(
    state: AppState,
    shutdown: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let addr = state.config.hook_bind_address();
    serve(&addr, create_hook_router(state), shutdown).await
}

/// Starts the webhook server.
pub async fn serve_webhooks(
    state: AppState,
    shutdown: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let addr = state.config.webhook_bind_address();
    serve(&addr, create_webhook_router(state), shutdown).await
}
