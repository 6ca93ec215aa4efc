//! HTTP surface for AI Dispatch.
//!
//! Two routers share one [`AppState`]:
//! - the hook router (`/hook/*`, `/health`, `/workers`) receives agent
//!   lifecycle notifications
//! - the webhook router (`/webhook/tracker`, `/health`) receives signed
//!   tracker deliveries and queues claimable tasks
//!
//! Hook endpoints answer `200 OK` once a body parses, including when no
//! worker owns the `cwd`; `400` for bodies that do not parse; `405` for
//! methods other than POST.
//!
//! # Example
//!
//! ```ignore
//! use dispatch_api::{serve_hooks, ApiConfig, AppState};
//! use dispatch_hooks::HookRouter;
//!
//! let state = AppState::new(ApiConfig::default(), HookRouter::for_manager(manager), queue);
//! serve_hooks(state, shutdown_rx).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod signature;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_hook_router, create_webhook_router, serve, serve_hooks, serve_webhooks};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};
pub use state::AppState;
