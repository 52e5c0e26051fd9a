//! Embedded dispatch framework.
//!
//! # Data Flow
//! ```text
//! EmbeddedRequest + EmbeddedResponse + Next
//!     → app.rs (ordered routes, first match wins)
//!     → pattern.rs (literal / :param / * segments)
//!     → route handler | fallback | next.finish()
//!     → upstream.rs (fallback: relay to the backend service)
//! ```
//!
//! # Design Decisions
//! - Dispatch is synchronous; async work is spawned and finishes through the
//!   cloned response or callback handle
//! - Built once at startup and shared behind `Arc`

pub mod app;
pub mod pattern;
pub mod upstream;

use serde_json::json;
use thiserror::Error;

use crate::adapter::{EmbeddedRequest, EmbeddedResponse, Next};
use crate::config::GatewayConfig;

pub use app::App;
pub use pattern::PathPattern;
pub use upstream::UpstreamDispatch;

/// Errors raised by the embedded framework.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Message(String),

    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid upstream configuration: {0}")]
    InvalidUpstream(String),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream response: {0}")]
    Body(#[from] axum::Error),
}

impl From<&str> for DispatchError {
    fn from(message: &str) -> Self {
        DispatchError::Message(message.to_string())
    }
}

impl From<String> for DispatchError {
    fn from(message: String) -> Self {
        DispatchError::Message(message)
    }
}

/// Entry point of the embedded framework.
///
/// Called once per request with the synthetic request, the synthetic
/// response and the completion callback. Returning `Err` (or panicking)
/// counts as a synchronous failure.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(
        &self,
        req: EmbeddedRequest,
        res: EmbeddedResponse,
        next: Next,
    ) -> Result<(), DispatchError>;
}

impl<F> Dispatch for F
where
    F: Fn(EmbeddedRequest, EmbeddedResponse, Next) -> Result<(), DispatchError>
        + Send
        + Sync
        + 'static,
{
    fn dispatch(
        &self,
        req: EmbeddedRequest,
        res: EmbeddedResponse,
        next: Next,
    ) -> Result<(), DispatchError> {
        self(req, res, next)
    }
}

/// Build the embedded application served behind the adapter.
///
/// Always answers `GET {mount_prefix}/health`; everything else goes to the
/// backend service when upstream forwarding is enabled.
pub fn build_app(config: &GatewayConfig) -> Result<App, DispatchError> {
    let prefix = config.adapter.mount_prefix.trim_end_matches('/');
    let mut app = App::new().get(&format!("{prefix}/health"), health);

    if config.upstream.enabled {
        let upstream = UpstreamDispatch::new(&config.upstream)?;
        tracing::info!(base_url = %config.upstream.base_url, "Upstream forwarding enabled");
        app = app.fallback(upstream);
    } else {
        tracing::info!("Upstream forwarding disabled");
    }

    Ok(app)
}

fn health(_req: EmbeddedRequest, res: EmbeddedResponse, _next: Next) -> Result<(), DispatchError> {
    res.json(&json!({
        "success": true,
        "status": "ok",
    }))
}
