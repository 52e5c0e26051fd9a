//! Request adapter subsystem.
//!
//! # Data Flow
//! ```text
//! hosting request (axum)
//!     → inbound.rs (InboundRequest: segments, eager JSON body)
//!     → OPTIONS? → http::cors preflight, done
//!     → request.rs (EmbeddedRequest under the mount prefix)
//!     → response.rs + completion.rs (EmbeddedResponse, Next)
//!     → Dispatch::dispatch(request, response, next)
//!     → first of: terminal end | next(err) | next() | Err/panic | timeout
//!     → outbound.rs (OutboundResponse) → hosting response
//! ```
//!
//! # Design Decisions
//! - Exactly one outbound response per inbound request
//! - Every failure degrades to a JSON error body, nothing propagates
//! - No state survives the request

pub mod completion;
pub mod inbound;
pub mod outbound;
pub mod request;
pub mod response;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};

use crate::config::{AdapterConfig, CorsConfig};
use crate::embedded::Dispatch;
use crate::http::cors;
use crate::http::request::request_id;
use crate::observability::metrics;

use self::completion::{Completion, Resolution};

pub use self::completion::Next;
pub use self::inbound::InboundRequest;
pub use self::outbound::{OutboundBody, OutboundResponse};
pub use self::request::EmbeddedRequest;
pub use self::response::EmbeddedResponse;

/// Label describing how a request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Preflight,
    Completed,
    CallbackError,
    DispatchError,
    Unhandled,
    Abandoned,
    Timeout,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Preflight => "preflight",
            Outcome::Completed => "completed",
            Outcome::CallbackError => "callback_error",
            Outcome::DispatchError => "dispatch_error",
            Outcome::Unhandled => "unhandled",
            Outcome::Abandoned => "abandoned",
            Outcome::Timeout => "timeout",
        }
    }
}

/// Bridges hosting requests onto an embedded dispatch function.
pub struct Adapter {
    dispatch: Arc<dyn Dispatch>,
    mount_prefix: String,
    timeout: Duration,
    cors: CorsConfig,
}

impl Adapter {
    pub fn new(config: &AdapterConfig, cors: &CorsConfig, dispatch: Arc<dyn Dispatch>) -> Self {
        Self {
            dispatch,
            mount_prefix: config.mount_prefix.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            cors: cors.clone(),
        }
    }

    pub fn mount_prefix(&self) -> &str {
        &self.mount_prefix
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Adapt one inbound request. Always produces a response.
    pub async fn handle(&self, inbound: InboundRequest) -> OutboundResponse {
        let start = Instant::now();
        let method = inbound.method().clone();
        let request_id = request_id(inbound.headers())
            .unwrap_or("unknown")
            .to_string();

        let (response, outcome) = if method == Method::OPTIONS {
            (cors::preflight(&self.cors), Outcome::Preflight)
        } else {
            let request = EmbeddedRequest::from_inbound(inbound, &self.mount_prefix);
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                url = %request.url(),
                "Dispatching to embedded framework"
            );
            self.dispatch_and_wait(request).await
        };

        match outcome {
            Outcome::Completed | Outcome::Preflight => tracing::debug!(
                request_id = %request_id,
                status = %response.status(),
                outcome = outcome.as_str(),
                "Request adapted"
            ),
            _ => tracing::warn!(
                request_id = %request_id,
                status = %response.status(),
                outcome = outcome.as_str(),
                "Request adapted with fallback response"
            ),
        }

        metrics::record_request(method.as_str(), response.status().as_u16(), outcome.as_str(), start);
        response
    }

    async fn dispatch_and_wait(&self, request: EmbeddedRequest) -> (OutboundResponse, Outcome) {
        let (completion, receiver) = Completion::channel();
        let response = EmbeddedResponse::new(completion.clone());
        let next = Next::new(completion.clone());

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.dispatch.dispatch(request, response, next)
        }));

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(panic_message(&*panic)),
        };

        if let Some(message) = failure {
            tracing::error!(error = %message, "Embedded dispatch failed synchronously");
            if completion.resolve(Resolution::Failed(message.clone())) {
                return (
                    OutboundResponse::error(StatusCode::INTERNAL_SERVER_ERROR, message),
                    Outcome::DispatchError,
                );
            }
        }

        // The receiver reports a closed channel once every handle is gone.
        drop(completion);

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(Resolution::Finished(response))) => (response, Outcome::Completed),
            Ok(Ok(Resolution::Failed(message))) => (
                OutboundResponse::error(StatusCode::INTERNAL_SERVER_ERROR, message),
                Outcome::CallbackError,
            ),
            Ok(Ok(Resolution::Unhandled)) => (
                OutboundResponse::error(StatusCode::NOT_FOUND, "Not found"),
                Outcome::Unhandled,
            ),
            Ok(Err(_)) => (
                OutboundResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "no response"),
                Outcome::Abandoned,
            ),
            Err(_) => (
                OutboundResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "timeout"),
                Outcome::Timeout,
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "embedded dispatch panicked".to_string()
    }
}
