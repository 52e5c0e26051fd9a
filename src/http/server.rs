//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router mounting the adapter at the API wildcard route
//! - Wire up middleware (tracing, request ID)
//! - Collect request bodies under the size limit (JSON 413 past it) and hand
//!   requests to the adapter
//! - Serve with graceful shutdown

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::adapter::{Adapter, InboundRequest, OutboundResponse};
use crate::config::GatewayConfig;
use crate::embedded::Dispatch;
use crate::http::request::MakeRequestUuidV4;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<Adapter>,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new server around an already constructed dispatch function.
    pub fn new(config: GatewayConfig, dispatch: Arc<dyn Dispatch>) -> Self {
        let adapter = Arc::new(Adapter::new(&config.adapter, &config.cors, dispatch));
        let state = AppState {
            adapter,
            max_body_bytes: config.adapter.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let prefix = config.adapter.mount_prefix.trim_end_matches('/');

        Router::new()
            .route(&format!("{prefix}/{{*path}}"), any(adapter_handler))
            .route(prefix, any(adapter_root_handler))
            .route("/health", get(health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The configured router, for embedding or testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_prefix = %self.config.adapter.mount_prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn adapter_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Response {
    let segments = path.split('/').map(str::to_owned).collect();
    adapt(state, segments, request).await
}

async fn adapter_root_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    adapt(state, Vec::new(), request).await
}

async fn adapt(state: AppState, segments: Vec<String>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let raw_body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return OutboundResponse::error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
                .into_response();
        }
    };

    let inbound = InboundRequest::from_parts(parts, segments, raw_body);
    state.adapter.handle(inbound).await.into_response()
}

async fn health() -> &'static str {
    "OK"
}
