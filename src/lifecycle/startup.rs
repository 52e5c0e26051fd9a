//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the embedded application once, before traffic
//! - Start the metrics exporter when enabled
//! - Bind the listener last
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, GatewayConfig};
use crate::embedded::{self, DispatchError};
use crate::http::GatewayServer;
use crate::observability::metrics;

/// Errors that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("embedded application: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A server ready to accept traffic on its bound listener.
pub struct Started {
    pub server: GatewayServer,
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
}

/// Initialize every subsystem in dependency order and bind the listener.
pub async fn start(config: GatewayConfig) -> Result<Started, StartupError> {
    let app = embedded::build_app(&config)?;
    tracing::debug!(app = ?app, "Embedded application built");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let bind_address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address: bind_address,
        source,
    })?;

    let server = GatewayServer::new(config, Arc::new(app));
    Ok(Started {
        server,
        listener,
        local_addr,
    })
}
