//! Storefront API gateway (v1)
//!
//! Serves the storefront's `/api` surface and bridges it onto the embedded
//! dispatch framework, which answers its own routes and relays the rest to
//! the backend service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                   STOREFRONT GATEWAY                 │
//!                    │                                                      │
//!   Client Request   │  ┌─────────┐    ┌──────────┐    ┌────────────────┐   │
//!   ─────────────────┼─▶│  http   │───▶│ adapter  │───▶│   embedded     │   │
//!                    │  │ server  │    │ inbound/ │    │ App (routes)   │   │
//!                    │  └─────────┘    │ synthetic│    └───────┬────────┘   │
//!                    │                 └────┬─────┘            │ fallback   │
//!                    │                      │                  ▼            │
//!   Client Response  │                 ┌────┴─────┐    ┌────────────────┐   │
//!   ◀────────────────┼─────────────────│ outbound │◀───│   upstream     │◀──┼── Backend
//!                    │                 └──────────┘    └────────────────┘   │
//!                    │                                                      │
//!                    │   config · observability · lifecycle                 │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use storefront_gateway::config::{self, GatewayConfig};
use storefront_gateway::lifecycle::{self, signals, Shutdown};
use storefront_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "storefront-gateway")]
#[command(about = "API gateway bridging the storefront onto its backend", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    logging::init_tracing(&config.observability)?;

    tracing::info!("storefront-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount_prefix = %config.adapter.mount_prefix,
        timeout_ms = config.adapter.timeout_ms,
        upstream_enabled = config.upstream.enabled,
        "Configuration loaded"
    );

    let started = lifecycle::start(config).await?;
    tracing::info!(address = %started.local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(&shutdown);

    started.server.run(started.listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
