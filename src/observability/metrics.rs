//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): adapted requests by method, status, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by method, outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Outcome label distinguishes normal completion from fallback responses

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one adapted request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome,
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "outcome" => outcome,
    )
    .record(elapsed);
}
