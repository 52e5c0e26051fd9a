//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request adapter settings.
    pub adapter: AdapterConfig,

    /// CORS preflight answers.
    pub cors: CorsConfig,

    /// Backend service the embedded app forwards to.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Path prefix prepended to forwarded segments, also where the adapter is mounted.
    pub mount_prefix: String,

    /// How long to wait for the embedded framework to respond, in milliseconds.
    pub timeout_ms: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mount_prefix: "/api".to_string(),
            timeout_ms: 10_000,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// CORS preflight configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `Access-Control-Allow-Origin` value.
    pub allow_origin: String,

    /// Methods listed in `Access-Control-Allow-Methods`.
    pub allow_methods: Vec<String>,

    /// Headers listed in `Access-Control-Allow-Headers`.
    pub allow_headers: Vec<String>,

    /// Optional `Access-Control-Max-Age` in seconds.
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            max_age_secs: None,
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Forward unmatched API requests to the backend.
    pub enabled: bool,

    /// Backend base URL (e.g., "http://127.0.0.1:5000").
    pub base_url: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Maximum backend response size in bytes.
    pub max_response_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout_ms: 2_000,
            max_response_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
