//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the mount prefix and upstream URL shape
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("adapter.mount_prefix `{0}` must start with `/` and name at least one segment")]
    MountPrefix(String),

    #[error("adapter.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("adapter.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("cors.{0} must not be empty")]
    EmptyCors(&'static str),

    #[error("upstream.base_url `{0}` must be an absolute http URL")]
    UpstreamUrl(String),

    #[error("upstream.connect_timeout_ms must be greater than zero")]
    ZeroConnectTimeout,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let prefix = &config.adapter.mount_prefix;
    if !prefix.starts_with('/') || prefix.trim_matches('/').is_empty() || prefix.contains(['?', '#', '{', '}']) {
        errors.push(ValidationError::MountPrefix(prefix.clone()));
    }
    if config.adapter.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.adapter.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.cors.allow_origin.trim().is_empty() {
        errors.push(ValidationError::EmptyCors("allow_origin"));
    }
    if config.cors.allow_methods.is_empty() {
        errors.push(ValidationError::EmptyCors("allow_methods"));
    }

    if config.upstream.enabled {
        let valid = url::Url::parse(&config.upstream.base_url)
            .map(|u| u.scheme() == "http" && u.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone()));
        }
        if config.upstream.connect_timeout_ms == 0 {
            errors.push(ValidationError::ZeroConnectTimeout);
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
