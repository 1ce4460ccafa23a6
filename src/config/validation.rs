//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and value ranges (timeouts > 0, queue sizes > 0)
//! - Check feature dependencies (gateway forwarding needs a gateway URL)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SidecarConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::SidecarConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SidecarConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.module.id.trim().is_empty() {
        errors.push(ValidationError::new("module.id", "must not be blank"));
    }
    if config.module.name.trim().is_empty() {
        errors.push(ValidationError::new("module.name", "must not be blank"));
    }
    check_url(&mut errors, "module.url", &config.module.url);
    check_url(&mut errors, "control_plane.url", &config.control_plane.url);

    if config.control_plane.request_timeout_secs == 0 {
        errors.push(ValidationError::new("control_plane.request_timeout_secs", "must be positive"));
    }
    if config.control_plane.bootstrap_retry.max_attempts == 0 {
        errors.push(ValidationError::new("control_plane.bootstrap_retry.max_attempts", "must be positive"));
    }

    match (&config.routing.gateway_url, config.routing.forward_unknown_requests) {
        (Some(url), _) => check_url(&mut errors, "routing.gateway_url", url),
        (None, true) => errors.push(ValidationError::new(
            "routing.gateway_url",
            "required when forward_unknown_requests is enabled",
        )),
        (None, false) => {}
    }
    if config.routing.discovery_cache.max_entries == 0 {
        errors.push(ValidationError::new("routing.discovery_cache.max_entries", "must be positive"));
    }
    if config.routing.discovery_cache.ttl_secs == 0 {
        errors.push(ValidationError::new("routing.discovery_cache.ttl_secs", "must be positive"));
    }

    if config.proxy.request_timeout_ms == 0 {
        errors.push(ValidationError::new("proxy.request_timeout_ms", "must be positive"));
    }
    if config.proxy.write_queue_frames == 0 {
        errors.push(ValidationError::new("proxy.write_queue_frames", "must be positive"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(field, format!("unsupported scheme '{}'", url.scheme()))),
        Err(e) => errors.push(ValidationError::new(field, e.to_string())),
    }
}
