//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, percentiles in range)
//! - Check cross-field constraints (fetch deadline below request timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a config value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    match url::Url::parse(&config.upstream.url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ValidationError::new(
            "upstream.url",
            format!("unsupported scheme '{}'", parsed.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.url", e.to_string())),
    }

    if config.upstream.timeout_ms == 0 {
        errors.push(ValidationError::new("upstream.timeout_ms", "must be > 0"));
    } else if config.upstream.timeout_ms >= config.timeouts.request_secs.saturating_mul(1000) {
        errors.push(ValidationError::new(
            "upstream.timeout_ms",
            "must be below timeouts.request_secs",
        ));
    }

    if config.cache.stale_after_secs == 0 {
        errors.push(ValidationError::new("cache.stale_after_secs", "must be > 0"));
    }

    let breaker = &config.breaker;
    if breaker.cool_down_ms == 0 {
        errors.push(ValidationError::new("breaker.cool_down_ms", "must be > 0"));
    }
    if breaker.latency_threshold_ms == 0 {
        errors.push(ValidationError::new("breaker.latency_threshold_ms", "must be > 0"));
    }
    if breaker.latency_percentile > 100 {
        errors.push(ValidationError::new(
            "breaker.latency_percentile",
            "must be between 0 and 100",
        ));
    }
    if breaker.window_capacity == 0 {
        errors.push(ValidationError::new("breaker.window_capacity", "must be > 0"));
    }
    if breaker.half_open_probes == 0 {
        errors.push(ValidationError::new("breaker.half_open_probes", "must be > 0"));
    }

    let limits = &config.rate_limit;
    if limits.enabled {
        if limits.requests_per_second == 0 {
            errors.push(ValidationError::new(
                "rate_limit.requests_per_second",
                "must be > 0 when rate limiting is enabled",
            ));
        }
        if limits.burst_size == 0 {
            errors.push(ValidationError::new(
                "rate_limit.burst_size",
                "must be > 0 when rate limiting is enabled",
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must be set when the admin API is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
