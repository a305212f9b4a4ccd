//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the conversion gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Server-side timeouts.
    pub timeouts: TimeoutConfig,

    /// Upstream rate feed.
    pub upstream: UpstreamConfig,

    /// Rate cache staleness and refresh cadence.
    pub cache: CacheConfig,

    /// Circuit breaker thresholds.
    pub breaker: BreakerConfig,

    /// Request rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API.
    pub admin: AdminConfig,
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

/// Timeout configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            shutdown_grace_secs: 10,
        }
    }
}

/// Upstream rate feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Feed URL returning `{"conversion_rates": {...}}`.
    pub url: String,

    /// Deadline for one fetch, in milliseconds. Must stay below the request timeout.
    pub timeout_ms: u64,

    /// User-Agent sent to the feed.
    pub user_agent: String,

    /// Honour HTTP(S)_PROXY environment variables when calling the feed.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "https://v6.exchangerate-api.com/v6/YOUR-API-KEY/latest/USD".to_string(),
            timeout_ms: 10_000,
            user_agent: concat!("fx-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
            use_system_proxy: true,
        }
    }
}

/// Rate cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which a lookup forces a refresh, in seconds.
    pub stale_after_secs: u64,

    /// Background refresh interval in seconds (0 disables it).
    pub refresh_interval_secs: u64,

    /// Refuse to start when the initial fetch fails.
    pub require_initial_rates: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 3 * 60 * 60,
            refresh_interval_secs: 60 * 60,
            require_initial_rates: true,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Time an open breaker waits before probing, in milliseconds.
    pub cool_down_ms: u64,

    /// Consecutive failures tolerated; one more trips the breaker.
    pub failure_threshold: u32,

    /// Latency percentile above which the breaker trips, in milliseconds.
    pub latency_threshold_ms: u64,

    /// Percentile compared against the latency threshold (0-100).
    pub latency_percentile: u8,

    /// Number of recent latencies kept.
    pub window_capacity: usize,

    /// Probe calls admitted while half-open.
    pub half_open_probes: u32,

    /// Latency reported while the window is empty, in milliseconds.
    pub default_latency_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            cool_down_ms: 5_000,
            failure_threshold: 5,
            latency_threshold_ms: 600,
            latency_percentile: 90,
            window_capacity: 100,
            half_open_probes: 3,
            default_latency_ms: 200,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second across all clients.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
