//! Error taxonomy for rate retrieval.

use std::time::Duration;
use thiserror::Error;

/// Why a call to the upstream rate feed failed.
///
/// Every variant collapses to [`RateError::UpstreamUnavailable`] for breaker
/// purposes; the variant itself is kept so logs can name the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Connection, DNS, TLS or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The feed did not answer within the fetch timeout.
    #[error("rate feed timed out after {0:?}")]
    Timeout(Duration),

    /// The feed answered with a non-success status.
    #[error("rate feed returned HTTP {0}")]
    Status(u16),

    /// The body was not a `{"conversion_rates": {...}}` document.
    #[error("malformed rate payload: {0}")]
    Malformed(String),
}

/// Errors surfaced by the rate core to its callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// The feed could not be reached or parsed. Retryable.
    #[error("exchange rate feed unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),

    /// The requested currency code is absent from the rate table.
    #[error("exchange rate not available for {0}")]
    RateNotFound(String),

    /// The circuit breaker is rejecting calls until its cool-down elapses.
    #[error("circuit open: rate service is cooling down")]
    CircuitOpen,
}

impl RateError {
    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RateError::RateNotFound(_))
    }

    /// Stable tag used in error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RateError::UpstreamUnavailable(_) => "upstream_unavailable",
            RateError::RateNotFound(_) => "rate_not_found",
            RateError::CircuitOpen => "circuit_open",
        }
    }

    /// Whether this outcome counts against the upstream's health.
    ///
    /// A missing currency code is a client problem: the feed answered fine.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, RateError::UpstreamUnavailable(_))
    }
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;
