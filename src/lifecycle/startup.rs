//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the upstream fetcher and the rate cache from configuration
//! - Load the first rate table before traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: a failed first fetch is fatal unless explicitly allowed
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::GatewayConfig;
use crate::rates::{HttpRateFetcher, RateCache, RateError, RateFetcher, UpstreamError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build rate feed client: {0}")]
    Client(#[source] UpstreamError),

    #[error("initial rate load failed: {0}")]
    InitialRates(#[source] RateError),
}

/// Build the production rate cache and load its first table.
pub async fn build_rate_cache(config: &GatewayConfig) -> Result<RateCache, StartupError> {
    let fetcher = HttpRateFetcher::new(&config.upstream).map_err(StartupError::Client)?;
    tracing::info!(url = %fetcher.url(), timeout_ms = config.upstream.timeout_ms, "Rate feed configured");
    prime_cache(config, Arc::new(fetcher)).await
}

/// Create a cache over `fetcher` and perform the startup refresh.
pub async fn prime_cache(
    config: &GatewayConfig,
    fetcher: Arc<dyn RateFetcher>,
) -> Result<RateCache, StartupError> {
    let cache = RateCache::new(fetcher, Duration::from_secs(config.cache.stale_after_secs));

    match cache.refresh().await {
        Ok(()) => {
            let summary = cache.summary();
            tracing::info!(currencies = summary.currencies, "Initial rate table loaded");
        }
        Err(e) if config.cache.require_initial_rates => {
            return Err(StartupError::InitialRates(e));
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Initial rate load failed, the first conversion will retry"
            );
        }
    }

    Ok(cache)
}
