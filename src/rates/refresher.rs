//! Periodic background refresh of the rate table.
//!
//! # Responsibilities
//! - Refresh the cache on a fixed interval so lookups rarely pay for a fetch
//! - After a failed refresh, retry on a jittered exponential backoff instead
//!   of waiting out the full interval
//! - Exit when the shutdown signal fires

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::CacheConfig;
use crate::rates::cache::RateCache;
use crate::resilience::backoff::calculate_backoff;

const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_MAX: Duration = Duration::from_secs(60);

pub struct RateRefresher {
    cache: RateCache,
    interval: Duration,
}

impl RateRefresher {
    pub fn new(cache: RateCache, config: &CacheConfig) -> Self {
        Self {
            cache,
            interval: Duration::from_secs(config.refresh_interval_secs),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Periodic rate refresh disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Rate refresher starting"
        );

        let mut failures: u32 = 0;
        loop {
            let wait = if failures == 0 {
                self.interval
            } else {
                calculate_backoff(failures, RETRY_BASE, RETRY_MAX)
            };

            tokio::select! {
                _ = time::sleep(wait) => {
                    match self.cache.refresh().await {
                        Ok(()) => {
                            if failures > 0 {
                                tracing::info!(failed_attempts = failures, "Rate refresh recovered");
                            }
                            failures = 0;
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            tracing::warn!(
                                error = %e,
                                attempt = failures,
                                "Periodic rate refresh failed, backing off"
                            );
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
