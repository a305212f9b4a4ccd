//! Upstream rate feed client.
//!
//! # Responsibilities
//! - One GET per refresh against the configured feed URL
//! - Bound the whole round-trip (connect, headers, body) by the fetch timeout
//! - Map transport, status and payload failures onto [`UpstreamError`]

use async_trait::async_trait;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::rates::error::UpstreamError;
use crate::rates::table::{FeedResponse, RateTable};
use crate::resilience::timeouts::with_timeout;

/// Source of complete rate tables.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Fetch a fresh rate table from the feed.
    async fn fetch_rates(&self) -> Result<RateTable, UpstreamError>;
}

/// Fetcher backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpRateFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpRateFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    async fn fetch_rates(&self) -> Result<RateTable, UpstreamError> {
        with_timeout(self.timeout, async {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status(status.as_u16()));
            }

            let body = response.bytes().await.map_err(|e| self.classify(e))?;
            parse_feed(&body)
        })
        .await
    }
}

/// Parse a feed body into a rate table.
///
/// Entries with a non-finite or non-positive rate are dropped; a payload
/// with no usable entries is rejected so it can never replace a good table.
pub fn parse_feed(body: &[u8]) -> Result<RateTable, UpstreamError> {
    let feed: FeedResponse =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;

    let total = feed.conversion_rates.len();
    let table: RateTable = feed
        .conversion_rates
        .into_iter()
        .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
        .collect();

    if table.len() < total {
        tracing::warn!(
            dropped = total - table.len(),
            "Ignoring unusable entries in rate feed"
        );
    }

    if table.is_empty() {
        return Err(UpstreamError::Malformed("feed contained no usable rates".into()));
    }

    Ok(table)
}
