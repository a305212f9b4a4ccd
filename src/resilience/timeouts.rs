//! Timeout enforcement.
//!
//! # Design Decisions
//! - Every upstream call has a deadline shorter than the server's request
//!   timeout, so a hung feed surfaces as a breaker-visible failure
//! - Timeout errors are distinct from other transport errors

use std::future::Future;
use std::time::Duration;

use crate::rates::error::UpstreamError;

/// Run `call`, failing with [`UpstreamError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout(limit)),
    }
}
