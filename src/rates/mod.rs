//! Rate retrieval subsystem.
//!
//! # Data Flow
//! ```text
//! lookup(code)
//!     → cache.rs (snapshot fresh? answer from it)
//!     → otherwise join or start the single in-flight refresh
//!         → fetcher.rs (GET feed, bounded by fetch timeout, parse table)
//!         → swap in new CacheState on success
//!
//! refresher.rs (background):
//!     every refresh interval → cache.refresh()
//!     on failure → jittered backoff, retry
//! ```
//!
//! # Design Decisions
//! - Tables are replaced wholesale, never merged
//! - Stale data survives a failed refresh but is not served past staleness
//! - The feed client is a trait so tests drive the cache without a network

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod refresher;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheSummary, RateCache};
pub use error::{RateError, RateResult, UpstreamError};
pub use fetcher::{HttpRateFetcher, RateFetcher};
pub use refresher::RateRefresher;
pub use table::{CacheState, RateTable};
