//! Time-bounded rate cache with single-flight refresh.
//!
//! # Design Decisions
//! - The current [`CacheState`] sits behind an `ArcSwapOption`: readers load a
//!   whole snapshot, writers swap in a whole snapshot, so no reader ever sees
//!   a table from one fetch paired with the timestamp of another
//! - Refreshes are coalesced: the first caller to find the table stale starts
//!   a shared refresh future, later callers await that same future and
//!   receive its result (success or failure)
//! - The refresh runs on its own task; a cancelled caller does not stall it
//! - A failed refresh leaves the previous snapshot in place

use arc_swap::ArcSwapOption;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::rates::error::{RateError, RateResult, UpstreamError};
use crate::rates::fetcher::RateFetcher;
use crate::rates::table::CacheState;

type RefreshFlight = Shared<BoxFuture<'static, RateResult<Arc<CacheState>>>>;

struct CacheInner {
    fetcher: Arc<dyn RateFetcher>,
    state: ArcSwapOption<CacheState>,
    in_flight: Mutex<Option<RefreshFlight>>,
    stale_after: Duration,
}

/// Point-in-time description of the cache, for the admin API.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CacheSummary {
    pub populated: bool,
    pub currencies: usize,
    pub age_secs: Option<u64>,
    pub stale: bool,
}

/// Shared handle to the rate cache.
#[derive(Clone)]
pub struct RateCache {
    inner: Arc<CacheInner>,
}

impl fmt::Debug for RateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateCache")
            .field("stale_after", &self.inner.stale_after)
            .field("summary", &self.summary())
            .finish()
    }
}

impl RateCache {
    /// Create an empty cache. The first lookup triggers a refresh.
    pub fn new(fetcher: Arc<dyn RateFetcher>, stale_after: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                state: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
                stale_after,
            }),
        }
    }

    /// Rate for `code`, refreshing first if the table is absent or stale.
    pub async fn lookup(&self, code: &str) -> RateResult<f64> {
        let state = match self.inner.state.load_full() {
            Some(state) if !state.is_stale(self.inner.stale_after) => state,
            _ => self.join_refresh().await?,
        };

        state
            .table
            .get(code)
            .ok_or_else(|| RateError::RateNotFound(code.to_string()))
    }

    /// Fetch a new table now, regardless of staleness.
    pub async fn refresh(&self) -> RateResult<()> {
        self.join_refresh().await.map(|_| ())
    }

    /// The current snapshot, if any fetch has succeeded yet.
    pub fn snapshot(&self) -> Option<Arc<CacheState>> {
        self.inner.state.load_full()
    }

    pub fn stale_after(&self) -> Duration {
        self.inner.stale_after
    }

    pub fn summary(&self) -> CacheSummary {
        match self.snapshot() {
            Some(state) => CacheSummary {
                populated: true,
                currencies: state.table.len(),
                age_secs: Some(state.age().as_secs()),
                stale: state.is_stale(self.inner.stale_after),
            },
            None => CacheSummary {
                populated: false,
                currencies: 0,
                age_secs: None,
                stale: true,
            },
        }
    }

    /// Await the in-flight refresh, starting one if none is running.
    async fn join_refresh(&self) -> RateResult<Arc<CacheState>> {
        let flight = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .expect("refresh slot mutex poisoned");
            match slot.as_ref() {
                Some(flight) => {
                    tracing::debug!("Joining in-flight rate refresh");
                    flight.clone()
                }
                None => {
                    let flight = spawn_refresh(self.inner.clone());
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }
}

/// Run the refresh as its own task so it completes even if every caller
/// awaiting it is cancelled.
fn spawn_refresh(inner: Arc<CacheInner>) -> RefreshFlight {
    let handle = tokio::spawn(run_refresh(inner.clone()));
    handle
        .map(move |joined| match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Rate refresh task failed");
                *inner.in_flight.lock().expect("refresh slot mutex poisoned") = None;
                Err(RateError::from(UpstreamError::Transport(format!(
                    "refresh task failed: {e}"
                ))))
            }
        })
        .boxed()
        .shared()
}

async fn run_refresh(inner: Arc<CacheInner>) -> RateResult<Arc<CacheState>> {
    let started = Instant::now();
    let result = match inner.fetcher.fetch_rates().await {
        Ok(table) => {
            let state = Arc::new(CacheState::new(table, Instant::now()));
            inner.state.store(Some(state.clone()));
            tracing::info!(
                currencies = state.table.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Exchange rates updated"
            );
            metrics::record_rate_refresh("success");
            metrics::record_rate_table_size(state.table.len());
            Ok(state)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Failed to fetch exchange rates"
            );
            metrics::record_rate_refresh("failure");
            Err(RateError::from(e))
        }
    };

    *inner.in_flight.lock().expect("refresh slot mutex poisoned") = None;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::error::UpstreamError;
    use crate::rates::testing::ScriptedFetcher;
    use futures_util::future::join_all;

    const THREE_HOURS: Duration = Duration::from_secs(3 * 3600);

    fn cache_with(fetcher: &Arc<ScriptedFetcher>) -> RateCache {
        RateCache::new(fetcher.clone(), THREE_HOURS)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_respects_staleness_window() {
        let fetcher = Arc::new(ScriptedFetcher::with_rates(&[("USD", 1.0), ("LKR", 314.0)]));
        let cache = cache_with(&fetcher);

        assert_eq!(cache.lookup("LKR").await, Ok(314.0));
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(THREE_HOURS - Duration::from_secs(1)).await;
        assert_eq!(cache.lookup("USD").await, Ok(1.0));
        assert_eq!(fetcher.calls(), 1, "fresh table must not hit the feed");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.lookup("USD").await, Ok(1.0));
        assert_eq!(fetcher.calls(), 2, "table at the staleness threshold must refresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_table() {
        let fetcher = Arc::new(ScriptedFetcher::with_rates(&[("LKR", 314.0)]));
        let cache = cache_with(&fetcher);
        cache.refresh().await.unwrap();
        let before = cache.snapshot().unwrap();

        fetcher.fail_with(UpstreamError::Status(503));
        tokio::time::advance(THREE_HOURS).await;

        let err = cache.lookup("LKR").await.unwrap_err();
        assert!(matches!(err, RateError::UpstreamUnavailable(UpstreamError::Status(503))));

        let after = cache.snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.last_updated, before.last_updated);
        assert_eq!(after.table.get("LKR"), Some(314.0));
    }

    #[tokio::test]
    async fn test_first_fetch_failure_has_nothing_to_serve() {
        let fetcher = Arc::new(ScriptedFetcher::with_rates(&[("LKR", 314.0)]));
        fetcher.fail_with(UpstreamError::Transport("connection refused".into()));
        let cache = cache_with(&fetcher);

        assert!(matches!(
            cache.lookup("LKR").await,
            Err(RateError::UpstreamUnavailable(_))
        ));
        assert!(cache.snapshot().is_none());
        assert!(!cache.summary().populated);
    }

    #[tokio::test]
    async fn test_missing_currency() {
        let fetcher = Arc::new(ScriptedFetcher::with_rates(&[("USD", 1.0)]));
        let cache = cache_with(&fetcher);

        assert_eq!(
            cache.lookup("XYZ").await,
            Err(RateError::RateNotFound("XYZ".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_lookups_share_one_fetch() {
        let fetcher = Arc::new(
            ScriptedFetcher::with_rates(&[("LKR", 314.0)]).with_delay(Duration::from_millis(250)),
        );
        let cache = cache_with(&fetcher);

        let lookups = (0..16).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.lookup("LKR").await })
        });
        for result in join_all(lookups).await {
            assert_eq!(result.unwrap(), Ok(314.0));
        }

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_waiters_share_failure() {
        let fetcher = Arc::new(
            ScriptedFetcher::with_rates(&[("LKR", 314.0)]).with_delay(Duration::from_millis(250)),
        );
        fetcher.fail_with(UpstreamError::Timeout(Duration::from_secs(10)));
        let cache = cache_with(&fetcher);

        let (a, b) = tokio::join!(cache.lookup("LKR"), cache.lookup("LKR"));
        assert!(matches!(a, Err(RateError::UpstreamUnavailable(_))));
        assert_eq!(a, b);
        assert_eq!(fetcher.calls(), 1);

        // The slot is released, so the next attempt fetches again.
        fetcher.recover();
        assert_eq!(cache.lookup("LKR").await, Ok(314.0));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_refresh_replaces_table() {
        let fetcher = Arc::new(ScriptedFetcher::with_rates(&[("LKR", 314.0)]));
        let cache = cache_with(&fetcher);
        cache.refresh().await.unwrap();

        fetcher.set_rates(&[("LKR", 320.0), ("GBP", 0.73)]);
        tokio::time::advance(Duration::from_secs(60)).await;
        cache.refresh().await.unwrap();

        let state = cache.snapshot().unwrap();
        assert_eq!(state.table.get("LKR"), Some(320.0));
        assert_eq!(state.table.len(), 2);
        assert_eq!(state.age(), Duration::ZERO);
        assert_eq!(cache.summary().currencies, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_survives_cancelled_caller() {
        let fetcher = Arc::new(
            ScriptedFetcher::with_rates(&[("USD", 1.0), ("LKR", 314.0)])
                .with_delay(Duration::from_millis(100)),
        );
        let cache = cache_with(&fetcher);

        let abandoned = tokio::time::timeout(Duration::from_millis(30), cache.lookup("LKR")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cache.snapshot().is_some());
        assert_eq!(fetcher.calls(), 1);

        assert_eq!(cache.lookup("LKR").await, Ok(314.0));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_waiter_joins_refresh_of_cancelled_caller() {
        let fetcher = Arc::new(
            ScriptedFetcher::with_rates(&[("LKR", 314.0)]).with_delay(Duration::from_millis(100)),
        );
        let cache = cache_with(&fetcher);

        let abandoned = tokio::time::timeout(Duration::from_millis(30), cache.lookup("LKR")).await;
        assert!(abandoned.is_err());

        // Joins the refresh already running, then gets its result.
        assert_eq!(cache.lookup("LKR").await, Ok(314.0));
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_debug_shows_summary() {
        let fetcher = Arc::new(ScriptedFetcher::with_rates(&[("LKR", 314.0)]));
        let cache = cache_with(&fetcher);

        let rendered = format!("{cache:?}");
        assert!(rendered.starts_with("RateCache"));
        assert!(rendered.contains("populated: false"));
    }
}
