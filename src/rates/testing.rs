//! Test doubles for the rate feed.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::rates::error::UpstreamError;
use crate::rates::fetcher::RateFetcher;
use crate::rates::table::RateTable;

/// Fetcher whose answers, failures and delay are set by the test.
pub struct ScriptedFetcher {
    rates: Mutex<RateTable>,
    failure: Mutex<Option<UpstreamError>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn with_rates(rates: &[(&str, f64)]) -> Self {
        Self {
            rates: Mutex::new(table(rates)),
            failure: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_rates(&self, rates: &[(&str, f64)]) {
        *self.rates.lock().unwrap() = table(rates);
    }

    pub fn fail_with(&self, error: UpstreamError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateFetcher for ScriptedFetcher {
    async fn fetch_rates(&self) -> Result<RateTable, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(self.rates.lock().unwrap().clone()),
        }
    }
}

fn table(rates: &[(&str, f64)]) -> RateTable {
    rates
        .iter()
        .map(|(code, rate)| (code.to_string(), *rate))
        .collect()
}
