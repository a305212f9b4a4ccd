//! Rate table and cache state types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Rates keyed by currency code: units of that currency per one unit of the
/// feed's base currency.
///
/// A table is immutable once built; refreshes replace it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    /// Units of `code` per base unit.
    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Currency codes present in the table, sorted.
    pub fn currencies(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.rates.keys().cloned().collect();
        codes.sort();
        codes
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}

/// Wire shape of the upstream feed body.
#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    #[serde(rename = "conversion_rates")]
    pub conversion_rates: HashMap<String, f64>,
}

impl From<FeedResponse> for RateTable {
    fn from(response: FeedResponse) -> Self {
        RateTable::new(response.conversion_rates)
    }
}

/// A rate table together with the instant it was fetched.
#[derive(Debug, Clone)]
pub struct CacheState {
    pub table: Arc<RateTable>,
    pub last_updated: Instant,
}

impl CacheState {
    pub fn new(table: RateTable, last_updated: Instant) -> Self {
        Self {
            table: Arc::new(table),
            last_updated,
        }
    }

    pub fn age(&self) -> Duration {
        self.last_updated.elapsed()
    }

    pub fn is_stale(&self, stale_after: Duration) -> bool {
        self.age() >= stale_after
    }
}
