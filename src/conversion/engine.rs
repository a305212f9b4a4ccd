//! Conversion on top of the guarded rate lookup.

use std::sync::Arc;

use crate::conversion::types::{Conversion, ConvertResponse};
use crate::rates::RateResult;
use crate::resilience::CircuitBreaker;

/// Converts amounts quoted in a source currency into the feed's base currency.
///
/// Every rate in the table is "units of code per one base unit", so the
/// converted amount is `amount / rate(from)`. The target code only labels the
/// result.
#[derive(Clone)]
pub struct Converter {
    breaker: Arc<CircuitBreaker>,
}

impl Converter {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }

    pub async fn convert(&self, from: &str, amount: f64, to: &str) -> RateResult<ConvertResponse> {
        let rate = self.breaker.execute(from, to).await?;
        let converted = amount / rate;

        tracing::debug!(from, to, amount, rate, converted, "Converted amount");
        Ok(ConvertResponse {
            amount: converted,
            currency: to.to_string(),
        })
    }

    pub async fn convert_validated(&self, conversion: &Conversion) -> RateResult<ConvertResponse> {
        self.convert(&conversion.from, conversion.amount, &conversion.to)
            .await
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}
