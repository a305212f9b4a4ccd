use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::rates::CacheSummary;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breaker_state: &'static str,
    pub rates_loaded: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        breaker_state: state.breaker.state().as_str(),
        rates_loaded: state.cache.snapshot().is_some(),
    })
}

pub async fn get_breaker(State(state): State<AppState>) -> Json<BreakerSnapshot> {
    Json(state.breaker.snapshot())
}

pub async fn get_rates(State(state): State<AppState>) -> Json<CacheSummary> {
    Json(state.cache.summary())
}

/// Force a refresh of the rate table, bypassing the breaker.
pub async fn post_refresh(State(state): State<AppState>) -> Result<Json<CacheSummary>, ApiError> {
    match state.cache.refresh().await {
        Ok(()) => {
            tracing::info!("Rate table refreshed via admin API");
            Ok(Json(state.cache.summary()))
        }
        Err(error) => {
            tracing::warn!(error = %error, "Admin-triggered rate refresh failed");
            Err(ApiError::rate(error, None))
        }
    }
}
