//! Error responses.
//!
//! # Responsibilities
//! - Map rate and validation errors to HTTP status codes
//! - Render a uniform `{"error", "kind"}` JSON body
//! - Tell clients when to come back (`Retry-After`) while the breaker is open

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::conversion::InvalidRequest;
use crate::rates::RateError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Invalid(InvalidRequest),
    Rate {
        error: RateError,
        retry_after: Option<Duration>,
    },
}

impl ApiError {
    pub fn rate(error: RateError, retry_after: Option<Duration>) -> Self {
        ApiError::Rate { error, retry_after }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Rate { error, .. } => match error {
                RateError::RateNotFound(_) => StatusCode::NOT_FOUND,
                RateError::CircuitOpen | RateError::UpstreamUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Invalid(_) => "invalid_request",
            ApiError::Rate { error, .. } => error.kind(),
        }
    }
}

impl From<InvalidRequest> for ApiError {
    fn from(err: InvalidRequest) -> Self {
        ApiError::Invalid(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (message, retry_after) = match self {
            ApiError::Invalid(e) => (e.to_string(), None),
            ApiError::Rate { error, retry_after } => {
                let retry_after = match error {
                    RateError::CircuitOpen => retry_after,
                    _ => None,
                };
                (error.to_string(), retry_after)
            }
        };

        let mut response = (status, Json(ErrorBody { error: message, kind })).into_response();
        if let Some(wait) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(wait)));
        }
        response
    }
}

/// Whole seconds to wait, rounded up and never zero.
pub fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
