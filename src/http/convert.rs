//! `/convert` handler.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Uri},
    Json,
};
use std::time::Duration;

use crate::conversion::{ConvertRequest, ConvertResponse, InvalidRequest};
use crate::http::request::X_REQUEST_ID;
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Convert an amount. The request is read from a JSON body (any method, any
/// content type) or, when the body is empty, from the query string.
pub async fn convert_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Result<Json<ConvertResponse>, ApiError> {
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let request = parse_request(&uri, &body)?;
    let conversion = request.validate()?;

    match state.converter.convert_validated(&conversion).await {
        Ok(response) => {
            tracing::info!(
                request_id,
                from = %conversion.from,
                to = %conversion.to,
                amount = conversion.amount,
                converted = response.amount,
                "Conversion served"
            );
            Ok(Json(response))
        }
        Err(error) => {
            tracing::warn!(
                request_id,
                from = %conversion.from,
                to = %conversion.to,
                kind = error.kind(),
                error = %error,
                "Conversion failed"
            );
            let retry_after = state
                .converter
                .breaker()
                .retry_after()
                .unwrap_or(Duration::ZERO);
            Err(ApiError::rate(error, Some(retry_after)))
        }
    }
}

fn parse_request(uri: &Uri, body: &[u8]) -> Result<ConvertRequest, InvalidRequest> {
    if !body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice(body).map_err(|e| InvalidRequest::Malformed(e.to_string()));
    }

    if uri.query().is_some_and(|q| !q.is_empty()) {
        return Query::<ConvertRequest>::try_from_uri(uri)
            .map(|Query(request)| request)
            .map_err(|e| InvalidRequest::Malformed(e.body_text()));
    }

    Err(InvalidRequest::Malformed(
        "expected a JSON body or fromCurrency, toCurrency and amount query parameters".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_json_body() {
        let uri: Uri = "/convert".parse().unwrap();
        let request = parse_request(
            &uri,
            br#"{"fromCurrency":"LKR","toCurrency":"USD","amount":3140}"#,
        )
        .unwrap();
        assert_eq!(request.from_currency, "LKR");
        assert_eq!(request.amount, 3140.0);
    }

    #[test]
    fn test_body_wins_over_query() {
        let uri: Uri = "/convert?fromCurrency=EUR&toCurrency=USD&amount=1"
            .parse()
            .unwrap();
        let request = parse_request(
            &uri,
            br#"{"fromCurrency":"LKR","toCurrency":"USD","amount":5}"#,
        )
        .unwrap();
        assert_eq!(request.from_currency, "LKR");
    }

    #[test]
    fn test_falls_back_to_query_string() {
        let uri: Uri = "/convert?fromCurrency=LKR&toCurrency=USD&amount=3140"
            .parse()
            .unwrap();
        let request = parse_request(&uri, b"  \n").unwrap();
        assert_eq!(request.to_currency, "USD");
        assert_eq!(request.amount, 3140.0);
    }

    #[test]
    fn test_malformed_inputs() {
        let uri: Uri = "/convert".parse().unwrap();
        assert!(matches!(
            parse_request(&uri, b"{not json"),
            Err(InvalidRequest::Malformed(_))
        ));
        assert!(matches!(
            parse_request(&uri, b""),
            Err(InvalidRequest::Malformed(_))
        ));
        assert!(matches!(
            parse_request(&uri, br#"{"fromCurrency":"LKR"}"#),
            Err(InvalidRequest::Malformed(_))
        ));

        let uri: Uri = "/convert?fromCurrency=LKR&amount=abc".parse().unwrap();
        assert!(matches!(
            parse_request(&uri, b""),
            Err(InvalidRequest::Malformed(_))
        ));
    }
}
