//! Wire types for the conversion endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest currency code accepted.
pub const MAX_CODE_LEN: usize = 10;

/// Inbound conversion request, as sent by clients.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConvertRequest {
    #[serde(rename = "fromCurrency")]
    pub from_currency: String,
    #[serde(rename = "toCurrency")]
    pub to_currency: String,
    pub amount: f64,
}

/// Converted amount, labelled with the requested target currency.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConvertResponse {
    pub amount: f64,
    pub currency: String,
}

/// A request that passed validation, with codes normalised to upper case.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

/// Rejected client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("{field} must not be empty")]
    EmptyCode { field: &'static str },

    #[error("{field} '{code}' is not a valid currency code")]
    BadCode { field: &'static str, code: String },

    #[error("amount must be a finite, non-negative number")]
    BadAmount,

    #[error("malformed request: {0}")]
    Malformed(String),
}

impl ConvertRequest {
    pub fn validate(&self) -> Result<Conversion, InvalidRequest> {
        let from = normalize_code("fromCurrency", &self.from_currency)?;
        let to = normalize_code("toCurrency", &self.to_currency)?;
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(InvalidRequest::BadAmount);
        }
        Ok(Conversion {
            from,
            to,
            amount: self.amount,
        })
    }
}

fn normalize_code(field: &'static str, raw: &str) -> Result<String, InvalidRequest> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(InvalidRequest::EmptyCode { field });
    }
    if code.len() > MAX_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(InvalidRequest::BadCode {
            field,
            code: code.to_string(),
        });
    }
    Ok(code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(from: &str, to: &str, amount: f64) -> ConvertRequest {
        ConvertRequest {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            amount,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let parsed: ConvertRequest =
            serde_json::from_str(r#"{"fromCurrency":"LKR","toCurrency":"USD","amount":3140}"#)
                .unwrap();
        assert_eq!(parsed, request("LKR", "USD", 3140.0));

        let body = serde_json::to_value(ConvertResponse {
            amount: 10.0,
            currency: "USD".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"amount": 10.0, "currency": "USD"}));
    }

    #[test]
    fn test_codes_are_trimmed_and_uppercased() {
        let conversion = request(" lkr ", "usd", 5.0).validate().unwrap();
        assert_eq!(conversion.from, "LKR");
        assert_eq!(conversion.to, "USD");
    }

    #[test]
    fn test_rejects_bad_codes() {
        assert_eq!(
            request("", "USD", 1.0).validate(),
            Err(InvalidRequest::EmptyCode { field: "fromCurrency" })
        );
        assert!(matches!(
            request("US-D", "USD", 1.0).validate(),
            Err(InvalidRequest::BadCode { field: "fromCurrency", .. })
        ));
        assert!(matches!(
            request("USD", "ABCDEFGHIJK", 1.0).validate(),
            Err(InvalidRequest::BadCode { field: "toCurrency", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_amounts() {
        for amount in [-1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                request("USD", "LKR", amount).validate(),
                Err(InvalidRequest::BadAmount)
            );
        }
        assert!(request("USD", "LKR", 0.0).validate().is_ok());
    }
}
