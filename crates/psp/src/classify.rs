//! Translation of provider failures into the engine's error taxonomy.

use payout_core::psp::{PspError, PspErrorKind};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ProviderError,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Provider error codes meaning the connected account cannot cover the request.
const INSUFFICIENT_FUNDS_CODES: [&str; 2] = ["balance_insufficient", "insufficient_funds"];

/// Classifies a non-2xx provider response.
#[must_use]
pub fn classify_response(status: u16, body: &str) -> PspError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let err = envelope.error;
    let code = err.code.as_deref().or(err.decline_code.as_deref());

    let kind = if status == 429 || err.kind.as_deref() == Some("rate_limit_error") {
        PspErrorKind::RateLimit
    } else if code.is_some_and(|c| INSUFFICIENT_FUNDS_CODES.contains(&c)) {
        PspErrorKind::InsufficientFunds
    } else if err.kind.as_deref() == Some("card_error") {
        PspErrorKind::CardDeclined
    } else if status >= 500 || err.kind.as_deref() == Some("api_error") {
        PspErrorKind::Api
    } else if err.kind.as_deref() == Some("invalid_request_error") {
        PspErrorKind::InvalidRequest
    } else {
        PspErrorKind::Unknown
    };

    let message = err
        .message
        .unwrap_or_else(|| format!("provider returned HTTP {status}"));
    let mut error = PspError::new(kind, message).with_http_status(status);
    if let Some(code) = code {
        error = error.with_provider_code(code);
    }
    error
}

/// Classifies a failure to reach the provider or read its response.
#[must_use]
pub fn classify_transport(err: &reqwest::Error) -> PspError {
    let kind = if err.is_connect() || err.is_timeout() || err.is_request() {
        PspErrorKind::ApiConnection
    } else {
        PspErrorKind::Unknown
    };
    PspError::new(kind, err.to_string())
}
