//! Stripe-compatible HTTP gateway.

use std::time::Duration;

use async_trait::async_trait;
use payout_core::psp::{
    PayoutRequest, PspError, PspErrorKind, PspGateway, PspPayout, PspTransfer, TransferRequest,
};
use payout_shared::config::PspConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::classify::{classify_response, classify_transport};

/// Header naming the connected account a request acts on.
const CONNECTED_ACCOUNT_HEADER: &str = "Stripe-Account";
/// Header carrying the provider idempotency key.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Gateway speaking the Stripe REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    /// Builds a gateway from configuration.
    pub fn new(config: &PspConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Sends the request and returns the body of a successful response.
    async fn send_text(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(u16, String), PspError> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;

        if !status.is_success() {
            return Err(classify_response(status.as_u16(), &body));
        }
        Ok((status.as_u16(), body))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(T, Value), PspError> {
        let (status, body) = self.send_text(request).await?;
        let raw: Value = serde_json::from_str(&body).map_err(|e| {
            PspError::new(PspErrorKind::Unknown, format!("malformed provider response: {e}"))
                .with_http_status(status)
        })?;
        let parsed = serde_json::from_value(raw.clone()).map_err(|e| {
            PspError::new(PspErrorKind::Unknown, format!("unexpected provider response: {e}"))
                .with_http_status(status)
        })?;
        Ok((parsed, raw))
    }
}

/// Available balance in a balance response body, or `0` when the body is
/// not JSON or carries no usable amount.
#[must_use]
pub fn balance_from_body(body: &str) -> i64 {
    match serde_json::from_str::<Value>(body) {
        Ok(raw) => available_amount(&raw),
        Err(e) => {
            tracing::warn!(error = %e, "Malformed balance response, assuming zero");
            0
        }
    }
}

/// First available balance amount, or `0` when the body has none.
#[must_use]
pub fn available_amount(body: &Value) -> i64 {
    body.get("available")
        .and_then(|a| a.get(0))
        .and_then(|entry| entry.get("amount"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

/// Form fields for a transfer.
#[must_use]
pub fn transfer_form(request: &TransferRequest) -> Vec<(&'static str, String)> {
    vec![
        ("amount", request.amount.to_string()),
        ("currency", request.currency.clone()),
        ("destination", request.destination.clone()),
        ("description", request.description.clone()),
    ]
}

/// Form fields for a payout.
#[must_use]
pub fn payout_form(request: &PayoutRequest) -> Vec<(&'static str, String)> {
    vec![
        ("amount", request.amount.to_string()),
        ("currency", request.currency.clone()),
        ("destination", request.destination.clone()),
        ("method", request.method.clone()),
        ("statement_descriptor", request.statement_descriptor.clone()),
    ]
}

#[derive(serde::Deserialize)]
struct TransferBody {
    id: String,
    amount: i64,
    currency: String,
    destination: String,
}

#[derive(serde::Deserialize)]
struct PayoutBody {
    id: String,
    status: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    destination: Option<String>,
}

#[async_trait]
impl PspGateway for StripeGateway {
    async fn retrieve_balance(
        &self,
        connected_account_id: &str,
        country: &str,
    ) -> Result<i64, PspError> {
        let (_, body) = self
            .send_text(
                self.client
                    .get(self.url("/v1/balance"))
                    .header(CONNECTED_ACCOUNT_HEADER, connected_account_id),
            )
            .await?;
        let amount = balance_from_body(&body);
        tracing::debug!(connected_account_id, country, amount, "Retrieved sub-account balance");
        Ok(amount)
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<PspTransfer, PspError> {
        let (body, _): (TransferBody, Value) = self
            .send(
                self.client
                    .post(self.url("/v1/transfers"))
                    .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
                    .form(&transfer_form(request)),
            )
            .await?;
        Ok(PspTransfer {
            id: body.id,
            amount: body.amount,
            currency: body.currency,
            destination: body.destination,
        })
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<PspPayout, PspError> {
        let (body, raw): (PayoutBody, Value) = self
            .send(
                self.client
                    .post(self.url("/v1/payouts"))
                    .header(CONNECTED_ACCOUNT_HEADER, &request.connected_account_id)
                    .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
                    .form(&payout_form(request)),
            )
            .await?;
        Ok(PspPayout {
            id: body.id,
            status: body.status,
            amount: body.amount,
            currency: body.currency,
            destination: body.destination.unwrap_or_else(|| request.destination.clone()),
            raw,
        })
    }
}
