//! Provider request and response records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platform-to-connected-account transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider id of the receiving connected account.
    pub destination: String,
    /// Provider idempotency key.
    pub idempotency_key: String,
    /// Free-form description shown on the provider dashboard.
    pub description: String,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PspTransfer {
    /// Provider transfer id.
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider id of the receiving account.
    pub destination: String,
}

/// Instant payout from a connected account to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    /// Connected account the funds leave from.
    pub connected_account_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider card id.
    pub destination: String,
    /// Provider idempotency key; the payout's own key on every attempt.
    pub idempotency_key: String,
    /// Payout speed, always `instant` here.
    pub method: String,
    /// Statement descriptor.
    pub statement_descriptor: String,
}

impl PayoutRequest {
    /// Payout speed used for every instant payout.
    pub const INSTANT: &'static str = "instant";
}

/// Result of a successful payout submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PspPayout {
    /// Provider payout id.
    pub id: String,
    /// Provider status string (`pending`, `in_transit`, `paid`, ...).
    pub status: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider card id.
    pub destination: String,
    /// Raw provider response body.
    #[serde(default)]
    pub raw: Value,
}
