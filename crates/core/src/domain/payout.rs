//! Payout attempts and their audit records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use payout_shared::types::{
    LedgerTransactionId, PayoutAccountId, PayoutId, PayoutMethodId, PspPayoutRequestId,
    TopUpTransferId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::UnknownVariant;

/// Payout status.
///
/// `Cancelled` and `Canceled` both exist in stored data; they are kept
/// distinct so rows round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    /// Created; no provider outcome recorded yet.
    New,
    /// Accepted by the provider, funds in flight.
    Pending,
    /// Funds arrived.
    Paid,
    /// Cancelled (legacy spelling).
    Cancelled,
    /// Canceled by the provider.
    Canceled,
    /// Terminal rejection such as a card decline.
    Failed,
    /// Transient provider failure; transactions were released.
    Error,
}

impl PayoutStatus {
    /// Statuses that count against the one-payout-per-day limit.
    pub const DAILY_LIMIT: [Self; 4] = [Self::New, Self::Pending, Self::Paid, Self::Failed];

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }

    /// Returns true if the retry job must never touch a payout in this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Failed | Self::Cancelled | Self::Canceled
        )
    }

    /// Maps a provider payout status onto ours.
    ///
    /// Anything the provider still has in flight is `Pending`.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            _ => Self::Pending,
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "canceled" => Ok(Self::Canceled),
            "failed" => Ok(Self::Failed),
            "error" => Ok(Self::Error),
            other => Err(UnknownVariant::new("payout status", other)),
        }
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payout attempt.
///
/// Created once per attempt. Only `status` and `error` change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    /// Payout id.
    pub id: PayoutId,
    /// Account being paid.
    pub payout_account_id: PayoutAccountId,
    /// Net amount in minor units (requested minus fee).
    pub amount: i64,
    /// Fee in minor units.
    pub fee: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Current status.
    pub status: PayoutStatus,
    /// Provider idempotency key reused by every submission of this payout.
    pub idempotency_key: String,
    /// Destination card.
    pub payout_method_id: PayoutMethodId,
    /// Transactions reserved at creation, in reservation order.
    pub transaction_ids: Vec<LedgerTransactionId>,
    /// Serialized last failure.
    pub error: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Payout {
    /// Gross amount moved at the provider: the net amount plus the fee.
    #[must_use]
    pub const fn submission_amount(&self) -> i64 {
        self.amount + self.fee
    }
}

/// Input for creating a payout and attaching its transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayout {
    /// Account being paid.
    pub payout_account_id: PayoutAccountId,
    /// Net amount in minor units.
    pub amount: i64,
    /// Fee in minor units.
    pub fee: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider idempotency key.
    pub idempotency_key: String,
    /// Destination card.
    pub payout_method_id: PayoutMethodId,
    /// Transactions to stamp with the new payout id.
    pub transaction_ids: Vec<LedgerTransactionId>,
}

/// Mutable payout fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayoutPatch {
    /// New status.
    pub status: Option<PayoutStatus>,
    /// Serialized failure to record.
    pub error: Option<Value>,
}

impl PayoutPatch {
    /// Patch that only changes the status.
    #[must_use]
    pub fn status(status: PayoutStatus) -> Self {
        Self {
            status: Some(status),
            error: None,
        }
    }

    /// Attaches a serialized error.
    #[must_use]
    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }
}

/// Filter for listing payouts. Results are ordered by id descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutQuery {
    /// Restrict to one account.
    pub payout_account_id: Option<PayoutAccountId>,
    /// Restrict to these statuses; empty means any.
    pub statuses: Vec<PayoutStatus>,
    /// Only payouts created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only payouts created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return; `None` returns everything.
    pub limit: Option<u64>,
}

impl PayoutQuery {
    /// Returns true if `payout` satisfies every filter (ignoring paging).
    #[must_use]
    pub fn matches(&self, payout: &Payout) -> bool {
        self.payout_account_id
            .is_none_or(|account| payout.payout_account_id == account)
            && (self.statuses.is_empty() || self.statuses.contains(&payout.status))
            && self.created_after.is_none_or(|after| payout.created_at > after)
            && self
                .created_before
                .is_none_or(|before| payout.created_at < before)
    }
}

/// Platform-to-sub-account transfer that funded a payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpTransfer {
    /// Record id.
    pub id: TopUpTransferId,
    /// Payout this transfer funded.
    pub payout_id: PayoutId,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider id of the funding platform account.
    pub source_account_id: String,
    /// Provider id of the receiving sub-account.
    pub destination_account_id: String,
    /// Idempotency token, distinct from the payout's key.
    pub idempotency_key: String,
    /// Provider transfer id once submitted.
    pub external_transfer_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for recording a top-up transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopUpTransfer {
    /// Payout this transfer funds.
    pub payout_id: PayoutId,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Provider id of the funding platform account.
    pub source_account_id: String,
    /// Provider id of the receiving sub-account.
    pub destination_account_id: String,
    /// Idempotency token.
    pub idempotency_key: String,
}

/// Audit row for one provider payout submission.
///
/// Every attempt creates a new row; the highest id is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PspPayoutRequest {
    /// Row id.
    pub id: PspPayoutRequestId,
    /// Payout submitted.
    pub payout_id: PayoutId,
    /// Idempotency key sent to the provider.
    pub idempotency_key: String,
    /// Provider payout id, once known.
    pub psp_payout_id: Option<String>,
    /// Status mirror.
    pub status: PayoutStatus,
    /// Raw request payload.
    pub request: Value,
    /// Raw provider response or serialized error.
    pub response: Option<Value>,
    /// When the provider answered.
    pub received_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a provider payout submission.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPspPayoutRequest {
    /// Payout submitted.
    pub payout_id: PayoutId,
    /// Idempotency key sent to the provider.
    pub idempotency_key: String,
    /// Raw request payload.
    pub request: Value,
}

/// Mutable audit row fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PspPayoutRequestPatch {
    /// New status mirror.
    pub status: PayoutStatus,
    /// Provider payout id.
    pub psp_payout_id: Option<String>,
    /// Raw provider response or serialized error.
    pub response: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("paid", PayoutStatus::Paid)]
    #[case("failed", PayoutStatus::Failed)]
    #[case("canceled", PayoutStatus::Canceled)]
    #[case("pending", PayoutStatus::Pending)]
    #[case("in_transit", PayoutStatus::Pending)]
    fn test_from_provider(#[case] provider: &str, #[case] expected: PayoutStatus) {
        assert_eq!(PayoutStatus::from_provider(provider), expected);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PayoutStatus::New,
            PayoutStatus::Pending,
            PayoutStatus::Paid,
            PayoutStatus::Cancelled,
            PayoutStatus::Canceled,
            PayoutStatus::Failed,
            PayoutStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<PayoutStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PayoutStatus::Failed.is_terminal());
        assert!(PayoutStatus::Paid.is_terminal());
        assert!(PayoutStatus::Canceled.is_terminal());
        assert!(!PayoutStatus::New.is_terminal());
        assert!(!PayoutStatus::Error.is_terminal());
        assert!(!PayoutStatus::Pending.is_terminal());
    }

    #[test]
    fn test_daily_limit_excludes_error_and_cancelled() {
        assert!(!PayoutStatus::DAILY_LIMIT.contains(&PayoutStatus::Error));
        assert!(!PayoutStatus::DAILY_LIMIT.contains(&PayoutStatus::Cancelled));
        assert!(PayoutStatus::DAILY_LIMIT.contains(&PayoutStatus::Failed));
    }
}
