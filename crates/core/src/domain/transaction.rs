//! Ledger transactions owed to a payout account.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use payout_shared::types::{LedgerTransactionId, PayoutAccountId, PayoutId};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Lifecycle state of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Payable.
    Active,
    /// Held for review.
    OnHold,
    /// Reversed; never payable.
    Cancelled,
}

impl TransactionState {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TransactionState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "on_hold" => Ok(Self::OnHold),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownVariant::new("transaction state", other)),
        }
    }
}

/// A ledger transaction that may be swept into a payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction id.
    pub id: LedgerTransactionId,
    /// Owning account.
    pub payout_account_id: PayoutAccountId,
    /// Amount in minor units.
    pub amount: i64,
    /// State; `None` is treated as active.
    pub state: Option<TransactionState>,
    /// Payout that reserved this transaction.
    pub payout_id: Option<PayoutId>,
    /// Weekly batch transfer that swept this transaction.
    pub transfer_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Returns true if the state allows payment.
    #[must_use]
    pub const fn has_payable_state(&self) -> bool {
        matches!(self.state, None | Some(TransactionState::Active))
    }

    /// Returns true if this transaction can be reserved by a new payout.
    ///
    /// A transaction already tied to a payout or a transfer is never payable.
    #[must_use]
    pub const fn is_payable(&self) -> bool {
        self.has_payable_state() && self.payout_id.is_none() && self.transfer_id.is_none()
    }
}
