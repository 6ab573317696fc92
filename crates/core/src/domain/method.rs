//! Payout methods and their card records.
//!
//! A payout method and its card share one primary key. An account may hold
//! several methods; at most one active method is flagged `is_default`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use payout_shared::types::{PayoutAccountId, PayoutMethodId};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Payout method type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethodType {
    /// Debit card.
    Card,
    /// Bank account.
    BankAccount,
}

impl PayoutMethodType {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankAccount => "bank_account",
        }
    }
}

impl FromStr for PayoutMethodType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "bank_account" => Ok(Self::BankAccount),
            other => Err(UnknownVariant::new("payout method type", other)),
        }
    }
}

/// A payout method registered on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutMethod {
    /// Method id, shared with the card record.
    pub id: PayoutMethodId,
    /// Owning account.
    pub payout_account_id: PayoutAccountId,
    /// Method type.
    pub method_type: PayoutMethodType,
    /// Whether this is the account's default method.
    pub is_default: bool,
    /// Settlement currency.
    pub currency: String,
    /// Issuing country.
    pub country: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Soft-delete timestamp; `None` while active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PayoutMethod {
    /// Returns true if the method has not been deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Card details for a card payout method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutCard {
    /// Same id as the owning payout method.
    pub id: PayoutMethodId,
    /// Provider-side card id.
    pub external_card_id: String,
    /// Last four digits.
    pub last4: String,
    /// Card brand.
    pub brand: String,
    /// Expiry month.
    pub exp_month: i32,
    /// Expiry year.
    pub exp_year: i32,
    /// Provider fingerprint identifying the physical card.
    pub fingerprint: String,
    /// Creation timestamp; drives the card-change cooldown.
    pub created_at: DateTime<Utc>,
}
