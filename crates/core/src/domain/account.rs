//! Payout accounts and the PSP sub-accounts they are linked to.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use payout_shared::types::{PayoutAccountId, PgpSubAccountId};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Kind of business entity that owns a payout account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Individual contractor paid per job.
    IndividualContractor,
    /// Merchant storefront.
    Merchant,
}

impl EntityType {
    /// Entity types allowed to cash out instantly.
    pub const INSTANT_PAYOUT_SUPPORTED: [Self; 1] = [Self::IndividualContractor];

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IndividualContractor => "individual_contractor",
            Self::Merchant => "merchant",
        }
    }
}

impl FromStr for EntityType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual_contractor" => Ok(Self::IndividualContractor),
            "merchant" => Ok(Self::Merchant),
            other => Err(UnknownVariant::new("entity type", other)),
        }
    }
}

/// Payment gateway provider that holds a sub-account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGatewayProvider {
    /// Stripe connected ("managed") account.
    Stripe,
    /// Adyen balance platform account.
    Adyen,
}

impl PaymentGatewayProvider {
    /// Providers the instant payout flow can submit through.
    pub const INSTANT_PAYOUT_SUPPORTED: [Self; 1] = [Self::Stripe];

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Adyen => "adyen",
        }
    }
}

impl FromStr for PaymentGatewayProvider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "adyen" => Ok(Self::Adyen),
            other => Err(UnknownVariant::new("payment gateway provider", other)),
        }
    }
}

/// A payout account. Owned by account management; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAccount {
    /// Account id.
    pub id: PayoutAccountId,
    /// Owning entity type.
    pub entity: EntityType,
    /// Linked PSP sub-account, if one was set up.
    pub pgp_sub_account_id: Option<PgpSubAccountId>,
    /// Provider of the linked sub-account.
    pub pgp_provider: Option<PaymentGatewayProvider>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A PSP-held sub-account from which payouts are drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpSubAccount {
    /// Record id.
    pub id: PgpSubAccountId,
    /// Provider-side account id (e.g. `acct_...`).
    pub external_account_id: String,
    /// ISO 3166 alpha-2 country code.
    pub country: String,
    /// Set by the provider when verification disabled the account.
    pub verification_disabled_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PgpSubAccount {
    /// Returns true when the provider has disabled the account pending verification.
    #[must_use]
    pub fn is_verification_disabled(&self) -> bool {
        self.verification_disabled_reason
            .as_deref()
            .is_some_and(|reason| !reason.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_account(reason: Option<&str>) -> PgpSubAccount {
        PgpSubAccount {
            id: PgpSubAccountId::new(1),
            external_account_id: "acct_1".to_string(),
            country: "US".to_string(),
            verification_disabled_reason: reason.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_verification_disabled() {
        assert!(!sub_account(None).is_verification_disabled());
        assert!(!sub_account(Some("  ")).is_verification_disabled());
        assert!(sub_account(Some("fields_needed")).is_verification_disabled());
    }

    #[test]
    fn test_entity_type_round_trip() {
        for entity in [EntityType::IndividualContractor, EntityType::Merchant] {
            assert_eq!(entity.as_str().parse::<EntityType>().unwrap(), entity);
        }
        assert!("dasher".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_provider_parse_rejects_unknown() {
        assert_eq!(
            "stripe".parse::<PaymentGatewayProvider>().unwrap(),
            PaymentGatewayProvider::Stripe
        );
        let err = "paypal".parse::<PaymentGatewayProvider>().unwrap_err();
        assert_eq!(err.value, "paypal");
    }
}
