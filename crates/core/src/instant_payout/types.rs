//! Instant payout request, response and settings types.

use chrono::{DateTime, Duration, Utc};
use payout_shared::InstantPayoutConfig;
use payout_shared::types::{PayoutAccountId, PayoutId, PayoutMethodId};
use serde::{Deserialize, Serialize};

use crate::domain::{PayoutCard, PayoutMethod, PayoutStatus, PgpSubAccount};

/// Business rules for instant payouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantPayoutSettings {
    /// Flat fee in minor units.
    pub fee: i64,
    /// How long instant payout stays blocked after a card change.
    pub card_change_cooldown: Duration,
    /// Uppercase ISO 3166 country codes eligible for instant payout.
    pub supported_countries: Vec<String>,
    /// Provider id of the platform account funding top-ups.
    pub platform_account_id: String,
    /// Retry job leaves younger NEW payouts to the original attempt.
    pub retry_min_age: Duration,
    /// Retry job skips older NEW payouts for manual handling.
    pub retry_max_age: Duration,
}

impl InstantPayoutSettings {
    /// Builds settings from configuration.
    #[must_use]
    pub fn from_config(
        config: &InstantPayoutConfig,
        platform_account_id: impl Into<String>,
    ) -> Self {
        Self {
            fee: config.fee,
            card_change_cooldown: Duration::days(i64::from(config.card_change_cooldown_days)),
            supported_countries: config
                .supported_countries
                .iter()
                .map(|c| c.to_uppercase())
                .collect(),
            platform_account_id: platform_account_id.into(),
            retry_min_age: seconds(config.retry_min_age_secs),
            retry_max_age: seconds(config.retry_max_age_secs),
        }
    }

    /// Whole days of the card change cooldown.
    #[must_use]
    pub fn cooldown_days(&self) -> i64 {
        self.card_change_cooldown.num_days()
    }

    /// Returns true if instant payout is offered in `country`.
    #[must_use]
    pub fn supports_country(&self, country: &str) -> bool {
        self.supported_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country))
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl Default for InstantPayoutSettings {
    fn default() -> Self {
        Self::from_config(&InstantPayoutConfig::default(), "")
    }
}

/// Lowercase ISO 4217 currency paid out in a country.
#[must_use]
pub fn currency_for_country(country: &str) -> Option<&'static str> {
    let currency = match country.to_ascii_uppercase().as_str() {
        "US" => "usd",
        "CA" => "cad",
        "AU" => "aud",
        "NZ" => "nzd",
        "GB" => "gbp",
        "SG" => "sgd",
        "JP" => "jpy",
        "AT" | "BE" | "DE" | "ES" | "FI" | "FR" | "IE" | "IT" | "NL" | "PT" => "eur",
        _ => return None,
    };
    Some(currency)
}

/// Card details safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    /// Payout method id.
    pub id: PayoutMethodId,
    /// Last four digits.
    pub last4: String,
    /// Card brand.
    pub brand: String,
    /// Expiry month.
    pub exp_month: i32,
    /// Expiry year.
    pub exp_year: i32,
    /// When the card was added.
    pub created_at: DateTime<Utc>,
}

impl From<&PayoutCard> for CardSummary {
    fn from(card: &PayoutCard) -> Self {
        Self {
            id: card.id,
            last4: card.last4.clone(),
            brand: card.brand.clone(),
            exp_month: card.exp_month,
            exp_year: card.exp_year,
            created_at: card.created_at,
        }
    }
}

/// An active card payout method joined with its card record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCard {
    /// Payout method row.
    pub method: PayoutMethod,
    /// Card row sharing the method's id.
    pub card: PayoutCard,
}

/// Where a payout's funds go at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTarget {
    /// PSP sub-account the payout is drawn from.
    pub sub_account: PgpSubAccount,
    /// Destination card.
    pub card: PayoutCard,
}

/// Input for [`create_and_submit`](super::InstantPayoutService::create_and_submit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInstantPayout {
    /// Account cashing out.
    pub payout_account_id: PayoutAccountId,
    /// Gross amount in minor units; must equal the unpaid balance.
    pub amount: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Destination card; defaults to the account's default card.
    pub payout_card_id: Option<PayoutMethodId>,
    /// Start of the caller's local day, for the daily limit.
    pub local_start_of_day: DateTime<Utc>,
}

/// Result of a successful instant payout submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantPayoutReceipt {
    /// Payout id.
    pub payout_id: PayoutId,
    /// Net amount in minor units.
    pub amount: i64,
    /// Fee in minor units.
    pub fee: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Status after submission.
    pub status: PayoutStatus,
    /// Destination card.
    pub card: CardSummary,
    /// Payout creation time.
    pub created_at: DateTime<Utc>,
}
