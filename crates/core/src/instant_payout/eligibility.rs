//! Eligibility evaluator.
//!
//! Runs the account, card, balance and daily-limit checks in order and stops
//! at the first failure. Context gathered by checks that already passed
//! (currency, fee, balance) is reported even when a later check fails.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use payout_shared::types::{PayoutAccountId, PayoutMethodId};
use serde::{Deserialize, Serialize};

use super::error::PayoutError;
use super::types::{ActiveCard, CardSummary, InstantPayoutSettings, currency_for_country};
use crate::domain::{
    EntityType, PaymentGatewayProvider, PayoutAccount, PayoutMethodType, PayoutQuery,
    PayoutStatus, PgpSubAccount,
};
use crate::store::{PayoutAccountStore, PayoutMethodStore, PayoutStore, TransactionStore};

/// Why an account may not cash out now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IneligibleReason {
    /// No payout account with that id.
    PayoutAccountNotExist,
    /// Entity type cannot use instant payout.
    PayoutAccountTypeNotSupported,
    /// No sub-account linked, or linked through an unsupported provider.
    PayoutPgpAccountNotSetup,
    /// Linked sub-account record is missing.
    PayoutPgpAccountNotExist,
    /// Sub-account country is not supported.
    PayoutCountryNotSupported,
    /// Provider disabled the sub-account pending verification.
    PayoutPgpAccountNotVerified,
    /// No active card on file.
    PayoutCardNotSetup,
    /// A card was added within the cooldown window.
    PayoutCardChangedRecently,
    /// Unpaid balance does not cover the fee.
    InsufficientBalance,
    /// A payout was already made today.
    AlreadyPaidOutToday,
}

impl IneligibleReason {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PayoutAccountNotExist => "PAYOUT_ACCOUNT_NOT_EXIST",
            Self::PayoutAccountTypeNotSupported => "PAYOUT_ACCOUNT_TYPE_NOT_SUPPORTED",
            Self::PayoutPgpAccountNotSetup => "PAYOUT_PGP_ACCOUNT_NOT_SETUP",
            Self::PayoutPgpAccountNotExist => "PAYOUT_PGP_ACCOUNT_NOT_EXIST",
            Self::PayoutCountryNotSupported => "PAYOUT_COUNTRY_NOT_SUPPORTED",
            Self::PayoutPgpAccountNotVerified => "PAYOUT_PGP_ACCOUNT_NOT_VERIFIED",
            Self::PayoutCardNotSetup => "PAYOUT_CARD_NOT_SETUP",
            Self::PayoutCardChangedRecently => "PAYOUT_CARD_CHANGED_RECENTLY",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::AlreadyPaidOutToday => "ALREADY_PAID_OUT_TODAY",
        }
    }

    /// Human-readable message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::PayoutAccountNotExist => "Payout account does not exist",
            Self::PayoutAccountTypeNotSupported => {
                "Instant payout is not supported for this account type"
            }
            Self::PayoutPgpAccountNotSetup => "Payment gateway account is not set up",
            Self::PayoutPgpAccountNotExist => "Payment gateway account does not exist",
            Self::PayoutCountryNotSupported => "Instant payout is not supported in this country",
            Self::PayoutPgpAccountNotVerified => "Payment gateway account is not verified",
            Self::PayoutCardNotSetup => "No payout card is set up",
            Self::PayoutCardChangedRecently => {
                "Instant payout is blocked after a recent payout card change"
            }
            Self::InsufficientBalance => "Balance does not cover the instant payout fee",
            Self::AlreadyPaidOutToday => "An instant payout was already made today",
        }
    }
}

/// Context attached to an ineligible verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDetails {
    /// Length of the card change cooldown in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_days_blocked: Option<i64>,
    /// Cards added within the cooldown window.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards_changed: Vec<CardSummary>,
}

/// Eligibility verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Whether every check passed.
    pub eligible: bool,
    /// First failed check.
    pub reason: Option<IneligibleReason>,
    /// Context for the failed check.
    pub details: EligibilityDetails,
    /// Unpaid balance in minor units, once computed.
    pub balance: Option<i64>,
    /// Payout currency, once the account check passed.
    pub currency: Option<String>,
    /// Fee in minor units, once the account check passed.
    pub fee: Option<i64>,
}

/// Result of a passing account check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    /// The payout account.
    pub account: PayoutAccount,
    /// Its PSP sub-account.
    pub sub_account: PgpSubAccount,
    /// Lowercase payout currency derived from the sub-account country.
    pub currency: String,
    /// Flat fee in minor units.
    pub fee: i64,
}

/// Everything gathered for an account that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleAccount {
    /// Account check context.
    pub account: AccountContext,
    /// Active cards, newest first.
    pub cards: Vec<ActiveCard>,
    /// Unpaid balance in minor units.
    pub balance: i64,
}

impl EligibleAccount {
    /// Picks the destination card.
    ///
    /// A requested card must be one of the account's active cards. Without a
    /// request the default card wins, then the most recently added one.
    pub fn resolve_card(
        &self,
        requested: Option<PayoutMethodId>,
    ) -> Result<&ActiveCard, PayoutError> {
        match requested {
            Some(id) => self
                .cards
                .iter()
                .find(|c| c.method.id == id)
                .ok_or(PayoutError::PayoutCardNotFound(id)),
            None => self
                .cards
                .iter()
                .find(|c| c.method.is_default)
                .or_else(|| self.cards.first())
                .ok_or_else(|| PayoutError::ineligible(IneligibleReason::PayoutCardNotSetup)),
        }
    }
}

/// Runs the ordered eligibility checks.
pub struct EligibilityEvaluator {
    accounts: Arc<dyn PayoutAccountStore>,
    methods: Arc<dyn PayoutMethodStore>,
    transactions: Arc<dyn TransactionStore>,
    payouts: Arc<dyn PayoutStore>,
    settings: Arc<InstantPayoutSettings>,
}

impl EligibilityEvaluator {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn PayoutAccountStore>,
        methods: Arc<dyn PayoutMethodStore>,
        transactions: Arc<dyn TransactionStore>,
        payouts: Arc<dyn PayoutStore>,
        settings: Arc<InstantPayoutSettings>,
    ) -> Self {
        Self {
            accounts,
            methods,
            transactions,
            payouts,
            settings,
        }
    }

    /// Returns the verdict for an account.
    ///
    /// Only storage failures are errors; a failed check is a verdict.
    pub async fn evaluate(
        &self,
        account_id: PayoutAccountId,
        local_start_of_day: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Eligibility, PayoutError> {
        let mut verdict = Eligibility::default();
        match self
            .run(account_id, local_start_of_day, now, &mut verdict)
            .await
        {
            Ok(_) => {
                verdict.eligible = true;
                Ok(verdict)
            }
            Err(PayoutError::Ineligible { reason, details }) => {
                verdict.reason = Some(reason);
                verdict.details = details;
                Ok(verdict)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the gathered context, or the first failed check as an error.
    pub async fn require_eligible(
        &self,
        account_id: PayoutAccountId,
        local_start_of_day: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<EligibleAccount, PayoutError> {
        let mut verdict = Eligibility::default();
        self.run(account_id, local_start_of_day, now, &mut verdict)
            .await
    }

    async fn run(
        &self,
        account_id: PayoutAccountId,
        local_start_of_day: DateTime<Utc>,
        now: DateTime<Utc>,
        verdict: &mut Eligibility,
    ) -> Result<EligibleAccount, PayoutError> {
        let account = self.check_account(account_id).await?;
        verdict.currency = Some(account.currency.clone());
        verdict.fee = Some(account.fee);

        let cards = self.check_card(account_id, now).await?;

        let balance = self.unpaid_balance(account_id).await?;
        verdict.balance = Some(balance);
        check_balance(balance, account.fee)?;

        self.check_daily_limit(account_id, local_start_of_day)
            .await?;

        Ok(EligibleAccount {
            account,
            cards,
            balance,
        })
    }

    /// Account exists, has a supported type, and a usable PSP sub-account.
    pub async fn check_account(
        &self,
        account_id: PayoutAccountId,
    ) -> Result<AccountContext, PayoutError> {
        use IneligibleReason as R;

        let account = self
            .accounts
            .get_payout_account(account_id)
            .await?
            .ok_or_else(|| PayoutError::ineligible(R::PayoutAccountNotExist))?;

        if !EntityType::INSTANT_PAYOUT_SUPPORTED.contains(&account.entity) {
            return Err(PayoutError::ineligible(R::PayoutAccountTypeNotSupported));
        }

        let sub_account_id = match (account.pgp_sub_account_id, account.pgp_provider) {
            (Some(id), Some(provider))
                if PaymentGatewayProvider::INSTANT_PAYOUT_SUPPORTED.contains(&provider) =>
            {
                id
            }
            _ => return Err(PayoutError::ineligible(R::PayoutPgpAccountNotSetup)),
        };

        let sub_account = self
            .accounts
            .get_pgp_sub_account(sub_account_id)
            .await?
            .ok_or_else(|| PayoutError::ineligible(R::PayoutPgpAccountNotExist))?;

        let currency = currency_for_country(&sub_account.country)
            .filter(|_| self.settings.supports_country(&sub_account.country))
            .ok_or_else(|| PayoutError::ineligible(R::PayoutCountryNotSupported))?;

        if sub_account.is_verification_disabled() {
            return Err(PayoutError::ineligible(R::PayoutPgpAccountNotVerified));
        }

        Ok(AccountContext {
            account,
            sub_account,
            currency: currency.to_string(),
            fee: self.settings.fee,
        })
    }

    /// Account has an active card and none was added within the cooldown.
    ///
    /// Returns the active cards, newest first.
    pub async fn check_card(
        &self,
        account_id: PayoutAccountId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveCard>, PayoutError> {
        let methods: Vec<_> = self
            .methods
            .list_payout_methods(account_id)
            .await?
            .into_iter()
            .filter(|m| m.is_active() && m.method_type == PayoutMethodType::Card)
            .collect();
        let ids: Vec<_> = methods.iter().map(|m| m.id).collect();
        let mut cards_by_id = self.methods.list_payout_cards(&ids).await?;

        let mut cards: Vec<ActiveCard> = methods
            .into_iter()
            .filter_map(|method| {
                let index = cards_by_id.iter().position(|c| c.id == method.id)?;
                Some(ActiveCard {
                    method,
                    card: cards_by_id.swap_remove(index),
                })
            })
            .collect();
        if cards.is_empty() {
            return Err(PayoutError::ineligible(IneligibleReason::PayoutCardNotSetup));
        }
        cards.sort_by(|a, b| {
            b.card
                .created_at
                .cmp(&a.card.created_at)
                .then(b.card.id.cmp(&a.card.id))
        });

        let cutoff = now - self.settings.card_change_cooldown;
        if cards[0].card.created_at > cutoff {
            return Err(PayoutError::Ineligible {
                reason: IneligibleReason::PayoutCardChangedRecently,
                details: EligibilityDetails {
                    num_days_blocked: Some(self.settings.cooldown_days()),
                    cards_changed: cards
                        .iter()
                        .filter(|c| c.card.created_at > cutoff)
                        .map(|c| CardSummary::from(&c.card))
                        .collect(),
                },
            });
        }
        Ok(cards)
    }

    /// Sum of the account's payable transactions.
    pub async fn unpaid_balance(&self, account_id: PayoutAccountId) -> Result<i64, PayoutError> {
        Ok(self
            .transactions
            .get_unpaid_transactions(account_id)
            .await?
            .iter()
            .filter(|t| t.is_payable())
            .map(|t| t.amount)
            .sum())
    }

    /// No counted payout was created since the caller's local start of day.
    pub async fn check_daily_limit(
        &self,
        account_id: PayoutAccountId,
        local_start_of_day: DateTime<Utc>,
    ) -> Result<(), PayoutError> {
        let query = PayoutQuery {
            payout_account_id: Some(account_id),
            statuses: PayoutStatus::DAILY_LIMIT.to_vec(),
            created_after: Some(local_start_of_day),
            limit: Some(1),
            ..PayoutQuery::default()
        };
        if self.payouts.list_payouts(&query).await?.is_empty() {
            Ok(())
        } else {
            Err(PayoutError::ineligible(IneligibleReason::AlreadyPaidOutToday))
        }
    }
}

/// Balance must cover the fee.
pub fn check_balance(balance: i64, fee: i64) -> Result<(), PayoutError> {
    if balance < fee {
        return Err(PayoutError::ineligible(IneligibleReason::InsufficientBalance));
    }
    Ok(())
}
