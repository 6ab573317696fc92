//! Payout creator.

use std::sync::Arc;

use payout_shared::types::{LedgerTransactionId, PayoutAccountId, PayoutMethodId};
use uuid::Uuid;

use super::error::PayoutError;
use crate::domain::{NewPayout, Payout};
use crate::store::PayoutStore;

/// Inputs for one payout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutDraft {
    /// Account being paid.
    pub payout_account_id: PayoutAccountId,
    /// Gross requested amount in minor units.
    pub requested_amount: i64,
    /// Fee in minor units.
    pub fee: i64,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Destination card.
    pub payout_method_id: PayoutMethodId,
    /// Verified transactions to reserve.
    pub transaction_ids: Vec<LedgerTransactionId>,
}

/// Creates the payout row and reserves its transactions.
pub struct PayoutCreator {
    payouts: Arc<dyn PayoutStore>,
}

impl PayoutCreator {
    /// Creates a creator.
    #[must_use]
    pub fn new(payouts: Arc<dyn PayoutStore>) -> Self {
        Self { payouts }
    }

    /// Inserts the payout with a fresh idempotency key and attaches its
    /// transactions in one storage transaction.
    ///
    /// Every later submission of this payout reuses the key minted here.
    pub async fn create(&self, draft: PayoutDraft) -> Result<Payout, PayoutError> {
        let new = NewPayout {
            payout_account_id: draft.payout_account_id,
            amount: draft.requested_amount - draft.fee,
            fee: draft.fee,
            currency: draft.currency,
            idempotency_key: new_idempotency_key(),
            payout_method_id: draft.payout_method_id,
            transaction_ids: draft.transaction_ids,
        };
        let payout = self.payouts.create_payout_and_attach(new).await?;

        tracing::info!(
            payout_id = %payout.id,
            payout_account_id = %payout.payout_account_id,
            amount = payout.amount,
            fee = payout.fee,
            transactions = payout.transaction_ids.len(),
            idempotency_key = %payout.idempotency_key,
            "Instant payout created"
        );
        Ok(payout)
    }
}

/// Idempotency key sent to the provider with every submission of a payout.
#[must_use]
pub fn new_idempotency_key() -> String {
    format!("instant-payout-{}", Uuid::new_v4())
}
