//! Outcome persistence for failed provider calls.

use std::sync::Arc;

use super::error::PayoutError;
use crate::domain::{Payout, PayoutPatch, PayoutStatus};
use crate::psp::{FailureAction, PspError};
use crate::store::{PayoutStore, StoreError, TransactionStore};

/// Applies a [`FailureAction`] to a payout and its reserved transactions.
pub struct FailureHandler {
    payouts: Arc<dyn PayoutStore>,
    transactions: Arc<dyn TransactionStore>,
}

impl FailureHandler {
    /// Creates a handler.
    #[must_use]
    pub fn new(payouts: Arc<dyn PayoutStore>, transactions: Arc<dyn TransactionStore>) -> Self {
        Self {
            payouts,
            transactions,
        }
    }

    /// Payout status written for an action; `None` leaves it unchanged.
    #[must_use]
    pub const fn status_for(action: FailureAction) -> Option<PayoutStatus> {
        match action {
            FailureAction::MarkErrorAndDetach => Some(PayoutStatus::Error),
            FailureAction::MarkFailedAndDetach => Some(PayoutStatus::Failed),
            FailureAction::LeaveUntouched => None,
        }
    }

    /// Writes the status and error, then releases the reserved transactions.
    ///
    /// The status is written first so a payout never sits in `NEW` without
    /// its transactions. Detaching only clears rows still attached to this
    /// payout, so rerunning after a partial failure is safe.
    pub async fn apply(
        &self,
        payout: &Payout,
        action: FailureAction,
        error: &PspError,
    ) -> Result<(), StoreError> {
        let Some(status) = Self::status_for(action) else {
            return Ok(());
        };
        self.payouts
            .update_payout(
                payout.id,
                PayoutPatch::status(status).with_error(error.to_record()),
            )
            .await?;
        let detached = self
            .transactions
            .detach_transactions(&payout.transaction_ids, payout.id)
            .await?;
        tracing::info!(
            payout_id = %payout.id,
            status = %status,
            detached,
            "Payout transactions released after provider failure"
        );
        Ok(())
    }

    /// Persists the outcome of a provider failure and returns the error to
    /// propagate.
    ///
    /// When persistence itself fails the storage error is returned and the
    /// provider error is logged.
    pub async fn settle(
        &self,
        payout: &Payout,
        action: FailureAction,
        error: PspError,
    ) -> PayoutError {
        tracing::warn!(
            payout_id = %payout.id,
            kind = ?error.kind,
            action = ?action,
            error = %error,
            "Provider call failed"
        );
        match self.apply(payout, action, &error).await {
            Ok(()) => PayoutError::Psp {
                payout_id: payout.id,
                source: error,
            },
            Err(store_error) => {
                tracing::error!(
                    payout_id = %payout.id,
                    psp_error = %error,
                    error = %store_error,
                    "Failed to persist provider failure"
                );
                PayoutError::Store(store_error)
            }
        }
    }
}
