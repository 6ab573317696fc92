//! Top-up then payout submission, for fresh and retried payouts.

use std::sync::Arc;

use payout_shared::types::PayoutId;

use super::error::PayoutError;
use super::submitter::PayoutSubmitter;
use super::topup::TopUpSubmitter;
use super::types::SubmissionTarget;
use crate::domain::{Payout, PayoutStatus};
use crate::store::{PayoutAccountStore, PayoutMethodStore, PayoutStore, StoreError};

/// Runs the unlocked half of an instant payout.
pub struct SubmissionPipeline {
    accounts: Arc<dyn PayoutAccountStore>,
    methods: Arc<dyn PayoutMethodStore>,
    payouts: Arc<dyn PayoutStore>,
    topup: TopUpSubmitter,
    submitter: PayoutSubmitter,
}

impl SubmissionPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn PayoutAccountStore>,
        methods: Arc<dyn PayoutMethodStore>,
        payouts: Arc<dyn PayoutStore>,
        topup: TopUpSubmitter,
        submitter: PayoutSubmitter,
    ) -> Self {
        Self {
            accounts,
            methods,
            payouts,
            topup,
            submitter,
        }
    }

    /// Tops up the sub-account if needed, then submits the payout.
    pub async fn submit(
        &self,
        payout: &Payout,
        target: &SubmissionTarget,
    ) -> Result<Payout, PayoutError> {
        self.topup.ensure_funded(payout, target).await?;
        self.submitter.submit(payout, target).await
    }

    /// Re-drives a persisted payout with its stored key, account and
    /// transactions.
    ///
    /// Returns `None` when the payout is no longer `NEW`.
    pub async fn resubmit(&self, payout_id: PayoutId) -> Result<Option<Payout>, PayoutError> {
        let payout = self
            .payouts
            .get_payout(payout_id)
            .await?
            .ok_or_else(|| StoreError::not_found("payout", payout_id))?;
        if payout.status != PayoutStatus::New {
            tracing::debug!(
                payout_id = %payout.id,
                status = %payout.status,
                "Payout no longer new"
            );
            return Ok(None);
        }
        let target = self.resolve_target(&payout).await?;
        self.submit(&payout, &target).await.map(Some)
    }

    /// Loads the sub-account and card a persisted payout is submitted with.
    pub async fn resolve_target(&self, payout: &Payout) -> Result<SubmissionTarget, PayoutError> {
        let account = self
            .accounts
            .get_payout_account(payout.payout_account_id)
            .await?
            .ok_or_else(|| StoreError::not_found("payout account", payout.payout_account_id))?;
        let sub_account_id = account
            .pgp_sub_account_id
            .ok_or_else(|| StoreError::not_found("pgp sub-account for account", account.id))?;
        let sub_account = self
            .accounts
            .get_pgp_sub_account(sub_account_id)
            .await?
            .ok_or_else(|| StoreError::not_found("pgp sub-account", sub_account_id))?;
        let card = self
            .methods
            .list_payout_cards(&[payout.payout_method_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found("payout card", payout.payout_method_id))?;
        Ok(SubmissionTarget { sub_account, card })
    }
}
