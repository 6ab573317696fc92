//! Top-up transfer submitter.

use std::sync::Arc;

use uuid::Uuid;

use super::error::PayoutError;
use super::failure::FailureHandler;
use super::types::SubmissionTarget;
use crate::domain::{NewTopUpTransfer, Payout, TopUpTransfer};
use crate::psp::{FailureAction, PspGateway, TransferRequest};
use crate::store::TopUpTransferStore;

/// Makes sure the PSP sub-account can cover a payout before submission.
pub struct TopUpSubmitter {
    gateway: Arc<dyn PspGateway>,
    topups: Arc<dyn TopUpTransferStore>,
    failures: Arc<FailureHandler>,
    platform_account_id: String,
}

impl TopUpSubmitter {
    /// Creates a submitter funding top-ups from `platform_account_id`.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PspGateway>,
        topups: Arc<dyn TopUpTransferStore>,
        failures: Arc<FailureHandler>,
        platform_account_id: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            topups,
            failures,
            platform_account_id: platform_account_id.into(),
        }
    }

    /// Transfers the shortfall into the sub-account when its balance is
    /// below the payout's submission amount.
    ///
    /// Returns the recorded transfer, or `None` if no top-up was needed.
    /// Connection, rate-limit and API failures mark the payout `ERROR` and
    /// release its transactions; any other failure leaves it untouched.
    pub async fn ensure_funded(
        &self,
        payout: &Payout,
        target: &SubmissionTarget,
    ) -> Result<Option<TopUpTransfer>, PayoutError> {
        let sub_account = &target.sub_account;
        let balance = match self
            .gateway
            .retrieve_balance(&sub_account.external_account_id, &sub_account.country)
            .await
        {
            Ok(balance) => balance,
            Err(e) => {
                let action = FailureAction::for_topup(e.kind);
                return Err(self.failures.settle(payout, action, e).await);
            }
        };

        let needed = payout.submission_amount();
        if balance >= needed {
            tracing::debug!(
                payout_id = %payout.id,
                balance,
                needed,
                "Sub-account balance sufficient"
            );
            return Ok(None);
        }

        let shortfall = needed - balance;
        let record = self
            .topups
            .create_topup_transfer(NewTopUpTransfer {
                payout_id: payout.id,
                amount: shortfall,
                currency: payout.currency.clone(),
                source_account_id: self.platform_account_id.clone(),
                destination_account_id: sub_account.external_account_id.clone(),
                idempotency_key: format!("instant-payout-topup-{}", Uuid::new_v4()),
            })
            .await?;

        let request = TransferRequest {
            amount: record.amount,
            currency: record.currency.clone(),
            destination: record.destination_account_id.clone(),
            idempotency_key: record.idempotency_key.clone(),
            description: format!("Instant payout top-up for payout {}", payout.id),
        };
        let transfer = match self.gateway.create_transfer(&request).await {
            Ok(transfer) => transfer,
            Err(e) => {
                let action = FailureAction::for_topup(e.kind);
                return Err(self.failures.settle(payout, action, e).await);
            }
        };

        let record = self
            .topups
            .mark_topup_transfer_submitted(record.id, &transfer.id)
            .await?;
        tracing::info!(
            payout_id = %payout.id,
            transfer_id = %transfer.id,
            amount = shortfall,
            "Top-up transfer submitted"
        );
        Ok(Some(record))
    }
}
