//! Payout submitter.

use std::sync::Arc;

use serde_json::json;

use super::error::PayoutError;
use super::failure::FailureHandler;
use super::types::SubmissionTarget;
use crate::domain::{
    NewPspPayoutRequest, Payout, PayoutPatch, PayoutStatus, PspPayoutRequest,
    PspPayoutRequestPatch,
};
use crate::psp::{FailureAction, PayoutRequest, PspError, PspGateway, PspPayout};
use crate::store::{PayoutStore, PspPayoutRequestStore, StoreError};

/// Statement descriptor shown on the payee's card statement.
const STATEMENT_DESCRIPTOR: &str = "INSTANT PAYOUT";

/// Submits payouts to the provider and records every outcome.
pub struct PayoutSubmitter {
    gateway: Arc<dyn PspGateway>,
    payouts: Arc<dyn PayoutStore>,
    psp_requests: Arc<dyn PspPayoutRequestStore>,
    failures: Arc<FailureHandler>,
}

impl PayoutSubmitter {
    /// Creates a submitter.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PspGateway>,
        payouts: Arc<dyn PayoutStore>,
        psp_requests: Arc<dyn PspPayoutRequestStore>,
        failures: Arc<FailureHandler>,
    ) -> Self {
        Self {
            gateway,
            payouts,
            psp_requests,
            failures,
        }
    }

    /// Builds the provider request for a payout, reusing its idempotency key.
    #[must_use]
    pub fn build_request(payout: &Payout, target: &SubmissionTarget) -> PayoutRequest {
        PayoutRequest {
            connected_account_id: target.sub_account.external_account_id.clone(),
            amount: payout.submission_amount(),
            currency: payout.currency.clone(),
            destination: target.card.external_card_id.clone(),
            idempotency_key: payout.idempotency_key.clone(),
            method: PayoutRequest::INSTANT.to_string(),
            statement_descriptor: STATEMENT_DESCRIPTOR.to_string(),
        }
    }

    /// Submits the payout and returns it with the provider's status.
    ///
    /// An audit row is written before the provider call. Whatever the call
    /// returns, the payout and its audit row are brought to their final or
    /// retryable state before this returns.
    pub async fn submit(
        &self,
        payout: &Payout,
        target: &SubmissionTarget,
    ) -> Result<Payout, PayoutError> {
        let request = Self::build_request(payout, target);
        let audit = self
            .psp_requests
            .create_psp_payout_request(NewPspPayoutRequest {
                payout_id: payout.id,
                idempotency_key: request.idempotency_key.clone(),
                request: json!(request),
            })
            .await?;

        let result = self.gateway.create_payout(&request).await;

        match result {
            Ok(psp_payout) => self.record_success(payout, &audit, psp_payout).await,
            Err(e) => Err(self.record_failure(payout, &audit, e).await),
        }
    }

    async fn record_success(
        &self,
        payout: &Payout,
        audit: &PspPayoutRequest,
        psp_payout: PspPayout,
    ) -> Result<Payout, PayoutError> {
        let status = PayoutStatus::from_provider(&psp_payout.status);
        let response = if psp_payout.raw.is_null() {
            json!(psp_payout)
        } else {
            psp_payout.raw.clone()
        };
        // The provider has accepted the payout: its status must land even
        // if the audit row cannot be written.
        let updated = self
            .payouts
            .update_payout(payout.id, PayoutPatch::status(status))
            .await;
        let audit_result = self
            .psp_requests
            .update_psp_payout_request(
                audit.id,
                PspPayoutRequestPatch {
                    status,
                    psp_payout_id: Some(psp_payout.id.clone()),
                    response: Some(response),
                },
            )
            .await;
        if let Err(e) = audit_result {
            tracing::error!(
                payout_id = %payout.id,
                psp_payout_request_id = %audit.id,
                psp_payout_id = %psp_payout.id,
                error = %e,
                "Failed to record provider acceptance on audit row"
            );
        }
        let updated = updated?;

        tracing::info!(
            payout_id = %payout.id,
            psp_payout_id = %psp_payout.id,
            status = %status,
            "Instant payout submitted"
        );
        Ok(updated)
    }

    async fn record_failure(
        &self,
        payout: &Payout,
        audit: &PspPayoutRequest,
        error: PspError,
    ) -> PayoutError {
        let action = FailureAction::for_payout(error.kind);
        let audit_status = FailureHandler::status_for(action).unwrap_or(PayoutStatus::New);

        let audit_result: Result<_, StoreError> = self
            .psp_requests
            .update_psp_payout_request(
                audit.id,
                PspPayoutRequestPatch {
                    status: audit_status,
                    psp_payout_id: None,
                    response: Some(error.to_record()),
                },
            )
            .await;
        if let Err(e) = audit_result {
            tracing::error!(
                payout_id = %payout.id,
                psp_payout_request_id = %audit.id,
                error = %e,
                "Failed to record provider failure on audit row"
            );
        }

        self.failures.settle(payout, action, error).await
    }
}
