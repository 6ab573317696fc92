//! Instant payout service.
//!
//! Entry point for the three produced operations: eligibility, create and
//! submit, and the payout stream. Wiring happens once in [`InstantPayoutService::new`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use payout_shared::types::{OffsetPage, PayoutAccountId, StreamPage};

use super::creator::{PayoutCreator, PayoutDraft};
use super::eligibility::{Eligibility, EligibilityEvaluator};
use super::error::PayoutError;
use super::failure::FailureHandler;
use super::pipeline::SubmissionPipeline;
use super::retry::RetryScheduler;
use super::stream::{PayoutStreamItem, PayoutStreamReader};
use super::submitter::PayoutSubmitter;
use super::topup::TopUpSubmitter;
use super::types::{
    CardSummary, CreateInstantPayout, InstantPayoutReceipt, InstantPayoutSettings,
    SubmissionTarget,
};
use super::verifier::TransactionVerifier;
use crate::lock::{LockCoordinator, LockKey, SectionStores};
use crate::psp::PspGateway;
use crate::store::LedgerStores;

/// Orchestrates instant payouts.
pub struct InstantPayoutService {
    evaluator: EligibilityEvaluator,
    locks: Arc<LockCoordinator>,
    pipeline: Arc<SubmissionPipeline>,
    stream: PayoutStreamReader,
    stores: LedgerStores,
    settings: Arc<InstantPayoutSettings>,
}

impl InstantPayoutService {
    /// Wires the engine over its stores, provider gateway and locks.
    #[must_use]
    pub fn new(
        stores: LedgerStores,
        gateway: Arc<dyn PspGateway>,
        locks: Arc<LockCoordinator>,
        settings: InstantPayoutSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        let failures = Arc::new(FailureHandler::new(
            stores.payouts.clone(),
            stores.transactions.clone(),
        ));
        let topup = TopUpSubmitter::new(
            gateway.clone(),
            stores.topups.clone(),
            failures.clone(),
            settings.platform_account_id.clone(),
        );
        let submitter = PayoutSubmitter::new(
            gateway,
            stores.payouts.clone(),
            stores.psp_requests.clone(),
            failures,
        );
        let pipeline = Arc::new(SubmissionPipeline::new(
            stores.accounts.clone(),
            stores.methods.clone(),
            stores.payouts.clone(),
            topup,
            submitter,
        ));

        Self {
            evaluator: EligibilityEvaluator::new(
                stores.accounts.clone(),
                stores.methods.clone(),
                stores.transactions.clone(),
                stores.payouts.clone(),
                settings.clone(),
            ),
            locks,
            pipeline,
            stream: PayoutStreamReader::new(stores.payouts.clone(), stores.psp_requests.clone()),
            stores,
            settings,
        }
    }

    /// Business rules in effect.
    #[must_use]
    pub fn settings(&self) -> &InstantPayoutSettings {
        &self.settings
    }

    /// Builds the retry scheduler sharing this service's pipeline.
    #[must_use]
    pub fn retry_scheduler(&self) -> RetryScheduler {
        RetryScheduler::new(
            self.stores.payouts.clone(),
            self.pipeline.clone(),
            self.settings.retry_min_age,
            self.settings.retry_max_age,
        )
    }

    /// Returns whether the account may cash out now.
    pub async fn check_eligibility(
        &self,
        account_id: PayoutAccountId,
        local_start_of_day: DateTime<Utc>,
    ) -> Result<Eligibility, PayoutError> {
        self.evaluator
            .evaluate(account_id, local_start_of_day, Utc::now())
            .await
    }

    /// Creates an instant payout for the account's whole unpaid balance and
    /// submits it.
    ///
    /// Eligibility is checked before any lock is taken. Verification and
    /// creation run under the account lock, through the lock's own storage
    /// transaction when it has one; top-up and submission run after it is
    /// released. Once the payout exists, provider failures come back
    /// as [`PayoutError::Psp`] with the payout already persisted in its
    /// final or retryable state.
    pub async fn create_and_submit(
        &self,
        request: CreateInstantPayout,
    ) -> Result<InstantPayoutReceipt, PayoutError> {
        let account_id = request.payout_account_id;
        let eligible = self
            .evaluator
            .require_eligible(account_id, request.local_start_of_day, Utc::now())
            .await?;

        let currency = request.currency.to_lowercase();
        if currency != eligible.account.currency {
            return Err(PayoutError::CurrencyMismatch {
                requested: request.currency,
                expected: eligible.account.currency,
            });
        }
        let card = eligible.resolve_card(request.payout_card_id)?.card.clone();

        let strategy = self.locks.strategy_for(account_id);
        let key = LockKey::payout_account(account_id);
        let requested_amount = request.amount;
        let fee = eligible.account.fee;
        let payout_method_id = card.id;
        let payout = self
            .locks
            .run_exclusive(
                strategy,
                &key,
                &SectionStores::from(&self.stores),
                move |stores| async move {
                    let transaction_ids = TransactionVerifier::new(stores.transactions)
                        .verify(account_id, requested_amount)
                        .await?;
                    PayoutCreator::new(stores.payouts)
                        .create(PayoutDraft {
                            payout_account_id: account_id,
                            requested_amount,
                            fee,
                            currency,
                            payout_method_id,
                            transaction_ids,
                        })
                        .await
                },
            )
            .await?;

        let target = SubmissionTarget {
            sub_account: eligible.account.sub_account.clone(),
            card,
        };
        let submitted = self.pipeline.submit(&payout, &target).await?;

        Ok(InstantPayoutReceipt {
            payout_id: submitted.id,
            amount: submitted.amount,
            fee: submitted.fee,
            currency: submitted.currency,
            status: submitted.status,
            card: CardSummary::from(&target.card),
            created_at: submitted.created_at,
        })
    }

    /// Returns one page of the account's payouts with their latest
    /// provider submission.
    pub async fn list_payout_stream(
        &self,
        account_id: PayoutAccountId,
        page: OffsetPage,
    ) -> Result<StreamPage<PayoutStreamItem>, PayoutError> {
        self.stream.list(account_id, page).await
    }
}
