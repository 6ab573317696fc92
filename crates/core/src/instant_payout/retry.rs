//! Retry scheduler for payouts stuck in `NEW`.
//!
//! A payout stays `NEW` when its first attempt died with an unclassified
//! error or the process stopped mid-submission. Each pass picks up payouts
//! old enough that the original attempt is over and young enough that the
//! provider still honours their idempotency key.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task::JoinSet;

use super::error::PayoutError;
use super::pipeline::SubmissionPipeline;
use crate::domain::{PayoutQuery, PayoutStatus};
use crate::store::PayoutStore;

/// Outcome counts for one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetrySummary {
    /// Candidates past the upper age bound, left for manual handling.
    pub skipped: u64,
    /// Candidates re-driven.
    pub attempted: u64,
    /// Re-driven payouts the provider accepted.
    pub succeeded: u64,
    /// Re-driven payouts that failed again.
    pub failed: u64,
}

/// Periodically re-drives stuck payouts.
pub struct RetryScheduler {
    payouts: Arc<dyn PayoutStore>,
    pipeline: Arc<SubmissionPipeline>,
    min_age: Duration,
    max_age: Duration,
}

impl RetryScheduler {
    /// Creates a scheduler for payouts aged between `min_age` and `max_age`.
    #[must_use]
    pub fn new(
        payouts: Arc<dyn PayoutStore>,
        pipeline: Arc<SubmissionPipeline>,
        min_age: Duration,
        max_age: Duration,
    ) -> Self {
        Self {
            payouts,
            pipeline,
            min_age,
            max_age,
        }
    }

    /// Runs one pass.
    ///
    /// Every candidate is re-driven on its own task with the payout's stored
    /// idempotency key, so one failure does not hold up the rest.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RetrySummary, PayoutError> {
        let query = PayoutQuery {
            statuses: vec![PayoutStatus::New],
            created_before: Some(now - self.min_age),
            ..PayoutQuery::default()
        };
        let candidates = self.payouts.list_payouts(&query).await?;
        let oldest_allowed = now - self.max_age;

        let mut summary = RetrySummary::default();
        let mut tasks = JoinSet::new();
        for payout in candidates {
            if payout.created_at < oldest_allowed {
                tracing::warn!(
                    payout_id = %payout.id,
                    idempotency_key = %payout.idempotency_key,
                    created_at = %payout.created_at,
                    "Payout is past the provider idempotency window; skipping for manual handling"
                );
                summary.skipped += 1;
                continue;
            }
            summary.attempted += 1;
            let pipeline = self.pipeline.clone();
            let payout_id = payout.id;
            tasks.spawn(async move { (payout_id, pipeline.resubmit(payout_id).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((payout_id, Ok(Some(payout)))) => {
                    tracing::info!(%payout_id, status = %payout.status, "Payout retry submitted");
                    summary.succeeded += 1;
                }
                Ok((payout_id, Ok(None))) => {
                    tracing::debug!(%payout_id, "Payout settled before retry");
                    summary.skipped += 1;
                    summary.attempted -= 1;
                }
                Ok((payout_id, Err(e))) => {
                    tracing::error!(
                        %payout_id,
                        error = %e,
                        code = e.error_code(),
                        "Payout retry failed"
                    );
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Payout retry task panicked");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            skipped = summary.skipped,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Payout retry pass finished"
        );
        Ok(summary)
    }

    /// Runs a pass every `every` until `shutdown` resolves.
    pub async fn run_until<F>(self: Arc<Self>, every: StdDuration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut timer = tokio::time::interval(every);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Payout retry scheduler received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "Payout retry pass failed");
                    }
                }
            }
        }

        tracing::info!("Payout retry scheduler stopped");
    }
}
