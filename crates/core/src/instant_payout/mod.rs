//! Instant payout orchestration.
//!
//! Eligibility → verification and creation under the account lock →
//! top-up (when the sub-account is short) → payout submission. The retry
//! scheduler re-enters at top-up for payouts left in `NEW`.
//!
//! # Modules
//!
//! - `eligibility` - Ordered precondition checks
//! - `verifier` - Unpaid transaction validation
//! - `creator` - Payout creation and transaction reservation
//! - `topup` - Sub-account top-up transfers
//! - `submitter` - Provider payout submission
//! - `failure` - Provider failure persistence
//! - `pipeline` - Top-up then submission, fresh or retried
//! - `retry` - Periodic re-drive of stuck payouts
//! - `stream` - Payout stream read model
//! - `service` - Public entry points

pub mod creator;
pub mod eligibility;
pub mod error;
pub mod failure;
pub mod pipeline;
pub mod retry;
pub mod service;
pub mod stream;
pub mod submitter;
pub mod topup;
pub mod types;
pub mod verifier;


pub use eligibility::{
    AccountContext, Eligibility, EligibilityDetails, EligibilityEvaluator, EligibleAccount,
    IneligibleReason,
};
pub use error::PayoutError;
pub use pipeline::SubmissionPipeline;
pub use retry::{RetryScheduler, RetrySummary};
pub use service::InstantPayoutService;
pub use stream::{PayoutStreamItem, PayoutStreamReader, merge_latest_requests};
pub use types::{
    ActiveCard, CardSummary, CreateInstantPayout, InstantPayoutReceipt, InstantPayoutSettings,
    SubmissionTarget, currency_for_country,
};
