//! Payment service provider seam.
//!
//! The engine never talks HTTP. It calls [`PspGateway`] and receives either a
//! typed result or a [`PspError`] whose [`PspErrorKind`] drives the failure
//! handling of the top-up and payout submitters.
//!
//! # Modules
//!
//! - `error` - Closed provider error taxonomy and failure actions
//! - `types` - Request and response records

pub mod error;
pub mod types;

use async_trait::async_trait;

pub use error::{FailureAction, PspError, PspErrorKind};
pub use types::{PayoutRequest, PspPayout, PspTransfer, TransferRequest};

/// Typed calls into the payment service provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PspGateway: Send + Sync {
    /// Returns the first available balance of a connected account in minor units.
    ///
    /// Malformed provider responses yield `0`.
    async fn retrieve_balance(
        &self,
        connected_account_id: &str,
        country: &str,
    ) -> Result<i64, PspError>;

    /// Moves funds from the platform account into a connected account.
    async fn create_transfer(&self, request: &TransferRequest) -> Result<PspTransfer, PspError>;

    /// Pays a connected account's balance out to an external card.
    async fn create_payout(&self, request: &PayoutRequest) -> Result<PspPayout, PspError>;
}
