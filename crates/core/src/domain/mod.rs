//! Ledger records the payout engine reads and writes.
//!
//! These mirror rows owned by the ledger database but carry no storage
//! concerns. The `payout-db` crate maps them to and from SeaORM models.

pub mod account;
pub mod method;
pub mod payout;
pub mod transaction;

pub use account::{EntityType, PaymentGatewayProvider, PayoutAccount, PgpSubAccount};
pub use method::{PayoutCard, PayoutMethod, PayoutMethodType};
pub use payout::{
    NewPayout, NewPspPayoutRequest, NewTopUpTransfer, Payout, PayoutPatch, PayoutQuery,
    PayoutStatus, PspPayoutRequest, PspPayoutRequestPatch, TopUpTransfer,
};
pub use transaction::{LedgerTransaction, TransactionState};

/// Error returned when a stored enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Which enum failed to parse.
    pub kind: &'static str,
    /// The offending value.
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
