//! Ledger store seams consumed by the payout engine.
//!
//! Each trait is a narrow view over one table family. Components take only
//! the stores they need; `payout-db` implements them on Postgres and
//! [`memory::InMemoryLedger`] implements them for tests and local runs.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use payout_shared::types::{
    LedgerTransactionId, PayoutAccountId, PayoutId, PayoutMethodId, PgpSubAccountId,
    PspPayoutRequestId, TopUpTransferId,
};
use thiserror::Error;

use crate::domain::{
    LedgerTransaction, NewPayout, NewPspPayoutRequest, NewTopUpTransfer, Payout, PayoutAccount,
    PayoutCard, PayoutMethod, PayoutPatch, PayoutQuery, PgpSubAccount, PspPayoutRequest,
    PspPayoutRequestPatch, TopUpTransfer,
};

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by ledger stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Row expected to exist was missing.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table or record kind.
        entity: &'static str,
        /// Missing id.
        id: i64,
    },

    /// Write lost a race against another writer.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    /// Stored data could not be mapped to a domain record.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Payout accounts and PSP sub-accounts (read-only).
#[async_trait]
pub trait PayoutAccountStore: Send + Sync {
    /// Loads a payout account.
    async fn get_payout_account(&self, id: PayoutAccountId) -> StoreResult<Option<PayoutAccount>>;

    /// Loads a PSP sub-account.
    async fn get_pgp_sub_account(&self, id: PgpSubAccountId) -> StoreResult<Option<PgpSubAccount>>;
}

/// Payout methods and cards (read-only).
#[async_trait]
pub trait PayoutMethodStore: Send + Sync {
    /// Lists the account's active (not deleted) payout methods.
    async fn list_payout_methods(
        &self,
        payout_account_id: PayoutAccountId,
    ) -> StoreResult<Vec<PayoutMethod>>;

    /// Loads the card records for the given method ids.
    async fn list_payout_cards(&self, ids: &[PayoutMethodId]) -> StoreResult<Vec<PayoutCard>>;
}

/// Ledger transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Lists payable transactions (active or null state, no payout, no
    /// transfer), in id order.
    async fn get_unpaid_transactions(
        &self,
        payout_account_id: PayoutAccountId,
    ) -> StoreResult<Vec<LedgerTransaction>>;

    /// Clears the payout id on those of `ids` still attached to `payout_id`.
    ///
    /// Idempotent: transactions already detached, or since re-reserved by
    /// another payout, are left alone. Returns the number of rows changed.
    async fn detach_transactions(
        &self,
        ids: &[LedgerTransactionId],
        payout_id: PayoutId,
    ) -> StoreResult<u64>;
}

/// Payout records.
#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// Inserts the payout and stamps its transactions in one storage transaction.
    ///
    /// Fails with [`StoreError::Conflict`] and writes nothing if any of the
    /// transactions already carries a payout id.
    async fn create_payout_and_attach(&self, payout: NewPayout) -> StoreResult<Payout>;

    /// Loads a payout.
    async fn get_payout(&self, id: PayoutId) -> StoreResult<Option<Payout>>;

    /// Updates status and/or error.
    async fn update_payout(&self, id: PayoutId, patch: PayoutPatch) -> StoreResult<Payout>;

    /// Lists payouts matching `query`, newest id first.
    async fn list_payouts(&self, query: &PayoutQuery) -> StoreResult<Vec<Payout>>;
}

/// PSP payout request audit rows.
#[async_trait]
pub trait PspPayoutRequestStore: Send + Sync {
    /// Records a submission before the provider is called.
    async fn create_psp_payout_request(
        &self,
        request: NewPspPayoutRequest,
    ) -> StoreResult<PspPayoutRequest>;

    /// Records the provider outcome.
    async fn update_psp_payout_request(
        &self,
        id: PspPayoutRequestId,
        patch: PspPayoutRequestPatch,
    ) -> StoreResult<PspPayoutRequest>;

    /// Lists every audit row for the given payouts, in any order.
    async fn list_psp_payout_requests(
        &self,
        payout_ids: &[PayoutId],
    ) -> StoreResult<Vec<PspPayoutRequest>>;
}

/// Top-up transfer records.
#[async_trait]
pub trait TopUpTransferStore: Send + Sync {
    /// Records a top-up before the provider is called.
    async fn create_topup_transfer(&self, transfer: NewTopUpTransfer) -> StoreResult<TopUpTransfer>;

    /// Records the provider transfer id after a successful transfer.
    async fn mark_topup_transfer_submitted(
        &self,
        id: TopUpTransferId,
        external_transfer_id: &str,
    ) -> StoreResult<TopUpTransfer>;
}

/// Every store the engine needs, bundled for wiring.
#[derive(Clone)]
pub struct LedgerStores {
    /// Payout accounts and sub-accounts.
    pub accounts: Arc<dyn PayoutAccountStore>,
    /// Payout methods and cards.
    pub methods: Arc<dyn PayoutMethodStore>,
    /// Ledger transactions.
    pub transactions: Arc<dyn TransactionStore>,
    /// Payouts.
    pub payouts: Arc<dyn PayoutStore>,
    /// PSP payout request audit rows.
    pub psp_requests: Arc<dyn PspPayoutRequestStore>,
    /// Top-up transfers.
    pub topups: Arc<dyn TopUpTransferStore>,
}

impl LedgerStores {
    /// Uses one value for every store.
    #[must_use]
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: PayoutAccountStore
            + PayoutMethodStore
            + TransactionStore
            + PayoutStore
            + PspPayoutRequestStore
            + TopUpTransferStore
            + 'static,
    {
        Self {
            accounts: store.clone(),
            methods: store.clone(),
            transactions: store.clone(),
            payouts: store.clone(),
            psp_requests: store.clone(),
            topups: store,
        }
    }
}
