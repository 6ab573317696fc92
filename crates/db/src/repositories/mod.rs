//! Repository abstractions for data access.
//!
//! Each repository implements one `payout-core` store trait on Postgres,
//! hiding the `SeaORM` implementation details from the engine.

pub mod account;
pub mod method;
pub mod payout;
pub mod psp_request;
pub mod topup;
pub mod transaction;

pub use account::PayoutAccountRepository;
pub use method::PayoutMethodRepository;
pub use payout::PayoutRepository;
pub use psp_request::PspPayoutRequestRepository;
pub use topup::TopUpTransferRepository;
pub use transaction::TransactionRepository;

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use payout_core::store::{LedgerStores, StoreError};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseConnection, DbErr};

/// Builds every store the engine needs over one connection pool.
#[must_use]
pub fn ledger_stores(db: &DatabaseConnection) -> LedgerStores {
    LedgerStores {
        accounts: Arc::new(PayoutAccountRepository::new(db.clone())),
        methods: Arc::new(PayoutMethodRepository::new(db.clone())),
        transactions: Arc::new(TransactionRepository::new(db.clone())),
        payouts: Arc::new(PayoutRepository::new(db.clone())),
        psp_requests: Arc::new(PspPayoutRequestRepository::new(db.clone())),
        topups: Arc::new(TopUpTransferRepository::new(db.clone())),
    }
}

#[allow(clippy::needless_pass_by_value)]
pub(crate) fn db_err(e: DbErr) -> StoreError {
    StoreError::Database(e.to_string())
}

pub(crate) fn corrupt(e: impl Display) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

pub(crate) fn utc(ts: DateTimeWithTimeZone) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

pub(crate) fn raw_ids<T: Copy + Into<i64>>(ids: &[T]) -> Vec<i64> {
    ids.iter().map(|&id| id.into()).collect()
}
