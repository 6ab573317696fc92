//! Per-account mutual exclusion for payout creation.
//!
//! Instant payout creation and the weekly transfer job both reserve unpaid
//! transactions, so both must run their reservation under the same lock.
//! Two interchangeable backends exist behind [`Locker`]; [`LockFlags`] picks
//! one per account and [`LockCoordinator`] runs a critical section under it.
//!
//! # Modules
//!
//! - `key` - Lock identity shared by every backend
//! - `coordinator` - Strategy selection and scoped acquisition
//! - `memory` - Process-local backend for tests and single-node runs
//! - `error` - Lock acquisition errors

pub mod coordinator;
pub mod error;
pub mod key;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::{LedgerStores, PayoutStore, TransactionStore};

pub use coordinator::{LockCoordinator, LockFlags};
pub use error::LockError;
pub use key::LockKey;
pub use memory::InMemoryLocker;

/// Lock backend chosen for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    /// Row lock held inside a ledger database transaction.
    Row,
    /// Redis-backed mutex with a TTL.
    Distributed,
}

impl LockStrategy {
    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Distributed => "distributed",
        }
    }
}

impl From<payout_shared::LockBackend> for LockStrategy {
    fn from(backend: payout_shared::LockBackend) -> Self {
        match backend {
            payout_shared::LockBackend::Row => Self::Row,
            payout_shared::LockBackend::Distributed => Self::Distributed,
        }
    }
}

/// Stores a locked section verifies and reserves through.
#[derive(Clone)]
pub struct SectionStores {
    /// Ledger transactions.
    pub transactions: Arc<dyn TransactionStore>,
    /// Payouts.
    pub payouts: Arc<dyn PayoutStore>,
}

impl From<&LedgerStores> for SectionStores {
    fn from(stores: &LedgerStores) -> Self {
        Self {
            transactions: stores.transactions.clone(),
            payouts: stores.payouts.clone(),
        }
    }
}

/// A held lock.
#[async_trait]
pub trait LockLease: Send {
    /// Stores bound to the storage transaction holding the lock, for
    /// backends whose lock lives inside one.
    ///
    /// Writes made through them commit on [`LockLease::release`] and roll
    /// back if the lease is dropped.
    fn stores(&self) -> Option<SectionStores> {
        None
    }

    /// Releases the lock.
    ///
    /// Dropping a lease without releasing it also frees the lock, either
    /// immediately or once the backend's TTL lapses.
    async fn release(self: Box<Self>) -> Result<(), LockError>;
}

/// A lock backend.
#[async_trait]
pub trait Locker: Send + Sync {
    /// Strategy this backend implements.
    fn strategy(&self) -> LockStrategy;

    /// Waits up to the backend's timeout for exclusive ownership of `key`.
    async fn acquire(&self, key: &LockKey) -> Result<Box<dyn LockLease>, LockError>;
}
