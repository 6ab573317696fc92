//! Row-lock backend.
//!
//! A lease owns a database transaction holding `FOR UPDATE` on the lock
//! row. The locked section verifies and reserves through that same
//! transaction, so it needs one pooled connection and its writes commit
//! with the lock. Releasing commits it; dropping the lease rolls it back,
//! which frees the row lock either way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use payout_core::lock::{LockError, LockKey, LockLease, LockStrategy, Locker, SectionStores};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QuerySelect,
    Set, TransactionTrait,
};
use tracing::debug;

use super::millis;
use crate::entities::payout_locks;
use crate::repositories::{PayoutRepository, TransactionRepository};

/// Lock backend on the ledger database.
#[derive(Debug, Clone)]
pub struct RowLocker {
    db: DatabaseConnection,
    timeout: Duration,
}

impl RowLocker {
    /// Creates a row-lock backend that waits at most `timeout` per acquire.
    #[must_use]
    pub const fn new(db: DatabaseConnection, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn ensure_row(&self, key: &LockKey) -> Result<(), DbErr> {
        let row = payout_locks::ActiveModel {
            id: Set(key.id()),
            name: Set(key.name().to_string()),
            created_at: Set(Utc::now().into()),
        };
        payout_locks::Entity::insert(row)
            .on_conflict(
                OnConflict::column(payout_locks::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn lock_row(&self, key: &LockKey) -> Result<DatabaseTransaction, DbErr> {
        let txn = self.db.begin().await?;
        txn.execute_unprepared(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            millis(self.timeout)
        ))
        .await?;
        payout_locks::Entity::find_by_id(key.id())
            .lock_exclusive()
            .one(&txn)
            .await?;
        Ok(txn)
    }

    fn classify(&self, key: &LockKey, err: &DbErr) -> LockError {
        let message = err.to_string();
        if message.contains("lock timeout") || message.contains("55P03") {
            LockError::Timeout {
                key: key.to_string(),
                waited_ms: millis(self.timeout),
            }
        } else {
            LockError::Backend(message)
        }
    }
}

struct RowLease {
    txn: Arc<DatabaseTransaction>,
}

#[async_trait]
impl LockLease for RowLease {
    fn stores(&self) -> Option<SectionStores> {
        Some(SectionStores {
            transactions: Arc::new(TransactionRepository::on(self.txn.clone())),
            payouts: Arc::new(PayoutRepository::on(self.txn.clone())),
        })
    }

    async fn release(self: Box<Self>) -> Result<(), LockError> {
        let txn = Arc::try_unwrap(self.txn).map_err(|_| {
            LockError::Backend("lock transaction still in use by the locked section".to_string())
        })?;
        txn.commit()
            .await
            .map_err(|e| LockError::Backend(e.to_string()))
    }
}

#[async_trait]
impl Locker for RowLocker {
    fn strategy(&self) -> LockStrategy {
        LockStrategy::Row
    }

    async fn acquire(&self, key: &LockKey) -> Result<Box<dyn LockLease>, LockError> {
        self.ensure_row(key)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        let txn = self
            .lock_row(key)
            .await
            .map_err(|e| self.classify(key, &e))?;

        debug!(lock = %key, "Row lock acquired");
        Ok(Box::new(RowLease { txn: Arc::new(txn) }))
    }
}
