//! Backend selection and scoped lock acquisition.

use std::future::Future;
use std::sync::Arc;

use payout_shared::LockConfig;
use payout_shared::types::PayoutAccountId;

use super::{LockError, LockKey, LockStrategy, Locker, SectionStores};

/// Source of the per-account lock backend choice.
pub trait LockFlags: Send + Sync {
    /// Backend the account's lock lives on.
    fn strategy_for(&self, account_id: PayoutAccountId) -> LockStrategy;
}

impl LockFlags for LockConfig {
    fn strategy_for(&self, account_id: PayoutAccountId) -> LockStrategy {
        if self.distributed_for_all || self.distributed_accounts.contains(&account_id.into_inner())
        {
            LockStrategy::Distributed
        } else {
            self.default_strategy.into()
        }
    }
}

/// Runs critical sections under the backend picked for each account.
pub struct LockCoordinator {
    row: Arc<dyn Locker>,
    distributed: Arc<dyn Locker>,
    flags: Arc<dyn LockFlags>,
}

impl LockCoordinator {
    /// Creates a coordinator over both backends.
    #[must_use]
    pub fn new(
        row: Arc<dyn Locker>,
        distributed: Arc<dyn Locker>,
        flags: Arc<dyn LockFlags>,
    ) -> Self {
        Self {
            row,
            distributed,
            flags,
        }
    }

    /// Resolves the strategy for an account. Call once per request.
    #[must_use]
    pub fn strategy_for(&self, account_id: PayoutAccountId) -> LockStrategy {
        self.flags.strategy_for(account_id)
    }

    fn locker(&self, strategy: LockStrategy) -> &dyn Locker {
        match strategy {
            LockStrategy::Row => self.row.as_ref(),
            LockStrategy::Distributed => self.distributed.as_ref(),
        }
    }

    /// Runs `section` while holding `key` on the `strategy` backend.
    ///
    /// `section` receives the lease's transactional stores when the backend
    /// has them, otherwise `stores`. Acquisition failure returns before
    /// `section` starts. The lock is released once `section` completes,
    /// whatever its outcome. A failed release is logged and ignored, except
    /// that a transactional lease failing to commit a successful section
    /// fails the call, since the section's writes were lost with it.
    pub async fn run_exclusive<T, E, F, Fut>(
        &self,
        strategy: LockStrategy,
        key: &LockKey,
        stores: &SectionStores,
        section: F,
    ) -> Result<T, E>
    where
        F: FnOnce(SectionStores) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let lease = self.locker(strategy).acquire(key).await?;
        let scoped = lease.stores();
        let transactional = scoped.is_some();
        tracing::debug!(lock = %key, strategy = strategy.as_str(), transactional, "Lock acquired");

        let result = section(scoped.unwrap_or_else(|| stores.clone())).await;

        match (lease.release().await, result) {
            (Err(e), Ok(_)) if transactional => {
                tracing::error!(lock = %key, error = %e, "Failed to commit locked section");
                Err(e.into())
            }
            (Err(e), result) => {
                tracing::warn!(lock = %key, error = %e, "Failed to release lock");
                result
            }
            (Ok(()), result) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use payout_shared::LockBackend;
    use payout_shared::types::LedgerTransactionId;
    use rstest::rstest;

    use super::*;
    use crate::domain::LedgerTransaction;
    use crate::lock::{InMemoryLocker, LockLease};
    use crate::store::LedgerStores;
    use crate::store::memory::InMemoryLedger;

    fn memory_stores() -> (Arc<InMemoryLedger>, SectionStores) {
        let ledger = Arc::new(InMemoryLedger::new());
        let stores = SectionStores::from(&LedgerStores::from_shared(ledger.clone()));
        (ledger, stores)
    }

    /// Lease carrying its own stores, like a lock held inside a database
    /// transaction.
    struct TransactionalLocker {
        stores: SectionStores,
        commit_fails: bool,
    }

    struct TransactionalLease {
        stores: SectionStores,
        commit_fails: bool,
    }

    #[async_trait]
    impl LockLease for TransactionalLease {
        fn stores(&self) -> Option<SectionStores> {
            Some(self.stores.clone())
        }

        async fn release(self: Box<Self>) -> Result<(), LockError> {
            if self.commit_fails {
                Err(LockError::Backend("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Locker for TransactionalLocker {
        fn strategy(&self) -> LockStrategy {
            LockStrategy::Row
        }

        async fn acquire(&self, _key: &LockKey) -> Result<Box<dyn LockLease>, LockError> {
            Ok(Box::new(TransactionalLease {
                stores: self.stores.clone(),
                commit_fails: self.commit_fails,
            }))
        }
    }

    #[rstest]
    #[case(LockBackend::Row, false, vec![], 7, LockStrategy::Row)]
    #[case(LockBackend::Distributed, false, vec![], 7, LockStrategy::Distributed)]
    #[case(LockBackend::Row, true, vec![], 7, LockStrategy::Distributed)]
    #[case(LockBackend::Row, false, vec![7], 7, LockStrategy::Distributed)]
    #[case(LockBackend::Row, false, vec![8], 7, LockStrategy::Row)]
    fn test_strategy_for(
        #[case] default_strategy: LockBackend,
        #[case] distributed_for_all: bool,
        #[case] distributed_accounts: Vec<i64>,
        #[case] account: i64,
        #[case] expected: LockStrategy,
    ) {
        let config = LockConfig {
            default_strategy,
            distributed_accounts,
            distributed_for_all,
            ..LockConfig::default()
        };
        assert_eq!(config.strategy_for(PayoutAccountId::new(account)), expected);
    }

    fn coordinator(config: LockConfig) -> (LockCoordinator, Arc<InMemoryLocker>, Arc<InMemoryLocker>) {
        let row = Arc::new(InMemoryLocker::new(LockStrategy::Row, Duration::from_millis(20)));
        let distributed = Arc::new(InMemoryLocker::new(
            LockStrategy::Distributed,
            Duration::from_millis(20),
        ));
        let coordinator = LockCoordinator::new(row.clone(), distributed.clone(), Arc::new(config));
        (coordinator, row, distributed)
    }

    #[tokio::test]
    async fn test_run_exclusive_uses_selected_backend() {
        let (coordinator, _row, distributed) = coordinator(LockConfig::default());
        let key = LockKey::payout_account(PayoutAccountId::new(1));

        let (_, stores) = memory_stores();

        let held = distributed.acquire(&key).await.unwrap();
        let on_row: Result<i32, LockError> = coordinator
            .run_exclusive(LockStrategy::Row, &key, &stores, |_| async { Ok(1) })
            .await;
        let on_distributed: Result<i32, LockError> = coordinator
            .run_exclusive(LockStrategy::Distributed, &key, &stores, |_| async { Ok(2) })
            .await;

        assert_eq!(on_row.unwrap(), 1);
        assert!(matches!(on_distributed, Err(LockError::Timeout { .. })));
        held.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_exclusive_releases_after_error() {
        let (coordinator, row, _) = coordinator(LockConfig::default());
        let key = LockKey::payout_account(PayoutAccountId::new(1));

        let (_, stores) = memory_stores();

        let failed: Result<(), LockError> = coordinator
            .run_exclusive(LockStrategy::Row, &key, &stores, |_| async {
                Err(LockError::Backend("boom".to_string()))
            })
            .await;

        assert!(failed.is_err());
        assert!(row.acquire(&key).await.is_ok());
    }

    async fn unpaid_count(stores: SectionStores) -> Result<usize, LockError> {
        let unpaid = stores
            .transactions
            .get_unpaid_transactions(PayoutAccountId::new(1))
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(unpaid.len())
    }

    async fn transactional_coordinator(commit_fails: bool) -> LockCoordinator {
        let (lease_ledger, lease_stores) = memory_stores();
        lease_ledger
            .insert_transaction(LedgerTransaction {
                id: LedgerTransactionId::new(1),
                payout_account_id: PayoutAccountId::new(1),
                amount: 500,
                state: None,
                payout_id: None,
                transfer_id: None,
                created_at: Utc::now(),
            })
            .await;
        let locker = Arc::new(TransactionalLocker {
            stores: lease_stores,
            commit_fails,
        });
        LockCoordinator::new(locker.clone(), locker, Arc::new(LockConfig::default()))
    }

    #[tokio::test]
    async fn test_run_exclusive_prefers_lease_stores() {
        let coordinator = transactional_coordinator(false).await;
        let key = LockKey::payout_account(PayoutAccountId::new(1));
        let (_, pool_stores) = memory_stores();

        let seen = coordinator
            .run_exclusive(LockStrategy::Row, &key, &pool_stores, unpaid_count)
            .await
            .unwrap();

        // The fallback stores are empty; only the lease's stores hold the row.
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn test_run_exclusive_fails_when_lease_commit_fails() {
        let coordinator = transactional_coordinator(true).await;
        let key = LockKey::payout_account(PayoutAccountId::new(1));
        let (_, pool_stores) = memory_stores();

        let result = coordinator
            .run_exclusive(LockStrategy::Row, &key, &pool_stores, unpaid_count)
            .await;

        assert!(matches!(result, Err(LockError::Backend(_))));
    }

    #[tokio::test]
    async fn test_run_exclusive_falls_back_to_given_stores() {
        let (coordinator, _row, _) = coordinator(LockConfig::default());
        let key = LockKey::payout_account(PayoutAccountId::new(1));
        let (_, stores) = memory_stores();

        let result: Result<usize, LockError> = coordinator
            .run_exclusive(LockStrategy::Row, &key, &stores, unpaid_count)
            .await;

        assert_eq!(result.unwrap(), 0);
    }
}
