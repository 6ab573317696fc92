//! Process-local lock backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LockError, LockKey, LockLease, LockStrategy, Locker};

/// Lock table of async mutexes keyed by lock id.
///
/// Only excludes callers within one process. Reports the strategy it was
/// built with so it can stand in for either backend.
pub struct InMemoryLocker {
    strategy: LockStrategy,
    timeout: Duration,
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl InMemoryLocker {
    /// Creates a lock table.
    #[must_use]
    pub fn new(strategy: LockStrategy, timeout: Duration) -> Self {
        Self {
            strategy,
            timeout,
            locks: DashMap::new(),
        }
    }
}

struct InMemoryLease {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LockLease for InMemoryLease {
    async fn release(self: Box<Self>) -> Result<(), LockError> {
        Ok(())
    }
}

#[async_trait]
impl Locker for InMemoryLocker {
    fn strategy(&self) -> LockStrategy {
        self.strategy
    }

    async fn acquire(&self, key: &LockKey) -> Result<Box<dyn LockLease>, LockError> {
        // Clone the Arc out so the shard guard is not held across the await.
        let mutex = self.locks.entry(key.id()).or_default().clone();
        let guard = tokio::time::timeout(self.timeout, mutex.lock_owned())
            .await
            .map_err(|_| LockError::Timeout {
                key: key.to_string(),
                waited_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?;
        Ok(Box::new(InMemoryLease { _guard: guard }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payout_shared::types::PayoutAccountId;

    #[tokio::test]
    async fn test_second_acquire_times_out_while_held() {
        let locker = InMemoryLocker::new(LockStrategy::Row, Duration::from_millis(20));
        let key = LockKey::payout_account(PayoutAccountId::new(1));

        let lease = locker.acquire(&key).await.unwrap();
        let second = locker.acquire(&key).await;
        assert!(matches!(second, Err(LockError::Timeout { .. })));

        lease.release().await.unwrap();
        assert!(locker.acquire(&key).await.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locker = InMemoryLocker::new(LockStrategy::Row, Duration::from_millis(20));
        let _a = locker
            .acquire(&LockKey::payout_account(PayoutAccountId::new(1)))
            .await
            .unwrap();
        assert!(
            locker
                .acquire(&LockKey::payout_account(PayoutAccountId::new(2)))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_dropped_lease_frees_lock() {
        let locker = InMemoryLocker::new(LockStrategy::Distributed, Duration::from_millis(20));
        let key = LockKey::from_name("batch");
        drop(locker.acquire(&key).await.unwrap());
        assert!(locker.acquire(&key).await.is_ok());
    }
}
