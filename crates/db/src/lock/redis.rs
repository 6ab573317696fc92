//! Redis lock backend.
//!
//! Acquires with `SET key token NX PX ttl`, polling until the timeout.
//! Release deletes the key only while it still holds this lease's token, so
//! a lease whose TTL lapsed cannot free a lock another holder now owns.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use deadpool_redis::redis::{Script, cmd};
use payout_core::lock::{LockError, LockKey, LockLease, LockStrategy, Locker};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::millis;

const KEY_PREFIX: &str = "lock:";

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Lock backend on Redis.
#[derive(Clone)]
pub struct RedisLocker {
    pool: Pool,
    ttl: Duration,
    timeout: Duration,
    retry_delay: Duration,
}

impl RedisLocker {
    /// Creates a Redis lock backend.
    ///
    /// `ttl` bounds how long a crashed holder can block others; `timeout`
    /// bounds how long `acquire` waits.
    #[must_use]
    pub const fn new(pool: Pool, ttl: Duration, timeout: Duration) -> Self {
        Self {
            pool,
            ttl,
            timeout,
            retry_delay: Duration::from_millis(50),
        }
    }

    /// Overrides the polling delay between acquire attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn try_set(&self, redis_key: &str, token: &str) -> Result<bool, LockError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        let reply: Option<String> = cmd("SET")
            .arg(redis_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(millis(self.ttl))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(reply.is_some())
    }
}

#[allow(clippy::needless_pass_by_value)]
fn backend(e: impl std::fmt::Display) -> LockError {
    LockError::Backend(e.to_string())
}

struct RedisLease {
    pool: Pool,
    redis_key: String,
    token: String,
}

#[async_trait]
impl LockLease for RedisLease {
    async fn release(self: Box<Self>) -> Result<(), LockError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        let deleted: i64 = Script::new(RELEASE_SCRIPT)
            .key(&self.redis_key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        if deleted == 0 {
            warn!(
                lock = %self.redis_key,
                "Lock expired before release; another holder may have taken it"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Locker for RedisLocker {
    fn strategy(&self) -> LockStrategy {
        LockStrategy::Distributed
    }

    async fn acquire(&self, key: &LockKey) -> Result<Box<dyn LockLease>, LockError> {
        let redis_key = format!("{KEY_PREFIX}{}", key.name());
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.timeout;

        loop {
            if self.try_set(&redis_key, &token).await? {
                debug!(lock = %key, "Redis lock acquired");
                return Ok(Box::new(RedisLease {
                    pool: self.pool.clone(),
                    redis_key,
                    token,
                }));
            }
            if Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    key: key.to_string(),
                    waited_ms: millis(self.timeout),
                });
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
