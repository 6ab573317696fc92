//! Lock backends for the per-account payout lock.
//!
//! # Modules
//!
//! - `row` - `SELECT ... FOR UPDATE` on the `payout_locks` table
//! - `redis` - `SET NX PX` mutex with a compare-and-delete release

pub mod redis;
pub mod row;

pub use redis::RedisLocker;
pub use row::RowLocker;

use std::time::Duration;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
