//! Database layer with `SeaORM` entities, repositories and lock backends.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the payout ledger tables
//! - Postgres implementations of every `payout-core` store trait
//! - The row-lock and Redis lock backends
//! - Database migrations

pub mod entities;
pub mod lock;
pub mod migration;
pub mod repositories;

pub use lock::{RedisLocker, RowLocker};
pub use repositories::{
    PayoutAccountRepository, PayoutMethodRepository, PayoutRepository,
    PspPayoutRequestRepository, TopUpTransferRepository, TransactionRepository, ledger_stores,
};

use std::time::Duration;

use deadpool_redis::{Config as RedisConfig, CreatePoolError, Pool as RedisPool, Runtime};
use payout_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Builds a Redis connection pool. Connections are opened lazily.
///
/// # Errors
///
/// Returns an error if the URL is invalid.
pub fn redis_pool(redis_url: &str) -> Result<RedisPool, CreatePoolError> {
    RedisConfig::from_url(redis_url).create_pool(Some(Runtime::Tokio1))
}
