//! Instant payout API server.
//!
//! Serves the HTTP API and drives the retry scheduler until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use payout_api::{AppState, create_router};
use payout_core::instant_payout::{InstantPayoutService, InstantPayoutSettings};
use payout_core::lock::LockCoordinator;
use payout_db::{RedisLocker, RowLocker, connect_with, ledger_stores, redis_pool};
use payout_psp::StripeGateway;
use payout_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(config.server.log_json);

    // Connect to database and Redis
    let db = connect_with(&config.database).await?;
    info!("Connected to database");
    let redis = redis_pool(&config.redis.url).context("Invalid Redis URL")?;

    // Lock backends
    let ttl = Duration::from_secs(config.lock.ttl_secs);
    let timeout = Duration::from_secs(config.lock.timeout_secs);
    let locks = Arc::new(LockCoordinator::new(
        Arc::new(RowLocker::new(db.clone(), timeout)),
        Arc::new(RedisLocker::new(redis, ttl, timeout)),
        Arc::new(config.lock.clone()),
    ));
    info!(
        default_strategy = ?config.lock.default_strategy,
        distributed_accounts = config.lock.distributed_accounts.len(),
        "Lock coordinator configured"
    );

    // Provider gateway and engine
    let gateway = StripeGateway::new(&config.psp).context("Failed to build PSP client")?;
    let settings =
        InstantPayoutSettings::from_config(&config.instant_payout, &config.psp.platform_account_id);
    let service = Arc::new(InstantPayoutService::new(
        ledger_stores(&db),
        Arc::new(gateway),
        locks,
        settings,
    ));

    // Retry loop
    let shutdown = CancellationToken::new();
    let scheduler = Arc::new(service.retry_scheduler());
    let retry_every = Duration::from_secs(config.instant_payout.retry_interval_secs);
    let retry_task = tokio::spawn({
        let token = shutdown.clone();
        async move {
            scheduler
                .run_until(retry_every, token.cancelled_owned())
                .await;
        }
    });

    // Start server
    let app = create_router(AppState::new(service));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    retry_task.await?;
    info!("Server stopped");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "payout=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
            token.cancel();
        }
        () = token.cancelled() => {}
    }
}
