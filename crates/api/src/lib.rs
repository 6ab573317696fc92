//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Instant payout routes (eligibility, creation, stream)
//! - Health check
//! - Error envelope rendering

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use payout_core::instant_payout::InstantPayoutService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Instant payout engine.
    pub payouts: Arc<InstantPayoutService>,
}

impl AppState {
    /// Creates handler state over the engine.
    #[must_use]
    pub const fn new(payouts: Arc<InstantPayoutService>) -> Self {
        Self { payouts }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
