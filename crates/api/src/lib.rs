//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - Authentication middleware
//! - Response types and the error-to-HTTP mapping

pub mod middleware;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use claimflow_core::currency::Normalizer;
use claimflow_core::receipt::ReceiptStore;
use claimflow_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Bearer token validation.
    pub jwt_service: Arc<JwtService>,
    /// Currency normalizer with its rate cache.
    pub normalizer: Arc<Normalizer>,
    /// Receipt object store.
    pub receipts: Arc<ReceiptStore>,
    /// Per-request deadline.
    pub request_timeout: Duration,
    /// Largest accepted receipt, in bytes.
    pub max_receipt_bytes: u64,
}

/// Creates the main application router.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(DefaultBodyLimit::max(
            usize::try_from(state.max_receipt_bytes)
                .unwrap_or(usize::MAX)
                .saturating_add(64 * 1024),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
