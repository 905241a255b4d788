//! API route definitions.

pub mod approvals;
pub mod config;
pub mod expenses;
pub mod health;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;
use crate::middleware::auth_middleware;
use claimflow_shared::AppError;

/// The single error-to-HTTP mapping: renders any [`AppError`] as the
/// contractual body `{ "error": <kind>, "details": ... }` with its
/// status code. Domain errors reach this through their `From` impls.
pub(crate) fn error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "error": err.error_code(), "details": err.to_string() })),
    )
        .into_response()
}

/// Assembles all API routes.
#[must_use]
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(expenses::routes())
        .merge(approvals::routes())
        .merge(config::routes())
        .layer(from_fn_with_state(state, auth_middleware));

    Router::new().merge(health::routes()).merge(protected)
}
