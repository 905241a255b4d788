//! Admin configuration routes: the approver roster and the rule set.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use claimflow_core::rules::RuleConfig;
use claimflow_db::entities::approval_rules;
use claimflow_db::repositories::approver::ApproverDetail;
use claimflow_db::repositories::{ApprovalRuleRepository, ApproverRepository, UserRepository};
use claimflow_shared::AppError;

/// Creates the admin configuration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/config/approvers", post(add_approver))
        .route("/config/approvers", get(list_approvers))
        .route("/config/approvers/{approver_id}/sequence", put(update_sequence))
        .route("/config/approvers/{approver_id}", delete(remove_approver))
        .route("/config/users/{user_id}/manager", put(set_user_manager))
        .route("/config/rules", post(set_rule))
        .route("/config/rules", get(list_rules))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for adding an approver.
#[derive(Debug, Deserialize)]
pub struct AddApproverRequest {
    /// The approving user.
    pub user_id: Uuid,
    /// Free-form label.
    pub role_name: String,
    /// Position among the company's approvers.
    pub sequence: i32,
}

/// Request body for moving an approver.
#[derive(Debug, Deserialize)]
pub struct UpdateSequenceRequest {
    /// The target sequence.
    pub sequence: i32,
}

/// Request body for assigning a user's direct manager.
#[derive(Debug, Deserialize)]
pub struct SetManagerRequest {
    /// The new manager; `null` clears the link.
    pub manager_id: Option<Uuid>,
}

/// Response for a roster row.
#[derive(Debug, Serialize)]
pub struct ApproverResponse {
    /// Roster row ID.
    pub id: Uuid,
    /// The approving user.
    pub user_id: Uuid,
    /// Display name of the user.
    pub user_name: String,
    /// Free-form label.
    pub role_name: String,
    /// Position among the company's approvers.
    pub sequence: i32,
    /// Whether the row is active.
    pub is_active: bool,
}

/// Response for a rule row.
#[derive(Debug, Serialize)]
pub struct RuleResponse {
    /// Rule row ID.
    pub id: Uuid,
    /// Rule type tag.
    pub rule_type: String,
    /// The stored configuration.
    pub config: serde_json::Value,
    /// Human-readable summary.
    pub description: String,
    /// Whether the rule is active.
    pub is_active: bool,
    /// Created at timestamp.
    pub created_at: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/config/approvers` - Add a user to the roster.
async fn add_approver(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AddApproverRequest>,
) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    match ApproverRepository::new((*state.db).clone())
        .add(
            auth.company_id(),
            payload.user_id,
            &payload.role_name,
            payload.sequence,
        )
        .await
    {
        Ok(row) => {
            info!(
                company_id = %auth.company_id(),
                user_id = %payload.user_id,
                sequence = row.sequence,
                "Approver added"
            );
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "id": row.id,
                    "user_id": row.user_id,
                    "role_name": row.role_name,
                    "sequence": row.sequence,
                    "is_active": row.is_active
                })),
            )
                .into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// GET `/config/approvers` - List the roster, active and inactive.
async fn list_approvers(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    match ApproverRepository::new((*state.db).clone())
        .list(auth.company_id())
        .await
    {
        Ok(rows) => {
            let data: Vec<ApproverResponse> = rows.iter().map(approver_response).collect();
            (StatusCode::OK, Json(serde_json::json!({ "data": data }))).into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// PUT `/config/approvers/{approver_id}/sequence` - Move an approver,
/// swapping with any occupant.
async fn update_sequence(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(approver_id): Path<Uuid>,
    Json(payload): Json<UpdateSequenceRequest>,
) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    match ApproverRepository::new((*state.db).clone())
        .update_sequence(auth.company_id(), approver_id, payload.sequence)
        .await
    {
        Ok(row) => {
            info!(
                approver_id = %approver_id,
                sequence = row.sequence,
                "Approver sequence updated"
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": row.id,
                    "sequence": row.sequence
                })),
            )
                .into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// DELETE `/config/approvers/{approver_id}` - Soft-delete a roster row.
async fn remove_approver(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(approver_id): Path<Uuid>,
) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    match ApproverRepository::new((*state.db).clone())
        .remove(auth.company_id(), approver_id)
        .await
    {
        Ok(row) => {
            info!(approver_id = %approver_id, "Approver removed");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": row.id,
                    "is_active": row.is_active
                })),
            )
                .into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// PUT `/config/users/{user_id}/manager` - Assign or clear a user's
/// direct manager. The assignment is rejected when it would close a
/// reporting cycle.
async fn set_user_manager(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetManagerRequest>,
) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    match UserRepository::new((*state.db).clone())
        .set_manager(auth.company_id(), user_id, payload.manager_id)
        .await
    {
        Ok(user) => {
            info!(
                user_id = %user_id,
                manager_id = ?user.manager_id,
                "Manager assignment updated"
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": user.id,
                    "manager_id": user.manager_id
                })),
            )
                .into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// POST `/config/rules` - Activate a rule, replacing any active rule of
/// the same type. Unknown rule types are rejected outright.
async fn set_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    let config: RuleConfig = match serde_json::from_value(payload) {
        Ok(config) => config,
        Err(e) => {
            return error_response(&AppError::Validation(format!(
                "Unrecognized rule configuration: {e}"
            )));
        }
    };

    match ApprovalRuleRepository::new((*state.db).clone())
        .set_rule(auth.company_id(), config)
        .await
    {
        Ok(row) => {
            info!(
                company_id = %auth.company_id(),
                rule_type = %row.rule_type.to_value(),
                "Approval rule activated"
            );
            (StatusCode::CREATED, Json(rule_response(&row))).into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// GET `/config/rules` - List every rule with a description.
async fn list_rules(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(response) = require_admin(&auth) {
        return response;
    }

    match ApprovalRuleRepository::new((*state.db).clone())
        .list(auth.company_id())
        .await
    {
        Ok(rows) => {
            let data: Vec<RuleResponse> = rows.iter().map(rule_response).collect();
            (StatusCode::OK, Json(serde_json::json!({ "data": data }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list rules");
            error_response(&e.into())
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn require_admin(auth: &AuthUser) -> Result<(), Response> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(error_response(&AppError::Forbidden(
            "Company configuration requires the admin role".to_string(),
        )))
    }
}

fn approver_response(detail: &ApproverDetail) -> ApproverResponse {
    ApproverResponse {
        id: detail.approver.id,
        user_id: detail.approver.user_id,
        user_name: detail.user_name.clone(),
        role_name: detail.approver.role_name.clone(),
        sequence: detail.approver.sequence,
        is_active: detail.approver.is_active,
    }
}

fn rule_response(row: &approval_rules::Model) -> RuleResponse {
    let description = match serde_json::from_value::<RuleConfig>(row.rule_config.clone()) {
        Ok(config) => config.describe(),
        Err(e) => {
            warn!(rule_id = %row.id, error = %e, "stored rule config does not parse");
            "unrecognized rule configuration".to_string()
        }
    };

    RuleResponse {
        id: row.id,
        rule_type: row.rule_type.to_value(),
        config: row.rule_config.clone(),
        description,
        is_active: row.is_active,
        created_at: row.created_at.to_rfc3339(),
    }
}
