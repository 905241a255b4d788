//! Approver-facing routes: the pending queue, decisions, and history.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::routes::expenses::{company_currency, expense_response, slot_responses};
use crate::{AppState, middleware::AuthUser, routes::error_response};
use claimflow_core::approval::Verdict;
use claimflow_db::repositories::ExpenseRepository;
use claimflow_db::repositories::approval::{ApprovalRepository, ChainStats, PendingSlotItem};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/pending", get(pending_approvals))
        .route("/approvals/{slot_id}/approve", post(approve_slot))
        .route("/approvals/{slot_id}/reject", post(reject_slot))
        .route("/approvals/expense/{expense_id}", get(approval_history))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for approving a slot.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    /// Optional approver comment.
    pub comments: Option<String>,
}

/// Request body for rejecting a slot.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Rejection comment (required).
    pub comments: Option<String>,
}

/// Response for a decided slot.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// The decided slot ID.
    pub slot_id: Uuid,
    /// Its new status.
    pub slot_status: String,
    /// The expense's status after the decision.
    pub expense_status: String,
    /// Lowest still-pending sequence, if any.
    pub next_pending_sequence: Option<i32>,
    /// True once the expense is terminal.
    pub terminal: bool,
}

/// A prior decision shown to the next approver.
#[derive(Debug, Serialize)]
pub struct PriorDecisionResponse {
    /// Earlier approver's display name.
    pub approver_name: String,
    /// Their verdict.
    pub status: String,
    /// Their comment.
    pub comments: Option<String>,
}

/// One actionable pending slot.
#[derive(Debug, Serialize)]
pub struct PendingSlotResponse {
    /// The caller's slot ID.
    pub slot_id: Uuid,
    /// Its position in the chain.
    pub sequence: i32,
    /// The owning expense.
    pub expense: crate::routes::expenses::ExpenseResponse,
    /// Submitter display name.
    pub submitter_name: String,
    /// Slot count on the expense.
    pub total_slots: u32,
    /// Already-approved count.
    pub approved_slots: u32,
    /// Earlier approvers' decisions.
    pub prior_decisions: Vec<PriorDecisionResponse>,
}

/// Chain statistics.
#[derive(Debug, Serialize)]
pub struct ChainStatsResponse {
    /// Slot count.
    pub total: u32,
    /// Approved slots.
    pub approved: u32,
    /// Rejected slots.
    pub rejected: u32,
    /// Pending slots.
    pub pending: u32,
    /// `round(100 * approved / total)`.
    pub completion_percentage: u32,
}

/// History response: chain plus statistics.
#[derive(Debug, Serialize)]
pub struct ApprovalHistoryResponse {
    /// Expense ID.
    pub expense_id: Uuid,
    /// Chain ordered by sequence.
    pub chain: Vec<crate::routes::expenses::SlotResponse>,
    /// Aggregate statistics.
    pub statistics: ChainStatsResponse,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/approvals/pending` - Actionable pending slots for the caller.
async fn pending_approvals(State(state): State<AppState>, auth: AuthUser) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let base_currency = match company_currency(&state, actor.company_id).await {
        Ok(currency) => currency,
        Err(response) => return response,
    };

    match ApprovalRepository::new((*state.db).clone())
        .pending_for_me(&actor)
        .await
    {
        Ok(items) => {
            let data: Vec<PendingSlotResponse> = items
                .iter()
                .map(|item| pending_slot_response(item, &base_currency))
                .collect();
            (StatusCode::OK, Json(serde_json::json!({ "data": data }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list pending approvals");
            error_response(&e.into())
        }
    }
}

/// POST `/approvals/{slot_id}/approve` - Approve a slot.
async fn approve_slot(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slot_id): Path<Uuid>,
    payload: Option<Json<ApproveRequest>>,
) -> Response {
    let comments = payload.and_then(|p| p.0.comments);
    decide(state, auth, slot_id, Verdict::Approve, comments).await
}

/// POST `/approvals/{slot_id}/reject` - Reject a slot; a comment is
/// required.
async fn reject_slot(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slot_id): Path<Uuid>,
    payload: Option<Json<RejectRequest>>,
) -> Response {
    let comments = payload.and_then(|p| p.0.comments);
    decide(state, auth, slot_id, Verdict::Reject, comments).await
}

async fn decide(
    state: AppState,
    auth: AuthUser,
    slot_id: Uuid,
    verdict: Verdict,
    comments: Option<String>,
) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match ApprovalRepository::new((*state.db).clone())
        .decide(&actor, slot_id, verdict, comments)
        .await
    {
        Ok(result) => {
            info!(
                slot_id = %slot_id,
                expense_id = %result.expense.id,
                terminal = result.terminal,
                "Slot decided"
            );

            let response = DecisionResponse {
                slot_id: result.slot.id,
                slot_status: result.slot.status.to_value(),
                expense_status: result.expense.status.to_value(),
                next_pending_sequence: result.next_pending_sequence,
                terminal: result.terminal,
            };

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

/// GET `/approvals/expense/{expense_id}` - Chain and statistics.
async fn approval_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match ExpenseRepository::new((*state.db).clone())
        .get_expense(&actor, expense_id)
        .await
    {
        Ok(detail) => {
            let stats =
                ChainStats::compute(detail.chain.iter().map(|d| &d.slot.status));
            let response = ApprovalHistoryResponse {
                expense_id,
                chain: slot_responses(&detail.chain),
                statistics: ChainStatsResponse {
                    total: stats.total,
                    approved: stats.approved,
                    rejected: stats.rejected,
                    pending: stats.pending,
                    completion_percentage: stats.completion_percentage,
                },
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn pending_slot_response(item: &PendingSlotItem, base_currency: &str) -> PendingSlotResponse {
    PendingSlotResponse {
        slot_id: item.slot.id,
        sequence: item.slot.sequence,
        expense: expense_response(&item.expense, base_currency),
        submitter_name: item.submitter_name.clone(),
        total_slots: item.total_slots,
        approved_slots: item.approved_slots,
        prior_decisions: item
            .prior
            .iter()
            .map(|p| PriorDecisionResponse {
                approver_name: p.approver_name.clone(),
                status: p.status.to_value(),
                comments: p.comments.clone(),
            })
            .collect(),
    }
}

