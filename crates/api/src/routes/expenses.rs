//! Expense submission and query routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use claimflow_core::approval::ExpenseStatus as CoreExpenseStatus;
use claimflow_core::receipt::ReceiptStore;
use claimflow_db::entities::{expenses, sea_orm_active_enums::ApprovalStatus};
use claimflow_db::repositories::{
    CompanyRepository, ExpenseRepository, core_to_expense_status,
    expense::{ExpenseFilter, SlotDetail, SubmitExpenseInput},
};
use claimflow_shared::AppError;
use claimflow_shared::types::{PageRequest, PageResponse};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(submit_expense))
        .route("/expenses", get(list_expenses))
        .route("/expenses/my", get(list_my_expenses))
        .route("/expenses/{expense_id}", get(get_expense))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for expense listings.
#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub limit: Option<u32>,
    /// Filter by status.
    pub status: Option<String>,
    /// Case-insensitive substring filter on category.
    pub category: Option<String>,
    /// Inclusive start of the date range (YYYY-MM-DD).
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive end of the date range (YYYY-MM-DD).
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

/// Response body for an expense.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    /// Expense ID.
    pub id: Uuid,
    /// Submitter user ID.
    pub submitter_id: Uuid,
    /// Amount in the company base currency.
    pub amount: String,
    /// Company base currency code.
    pub currency: String,
    /// Amount exactly as submitted.
    pub original_amount: String,
    /// Submitted currency code.
    pub original_currency: String,
    /// Category.
    pub category: String,
    /// Description.
    pub description: Option<String>,
    /// Expense date.
    pub date: String,
    /// Status.
    pub status: String,
    /// Opaque receipt URL.
    pub receipt_url: Option<String>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

/// Response body for one approval slot.
#[derive(Debug, Serialize)]
pub struct SlotResponse {
    /// Slot ID.
    pub id: Uuid,
    /// Position in the chain.
    pub sequence: i32,
    /// Assigned approver user ID.
    pub approver_id: Uuid,
    /// Assigned approver display name.
    pub approver_name: String,
    /// Status.
    pub status: String,
    /// Decision comment.
    pub comments: Option<String>,
    /// When the slot was decided.
    pub decided_at: Option<String>,
}

/// The next approver in line.
#[derive(Debug, Serialize)]
pub struct NextApproverResponse {
    /// Slot ID.
    pub slot_id: Uuid,
    /// Position in the chain.
    pub sequence: i32,
    /// Approver user ID.
    pub approver_id: Uuid,
    /// Approver display name.
    pub approver_name: String,
}

/// Response for a submission.
#[derive(Debug, Serialize)]
pub struct SubmitExpenseResponse {
    /// The created expense.
    pub expense: ExpenseResponse,
    /// The materialized chain, ordered by sequence.
    pub chain: Vec<SlotResponse>,
    /// The first approver in line, if the chain is non-empty.
    pub next_approver: Option<NextApproverResponse>,
    /// Configuration warning (no approvers configured).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// An expense with its chain, as returned by listings.
#[derive(Debug, Serialize)]
pub struct ExpenseWithChainResponse {
    /// The expense.
    pub expense: ExpenseResponse,
    /// Its chain, ordered by sequence.
    pub chain: Vec<SlotResponse>,
}

/// Detail response with the submitter's name.
#[derive(Debug, Serialize)]
pub struct ExpenseDetailResponse {
    /// The expense.
    pub expense: ExpenseResponse,
    /// Submitter display name.
    pub submitter_name: String,
    /// Its chain, ordered by sequence.
    pub chain: Vec<SlotResponse>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/expenses` - Create an expense and materialize its chain.
///
/// Multipart fields: `amount`, `currency`, `category`, `description?`,
/// `date`, and an optional `receipt` file.
async fn submit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let form = match parse_submission(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    // Base currency comes from the submitter's company.
    let company = match CompanyRepository::new((*state.db).clone())
        .find_by_id(actor.company_id)
        .await
    {
        Ok(Some(company)) => company,
        Ok(None) => return error_response(&AppError::NotFound("Company not found".to_string())),
        Err(e) => {
            error!(error = %e, "Failed to load company");
            return internal_error();
        }
    };

    // Normalization runs once, before anything is persisted.
    let conversion = match state
        .normalizer
        .normalize(form.amount, &form.currency, &company.currency)
        .await
    {
        Ok(conversion) => conversion,
        Err(e) => return error_response(&e.into()),
    };

    // Store the receipt first; it is deleted again if the transaction
    // does not commit.
    let mut receipt = None;
    if let Some(upload) = &form.receipt {
        if let Err(e) = state
            .receipts
            .validate(&upload.content_type, upload.bytes.len() as u64)
        {
            return error_response(&e.into());
        }

        let key = ReceiptStore::object_key(actor.company_id, Uuid::new_v4(), &upload.filename);
        match state.receipts.save(&key, upload.bytes.clone()).await {
            Ok(url) => receipt = Some((key, url)),
            Err(e) => {
                error!(error = %e, "Failed to store receipt");
                return internal_error();
            }
        }
    }

    let input = SubmitExpenseInput {
        submitter_id: actor.user_id,
        company_id: actor.company_id,
        amount: conversion.amount,
        original_amount: form.amount,
        original_currency: form.currency.to_ascii_uppercase(),
        category: form.category,
        description: form.description,
        date: form.date,
        receipt_url: receipt.as_ref().map(|(_, url)| url.clone()),
    };

    match ExpenseRepository::new((*state.db).clone()).submit(input).await {
        Ok(submitted) => {
            info!(
                expense_id = %submitted.expense.id,
                company_id = %actor.company_id,
                slots = submitted.chain.len(),
                "Expense submitted"
            );

            let next_approver = submitted
                .chain
                .iter()
                .find(|d| d.slot.status == ApprovalStatus::Pending)
                .map(|d| NextApproverResponse {
                    slot_id: d.slot.id,
                    sequence: d.slot.sequence,
                    approver_id: d.slot.approver_id,
                    approver_name: d.approver_name.clone(),
                });

            let response = SubmitExpenseResponse {
                expense: expense_response(&submitted.expense, &company.currency),
                chain: slot_responses(&submitted.chain),
                next_approver,
                warning: submitted.warning,
            };

            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => {
            // Compensating delete after the rollback.
            if let Some((key, _)) = receipt {
                if let Err(cleanup) = state.receipts.delete(&key).await {
                    error!(error = %cleanup, "Failed to delete orphaned receipt");
                }
            }

            error!(error = %e, "Failed to submit expense");
            error_response(&e.into())
        }
    }
}

/// GET `/expenses/my` - The caller's expenses with chains.
async fn list_my_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListExpensesQuery>,
) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let (filter, page) = match query_to_filter(&query) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .list_my_expenses(&actor, &filter, page.offset(), page.limit_clamped())
        .await
    {
        Ok((items, total)) => listing_response(&state, actor.company_id, items, &page, total).await,
        Err(e) => {
            error!(error = %e, "Failed to list expenses");
            error_response(&e.into())
        }
    }
}

/// GET `/expenses` - Role-scoped, filtered, paginated listing.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListExpensesQuery>,
) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let (filter, page) = match query_to_filter(&query) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .list_expenses(&actor, &filter, page.offset(), page.limit_clamped())
        .await
    {
        Ok((items, total)) => listing_response(&state, actor.company_id, items, &page, total).await,
        Err(e) => {
            error!(error = %e, "Failed to list expenses");
            error_response(&e.into())
        }
    }
}

/// GET `/expenses/{expense_id}` - Detail with the full chain.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> Response {
    let actor = match auth.actor() {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let base_currency = match company_currency(&state, actor.company_id).await {
        Ok(currency) => currency,
        Err(response) => return response,
    };

    match ExpenseRepository::new((*state.db).clone())
        .get_expense(&actor, expense_id)
        .await
    {
        Ok(detail) => {
            let response = ExpenseDetailResponse {
                expense: expense_response(&detail.expense, &base_currency),
                submitter_name: detail.submitter_name,
                chain: slot_responses(&detail.chain),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e.into()),
    }
}

// ============================================================================
// Multipart parsing
// ============================================================================

struct ReceiptUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

struct SubmissionForm {
    amount: Decimal,
    currency: String,
    category: String,
    description: Option<String>,
    date: NaiveDate,
    receipt: Option<ReceiptUpload>,
}

async fn parse_submission(mut multipart: Multipart) -> Result<SubmissionForm, Response> {
    let mut amount = None;
    let mut currency = None;
    let mut category = None;
    let mut description = None;
    let mut date = None;
    let mut receipt = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(validation(format!("Malformed multipart body: {e}")));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "amount" => amount = Some(read_text(field, "amount").await?),
            "currency" => currency = Some(read_text(field, "currency").await?),
            "category" => category = Some(read_text(field, "category").await?),
            "description" => description = Some(read_text(field, "description").await?),
            "date" => date = Some(read_text(field, "date").await?),
            "receipt" => {
                let filename = field.file_name().unwrap_or("receipt").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| validation(format!("Failed to read receipt: {e}")))?;
                receipt = Some(ReceiptUpload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let amount = required(amount, "amount")?;
    let currency = required(currency, "currency")?;
    let category = required(category, "category")?;
    let date = required(date, "date")?;

    let amount = Decimal::from_str(amount.trim())
        .map_err(|_| validation("amount must be a decimal number"))?;
    if amount <= Decimal::ZERO {
        return Err(validation("amount must be positive"));
    }

    if category.trim().is_empty() {
        return Err(validation("category must not be empty"));
    }

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| validation("date must be formatted YYYY-MM-DD"))?;

    Ok(SubmissionForm {
        amount,
        currency,
        category,
        description: description.filter(|d| !d.trim().is_empty()),
        date,
        receipt,
    })
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, Response> {
    field
        .text()
        .await
        .map_err(|e| validation(format!("Failed to read field {name}: {e}")))
}

fn required(value: Option<String>, name: &str) -> Result<String, Response> {
    value.ok_or_else(|| validation(format!("missing required field: {name}")))
}

fn validation(details: impl Into<String>) -> Response {
    error_response(&AppError::Validation(details.into()))
}

// ============================================================================
// Helper functions
// ============================================================================

pub(crate) fn expense_response(
    expense: &expenses::Model,
    base_currency: &str,
) -> ExpenseResponse {
    ExpenseResponse {
        id: expense.id,
        submitter_id: expense.user_id,
        amount: expense.amount.to_string(),
        currency: base_currency.to_string(),
        original_amount: expense.original_amount.to_string(),
        original_currency: expense.original_currency.clone(),
        category: expense.category.clone(),
        description: expense.description.clone(),
        date: expense.date.to_string(),
        status: expense.status.to_value(),
        receipt_url: expense.receipt_url.clone(),
        created_at: expense.created_at.to_rfc3339(),
        updated_at: expense.updated_at.to_rfc3339(),
    }
}

pub(crate) fn slot_responses(chain: &[SlotDetail]) -> Vec<SlotResponse> {
    chain
        .iter()
        .map(|detail| SlotResponse {
            id: detail.slot.id,
            sequence: detail.slot.sequence,
            approver_id: detail.slot.approver_id,
            approver_name: detail.approver_name.clone(),
            status: detail.slot.status.to_value(),
            comments: detail.slot.comments.clone(),
            decided_at: detail
                .slot
                .approved_at
                .as_ref()
                .map(chrono::DateTime::to_rfc3339),
        })
        .collect()
}

pub(crate) async fn company_currency(
    state: &AppState,
    company_id: Uuid,
) -> Result<String, Response> {
    match CompanyRepository::new((*state.db).clone())
        .find_by_id(company_id)
        .await
    {
        Ok(Some(company)) => Ok(company.currency),
        Ok(None) => Err(error_response(&AppError::NotFound(
            "Company not found".to_string(),
        ))),
        Err(e) => {
            error!(error = %e, "Failed to load company");
            Err(internal_error())
        }
    }
}

fn query_to_filter(query: &ListExpensesQuery) -> Result<(ExpenseFilter, PageRequest), Response> {
    let status = match &query.status {
        Some(raw) => Some(
            CoreExpenseStatus::parse(raw)
                .map(core_to_expense_status)
                .ok_or_else(|| validation(format!("unknown status: {raw}")))?,
        ),
        None => None,
    };

    let filter = ExpenseFilter {
        status,
        category: query.category.clone().filter(|c| !c.trim().is_empty()),
        date_from: query.start_date,
        date_to: query.end_date,
    };

    let page = PageRequest {
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(20),
    };

    Ok((filter, page))
}

async fn listing_response(
    state: &AppState,
    company_id: Uuid,
    items: Vec<claimflow_db::repositories::expense::ExpenseWithChain>,
    page: &PageRequest,
    total: u64,
) -> Response {
    let base_currency = match company_currency(state, company_id).await {
        Ok(currency) => currency,
        Err(response) => return response,
    };

    let data: Vec<ExpenseWithChainResponse> = items
        .iter()
        .map(|item| ExpenseWithChainResponse {
            expense: expense_response(&item.expense, &base_currency),
            chain: slot_responses(&item.chain),
        })
        .collect();

    let limit = page.limit_clamped() as u32;
    (
        StatusCode::OK,
        Json(PageResponse::new(data, page.page, limit, total)),
    )
        .into_response()
}

fn internal_error() -> Response {
    error_response(&AppError::Internal("An error occurred".to_string()))
}
