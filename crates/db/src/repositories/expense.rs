//! Expense repository: submission (chain building) and the query surface.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionError, TransactionTrait,
};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use claimflow_core::approval::{
    ConfiguredApprover, EmptyChainOutcome, Role, assemble, empty_chain_outcome,
};
use claimflow_shared::AppError;

use crate::entities::{
    approvals, approvers, expenses,
    sea_orm_active_enums::{ApprovalStatus, ExpenseStatus},
    users,
};
use crate::repositories::{Actor, user_role_to_core};

/// Errors for expense operations.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Expense not present or outside the caller's company.
    #[error("Expense {0} not found")]
    NotFound(Uuid),

    /// The submitter does not exist in the company.
    #[error("Submitter {0} not found")]
    SubmitterNotFound(Uuid),

    /// The caller's role does not grant visibility of this expense.
    #[error("You are not allowed to view this expense")]
    AccessDenied,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<ExpenseError> for AppError {
    fn from(err: ExpenseError) -> Self {
        match err {
            ExpenseError::NotFound(_) | ExpenseError::SubmitterNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            ExpenseError::AccessDenied => Self::Forbidden(err.to_string()),
            ExpenseError::Database(msg) => Self::Database(msg),
        }
    }
}

impl From<sea_orm::DbErr> for ExpenseError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

fn flatten_txn(err: TransactionError<ExpenseError>) -> ExpenseError {
    match err {
        TransactionError::Connection(db) => ExpenseError::Database(db.to_string()),
        TransactionError::Transaction(inner) => inner,
    }
}

/// Input for creating an expense. Amounts arrive already normalized.
#[derive(Debug, Clone)]
pub struct SubmitExpenseInput {
    /// Submitter.
    pub submitter_id: Uuid,
    /// Submitter's company.
    pub company_id: Uuid,
    /// Amount in the company base currency.
    pub amount: Decimal,
    /// Amount exactly as submitted.
    pub original_amount: Decimal,
    /// Submitted currency code, uppercase.
    pub original_currency: String,
    /// Free-form category.
    pub category: String,
    /// Optional description.
    pub description: Option<String>,
    /// Expense date.
    pub date: NaiveDate,
    /// Opaque receipt URL, if a receipt was uploaded.
    pub receipt_url: Option<String>,
}

/// One slot with its approver's display name.
#[derive(Debug, Clone)]
pub struct SlotDetail {
    /// The slot row.
    pub slot: approvals::Model,
    /// Display name of the assigned approver.
    pub approver_name: String,
}

/// A persisted expense with its ordered chain.
#[derive(Debug, Clone)]
pub struct ExpenseWithChain {
    /// The expense row.
    pub expense: expenses::Model,
    /// Chain ordered by sequence.
    pub chain: Vec<SlotDetail>,
}

/// Result of a submission.
#[derive(Debug, Clone)]
pub struct SubmittedExpense {
    /// The expense row.
    pub expense: expenses::Model,
    /// Chain ordered by sequence.
    pub chain: Vec<SlotDetail>,
    /// Configuration warning (empty chain for a non-admin submitter).
    pub warning: Option<String>,
}

/// Full detail for one expense.
#[derive(Debug, Clone)]
pub struct ExpenseDetail {
    /// The expense row.
    pub expense: expenses::Model,
    /// Display name of the submitter.
    pub submitter_name: String,
    /// Chain ordered by sequence.
    pub chain: Vec<SlotDetail>,
}

/// Filters for expense listings.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Filter by status.
    pub status: Option<ExpenseStatus>,
    /// Case-insensitive substring match on category.
    pub category: Option<String>,
    /// Inclusive start of the date range.
    pub date_from: Option<NaiveDate>,
    /// Inclusive end of the date range.
    pub date_to: Option<NaiveDate>,
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persists an expense and materializes its approval chain, all in
    /// one transaction.
    ///
    /// The chain is the submitter's direct manager followed by the
    /// company's active configured approvers, deduplicated, densely
    /// renumbered from 1. An empty chain approves the expense
    /// immediately for admin submitters and otherwise leaves it pending
    /// with a configuration warning.
    ///
    /// # Errors
    ///
    /// Returns `SubmitterNotFound` if the submitter is not in the
    /// company; any failure rolls the whole transaction back.
    pub async fn submit(&self, input: SubmitExpenseInput) -> Result<SubmittedExpense, ExpenseError> {
        let (expense, slots, warning) = self
            .db
            .transaction::<_, (expenses::Model, Vec<approvals::Model>, Option<String>), ExpenseError>(
                |txn| {
                    Box::pin(async move {
                        let submitter = users::Entity::find_by_id(input.submitter_id)
                            .filter(users::Column::CompanyId.eq(input.company_id))
                            .one(txn)
                            .await?
                            .ok_or(ExpenseError::SubmitterNotFound(input.submitter_id))?;

                        let roster = approvers::Entity::find()
                            .filter(approvers::Column::CompanyId.eq(input.company_id))
                            .filter(approvers::Column::IsActive.eq(true))
                            .order_by_asc(approvers::Column::Sequence)
                            .all(txn)
                            .await?;

                        let configured: Vec<ConfiguredApprover> = roster
                            .iter()
                            .map(|row| ConfiguredApprover {
                                user_id: row.user_id,
                                sequence: row.sequence,
                            })
                            .collect();

                        let chain = assemble(submitter.manager_id, &configured);

                        let mut status = ExpenseStatus::Pending;
                        let mut warning = None;
                        if chain.is_empty() {
                            match empty_chain_outcome(user_role_to_core(&submitter.role)) {
                                EmptyChainOutcome::SelfApproved => {
                                    status = ExpenseStatus::Approved;
                                }
                                EmptyChainOutcome::PendingUnrouted => {
                                    warning = Some(
                                        "no approvers configured for this company; \
                                         the expense cannot advance"
                                            .to_string(),
                                    );
                                }
                            }
                        }

                        let now = chrono::Utc::now().into();
                        let expense = expenses::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            user_id: Set(input.submitter_id),
                            company_id: Set(input.company_id),
                            amount: Set(input.amount),
                            original_amount: Set(input.original_amount),
                            original_currency: Set(input.original_currency.clone()),
                            category: Set(input.category.clone()),
                            description: Set(input.description.clone()),
                            date: Set(input.date),
                            status: Set(status),
                            receipt_url: Set(input.receipt_url.clone()),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?;

                        let mut slots = Vec::with_capacity(chain.len());
                        for (index, approver_id) in chain.iter().enumerate() {
                            let slot = approvals::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                expense_id: Set(expense.id),
                                approver_id: Set(*approver_id),
                                sequence: Set((index + 1) as i32),
                                status: Set(ApprovalStatus::Pending),
                                comments: Set(None),
                                approved_at: Set(None),
                                created_at: Set(now),
                            }
                            .insert(txn)
                            .await?;
                            slots.push(slot);
                        }

                        Ok((expense, slots, warning))
                    })
                },
            )
            .await
            .map_err(flatten_txn)?;

        let chain = self.name_slots(slots).await?;

        Ok(SubmittedExpense {
            expense,
            chain,
            warning,
        })
    }

    /// The submitter's own expenses, each with its ordered chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_my_expenses(
        &self,
        actor: &Actor,
        filter: &ExpenseFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<ExpenseWithChain>, u64), ExpenseError> {
        let query = apply_filter(
            expenses::Entity::find()
                .filter(expenses::Column::CompanyId.eq(actor.company_id))
                .filter(expenses::Column::UserId.eq(actor.user_id)),
            filter,
        );

        self.page_with_chains(query, offset, limit).await
    }

    /// Role-scoped company listing.
    ///
    /// Admins see the whole company; managers see their own expenses,
    /// their direct reports' expenses, and expenses where they hold a
    /// slot; employees see only their own.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_expenses(
        &self,
        actor: &Actor,
        filter: &ExpenseFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<ExpenseWithChain>, u64), ExpenseError> {
        let mut query =
            expenses::Entity::find().filter(expenses::Column::CompanyId.eq(actor.company_id));

        match actor.role {
            Role::Admin => {}
            Role::Employee => {
                query = query.filter(expenses::Column::UserId.eq(actor.user_id));
            }
            Role::Manager => {
                let report_ids: Vec<Uuid> = users::Entity::find()
                    .filter(users::Column::CompanyId.eq(actor.company_id))
                    .filter(users::Column::ManagerId.eq(actor.user_id))
                    .select_only()
                    .column(users::Column::Id)
                    .into_tuple()
                    .all(&self.db)
                    .await?;

                let slot_expense_ids: Vec<Uuid> = approvals::Entity::find()
                    .filter(approvals::Column::ApproverId.eq(actor.user_id))
                    .select_only()
                    .column(approvals::Column::ExpenseId)
                    .into_tuple()
                    .all(&self.db)
                    .await?;

                query = query.filter(
                    Condition::any()
                        .add(expenses::Column::UserId.eq(actor.user_id))
                        .add(expenses::Column::UserId.is_in(report_ids))
                        .add(expenses::Column::Id.is_in(slot_expense_ids)),
                );
            }
        }

        self.page_with_chains(apply_filter(query, filter), offset, limit)
            .await
    }

    /// Full expense detail, subject to role-based visibility.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` outside the caller's company and
    /// `AccessDenied` when the role does not grant visibility.
    pub async fn get_expense(
        &self,
        actor: &Actor,
        expense_id: Uuid,
    ) -> Result<ExpenseDetail, ExpenseError> {
        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::CompanyId.eq(actor.company_id))
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::NotFound(expense_id))?;

        let submitter = users::Entity::find_by_id(expense.user_id)
            .one(&self.db)
            .await?;

        let visible = match actor.role {
            Role::Admin => true,
            Role::Employee => expense.user_id == actor.user_id,
            Role::Manager => {
                if expense.user_id == actor.user_id {
                    true
                } else if submitter
                    .as_ref()
                    .is_some_and(|s| s.manager_id == Some(actor.user_id))
                {
                    true
                } else {
                    approvals::Entity::find()
                        .filter(approvals::Column::ExpenseId.eq(expense_id))
                        .filter(approvals::Column::ApproverId.eq(actor.user_id))
                        .count(&self.db)
                        .await?
                        > 0
                }
            }
        };

        if !visible {
            return Err(ExpenseError::AccessDenied);
        }

        let slots = approvals::Entity::find()
            .filter(approvals::Column::ExpenseId.eq(expense_id))
            .order_by_asc(approvals::Column::Sequence)
            .all(&self.db)
            .await?;

        Ok(ExpenseDetail {
            expense,
            submitter_name: submitter.map(|s| s.name).unwrap_or_default(),
            chain: self.name_slots(slots).await?,
        })
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    async fn page_with_chains(
        &self,
        query: Select<expenses::Entity>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<ExpenseWithChain>, u64), ExpenseError> {
        let total = query.clone().count(&self.db).await?;

        let rows = query
            .order_by_desc(expenses::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|e| e.id).collect();
        let mut chains = self.chains_for(&ids).await?;

        let items = rows
            .into_iter()
            .map(|expense| {
                let chain = chains.remove(&expense.id).unwrap_or_default();
                ExpenseWithChain { expense, chain }
            })
            .collect();

        Ok((items, total))
    }

    /// Loads the named chains for a set of expenses in one query.
    async fn chains_for(
        &self,
        expense_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<SlotDetail>>, ExpenseError> {
        if expense_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = approvals::Entity::find()
            .filter(approvals::Column::ExpenseId.is_in(expense_ids.iter().copied()))
            .find_also_related(users::Entity)
            .order_by_asc(approvals::Column::ExpenseId)
            .order_by_asc(approvals::Column::Sequence)
            .all(&self.db)
            .await?;

        let mut chains: HashMap<Uuid, Vec<SlotDetail>> = HashMap::new();
        for (slot, approver) in rows {
            chains.entry(slot.expense_id).or_default().push(SlotDetail {
                approver_name: approver.map(|u| u.name).unwrap_or_default(),
                slot,
            });
        }

        Ok(chains)
    }

    async fn name_slots(
        &self,
        slots: Vec<approvals::Model>,
    ) -> Result<Vec<SlotDetail>, ExpenseError> {
        let approver_ids: Vec<Uuid> = slots.iter().map(|s| s.approver_id).collect();
        let names: HashMap<Uuid, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(approver_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let mut details: Vec<SlotDetail> = slots
            .into_iter()
            .map(|slot| SlotDetail {
                approver_name: names.get(&slot.approver_id).cloned().unwrap_or_default(),
                slot,
            })
            .collect();
        details.sort_by_key(|d| d.slot.sequence);

        Ok(details)
    }
}

fn apply_filter(
    mut query: Select<expenses::Entity>,
    filter: &ExpenseFilter,
) -> Select<expenses::Entity> {
    if let Some(status) = &filter.status {
        query = query.filter(expenses::Column::Status.eq(status.clone()));
    }
    if let Some(category) = &filter.category {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(expenses::Column::Category)))
                .like(format!("%{}%", category.to_lowercase())),
        );
    }
    if let Some(from) = filter.date_from {
        query = query.filter(expenses::Column::Date.gte(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(expenses::Column::Date.lte(to));
    }
    query
}
