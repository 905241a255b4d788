//! Approval repository: the decide path and approver-facing queries.
//!
//! Concurrent deciders on one expense serialize on a Postgres advisory
//! lock taken inside the transaction, so the sequential-gating check and
//! the rule evaluation always observe the just-committed chain state.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, Set, Statement, TransactionError,
    TransactionTrait,
};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use claimflow_core::approval::{
    ApprovalError, ChainSnapshot, DecideInput, SlotView, Verdict, decide,
};
use claimflow_core::rules::RuleConfig;

use crate::entities::{
    approval_rules, approvals, expenses, sea_orm_active_enums::ApprovalStatus, users,
};
use crate::repositories::{
    Actor, core_to_expense_status, core_to_slot_status, expense_status_to_core,
    slot_status_to_core,
};

/// Result of a slot decision, reported after commit.
#[derive(Debug, Clone)]
pub struct DecideResult {
    /// The expense after the decision.
    pub expense: expenses::Model,
    /// The decided slot after the update.
    pub slot: approvals::Model,
    /// Lowest still-pending sequence, if any.
    pub next_pending_sequence: Option<i32>,
    /// True once the expense reached a terminal status.
    pub terminal: bool,
}

/// A prior decision in the chain, shown to the next approver.
#[derive(Debug, Clone)]
pub struct PriorDecision {
    /// Display name of the earlier approver.
    pub approver_name: String,
    /// Their slot status.
    pub status: ApprovalStatus,
    /// Their comment, if any.
    pub comments: Option<String>,
}

/// One actionable pending slot for the caller.
#[derive(Debug, Clone)]
pub struct PendingSlotItem {
    /// The caller's slot.
    pub slot: approvals::Model,
    /// The owning expense.
    pub expense: expenses::Model,
    /// Display name of the submitter.
    pub submitter_name: String,
    /// Slot count on the expense.
    pub total_slots: u32,
    /// Slots already approved.
    pub approved_slots: u32,
    /// Decisions at lower sequences.
    pub prior: Vec<PriorDecision>,
}

/// Aggregate statistics over a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStats {
    /// Slot count.
    pub total: u32,
    /// Approved slots.
    pub approved: u32,
    /// Rejected slots.
    pub rejected: u32,
    /// Pending slots.
    pub pending: u32,
    /// `round(100 * approved / total)`, 0 for slot-less expenses.
    pub completion_percentage: u32,
}

impl ChainStats {
    /// Computes statistics from slot statuses.
    #[must_use]
    pub fn compute<'a>(statuses: impl Iterator<Item = &'a ApprovalStatus>) -> Self {
        let mut total = 0u32;
        let mut approved = 0u32;
        let mut rejected = 0u32;
        let mut pending = 0u32;

        for status in statuses {
            total += 1;
            match status {
                ApprovalStatus::Approved => approved += 1,
                ApprovalStatus::Rejected => rejected += 1,
                ApprovalStatus::Pending => pending += 1,
            }
        }

        let completion_percentage = if total == 0 {
            0
        } else {
            ((f64::from(approved) / f64::from(total)) * 100.0).round() as u32
        };

        Self {
            total,
            approved,
            rejected,
            pending,
            completion_percentage,
        }
    }
}

/// Approval repository.
#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    db: DatabaseConnection,
}

impl ApprovalRepository {
    /// Creates a new approval repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies one approver verdict to a slot.
    ///
    /// Runs in a single transaction holding the per-expense advisory
    /// lock; the pure decision engine validates the actor, ordering, and
    /// comment requirements against the locked snapshot, and every
    /// resulting slot and expense update is persisted before commit.
    ///
    /// # Errors
    ///
    /// Returns the precondition violations defined by
    /// [`ApprovalError`]; any error leaves the database untouched.
    pub async fn decide(
        &self,
        actor: &Actor,
        slot_id: Uuid,
        verdict: Verdict,
        comment: Option<String>,
    ) -> Result<DecideResult, ApprovalError> {
        let actor = *actor;
        self.db
            .transaction::<_, DecideResult, ApprovalError>(|txn| {
                Box::pin(async move {
                    let slot = approvals::Entity::find_by_id(slot_id)
                        .one(txn)
                        .await
                        .map_err(db_err)?
                        .ok_or(ApprovalError::SlotNotFound(slot_id))?;

                    lock_expense(txn, slot.expense_id).await?;

                    let expense = expenses::Entity::find_by_id(slot.expense_id)
                        .filter(expenses::Column::CompanyId.eq(actor.company_id))
                        .one(txn)
                        .await
                        .map_err(db_err)?
                        .ok_or(ApprovalError::SlotNotFound(slot_id))?;

                    let slots = approvals::Entity::find()
                        .filter(approvals::Column::ExpenseId.eq(expense.id))
                        .order_by_asc(approvals::Column::Sequence)
                        .all(txn)
                        .await
                        .map_err(db_err)?;

                    let rules = load_active_rules(txn, actor.company_id).await?;

                    let snapshot = ChainSnapshot {
                        expense_id: expense.id,
                        company_id: expense.company_id,
                        status: expense_status_to_core(&expense.status),
                        slots: slots
                            .iter()
                            .map(|s| SlotView {
                                id: s.id,
                                approver_id: s.approver_id,
                                sequence: s.sequence,
                                status: slot_status_to_core(&s.status),
                            })
                            .collect(),
                    };

                    let decision = decide(
                        &snapshot,
                        &rules,
                        &DecideInput {
                            slot_id,
                            actor_id: actor.user_id,
                            verdict,
                            comment,
                        },
                    )?;

                    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
                    let by_id: HashMap<Uuid, approvals::Model> =
                        slots.into_iter().map(|s| (s.id, s)).collect();

                    let mut updated_slot = None;
                    for change in std::iter::once(&decision.slot).chain(decision.cascade.iter()) {
                        let model = by_id
                            .get(&change.slot_id)
                            .cloned()
                            .ok_or(ApprovalError::SlotNotFound(change.slot_id))?;

                        let mut active: approvals::ActiveModel = model.into();
                        active.status = Set(core_to_slot_status(change.status));
                        active.comments = Set(change.comment.clone());
                        active.approved_at = Set(Some(now));

                        let saved = active.update(txn).await.map_err(db_err)?;
                        if saved.id == slot_id {
                            updated_slot = Some(saved);
                        }
                    }

                    let expense = if expense_status_to_core(&expense.status)
                        == decision.expense_status
                    {
                        expense
                    } else {
                        let mut active: expenses::ActiveModel = expense.into();
                        active.status = Set(core_to_expense_status(decision.expense_status));
                        active.updated_at = Set(now);
                        active.update(txn).await.map_err(db_err)?
                    };

                    Ok(DecideResult {
                        expense,
                        slot: updated_slot.ok_or(ApprovalError::SlotNotFound(slot_id))?,
                        next_pending_sequence: decision.next_pending_sequence,
                        terminal: decision.terminal,
                    })
                })
            })
            .await
            .map_err(flatten_txn)
    }

    /// Actionable pending slots for the caller: the slot is pending, the
    /// expense is pending, and every lower sequence is approved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_for_me(&self, actor: &Actor) -> Result<Vec<PendingSlotItem>, ApprovalError> {
        let candidates = approvals::Entity::find()
            .filter(approvals::Column::ApproverId.eq(actor.user_id))
            .filter(approvals::Column::Status.eq(ApprovalStatus::Pending))
            .find_also_related(expenses::Entity)
            .order_by_asc(approvals::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut items = Vec::new();
        for (slot, expense) in candidates {
            let Some(expense) = expense else { continue };
            if expense.company_id != actor.company_id {
                continue;
            }
            if expense.status != crate::entities::sea_orm_active_enums::ExpenseStatus::Pending {
                continue;
            }

            let chain = approvals::Entity::find()
                .filter(approvals::Column::ExpenseId.eq(expense.id))
                .find_also_related(users::Entity)
                .order_by_asc(approvals::Column::Sequence)
                .all(&self.db)
                .await
                .map_err(db_err)?;

            let blocked = chain.iter().any(|(s, _)| {
                s.sequence < slot.sequence && s.status != ApprovalStatus::Approved
            });
            if blocked {
                continue;
            }

            let total_slots = chain.len() as u32;
            let approved_slots = chain
                .iter()
                .filter(|(s, _)| s.status == ApprovalStatus::Approved)
                .count() as u32;

            let prior = chain
                .iter()
                .filter(|(s, _)| s.sequence < slot.sequence)
                .map(|(s, approver)| PriorDecision {
                    approver_name: approver.as_ref().map(|u| u.name.clone()).unwrap_or_default(),
                    status: s.status.clone(),
                    comments: s.comments.clone(),
                })
                .collect();

            let submitter_name = users::Entity::find_by_id(expense.user_id)
                .one(&self.db)
                .await
                .map_err(db_err)?
                .map(|u| u.name)
                .unwrap_or_default();

            items.push(PendingSlotItem {
                slot,
                expense,
                submitter_name,
                total_slots,
                approved_slots,
                prior,
            });
        }

        Ok(items)
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Serializes concurrent deciders on one expense for the duration of the
/// enclosing transaction.
async fn lock_expense(txn: &DatabaseTransaction, expense_id: Uuid) -> Result<(), ApprovalError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))",
        [expense_id.to_string().into()],
    ))
    .await
    .map_err(db_err)?;

    Ok(())
}

/// Loads and parses the company's active rules. Rows whose config does
/// not parse are skipped with a warning rather than failing the decide.
async fn load_active_rules(
    txn: &DatabaseTransaction,
    company_id: Uuid,
) -> Result<Vec<RuleConfig>, ApprovalError> {
    let rows = approval_rules::Entity::find()
        .filter(approval_rules::Column::CompanyId.eq(company_id))
        .filter(approval_rules::Column::IsActive.eq(true))
        .all(txn)
        .await
        .map_err(db_err)?;

    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<RuleConfig>(row.rule_config.clone()) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!(rule_id = %row.id, error = %e, "skipping unparseable rule config"),
        }
    }

    Ok(rules)
}

fn db_err(err: sea_orm::DbErr) -> ApprovalError {
    ApprovalError::Database(err.to_string())
}

fn flatten_txn(err: TransactionError<ApprovalError>) -> ApprovalError {
    match err {
        TransactionError::Connection(db) => ApprovalError::Database(db.to_string()),
        TransactionError::Transaction(inner) => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_stats_compute() {
        let statuses = [
            ApprovalStatus::Approved,
            ApprovalStatus::Approved,
            ApprovalStatus::Pending,
            ApprovalStatus::Rejected,
        ];
        let stats = ChainStats::compute(statuses.iter());

        assert_eq!(stats.total, 4);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completion_percentage, 50);
    }

    #[test]
    fn test_chain_stats_rounds() {
        let statuses = [
            ApprovalStatus::Approved,
            ApprovalStatus::Pending,
            ApprovalStatus::Pending,
        ];
        let stats = ChainStats::compute(statuses.iter());
        // 1/3 -> 33.33 -> 33
        assert_eq!(stats.completion_percentage, 33);
    }

    #[test]
    fn test_chain_stats_empty() {
        let stats = ChainStats::compute(std::iter::empty());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_percentage, 0);
    }
}
