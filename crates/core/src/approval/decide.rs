//! Per-expense decision engine.
//!
//! `decide` is pure: it takes a chain snapshot read under the expense
//! lock, validates the actor and ordering, and returns the full set of
//! state changes to persist. The caller owns the transaction.

use uuid::Uuid;

use crate::approval::error::ApprovalError;
use crate::approval::types::{
    CASCADE_COMMENT, ChainSnapshot, ExpenseStatus, SlotStatus, SlotView, Verdict,
};
use crate::rules::{Outcome, RuleConfig, evaluate};

/// One slot decision request.
#[derive(Debug, Clone)]
pub struct DecideInput {
    /// The slot being decided.
    pub slot_id: Uuid,
    /// The user acting on the slot.
    pub actor_id: Uuid,
    /// Approve or reject.
    pub verdict: Verdict,
    /// Approver comment; required for rejections.
    pub comment: Option<String>,
}

/// A single slot status update to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    /// The slot to update.
    pub slot_id: Uuid,
    /// Its new status.
    pub status: SlotStatus,
    /// Comment to store alongside the status.
    pub comment: Option<String>,
}

/// Everything a decision changes, plus what the caller reports back.
#[derive(Debug, Clone)]
pub struct Decision {
    /// The decided slot's update.
    pub slot: SlotChange,
    /// Cascade updates for remaining pending slots (rejections only).
    pub cascade: Vec<SlotChange>,
    /// The expense rollup after this decision.
    pub expense_status: ExpenseStatus,
    /// Lowest still-pending sequence after the decision, if any.
    pub next_pending_sequence: Option<i32>,
    /// True once the expense reached a terminal status.
    pub terminal: bool,
}

/// Validates and computes a slot decision against a chain snapshot.
///
/// Preconditions are checked in order: slot membership, actor identity,
/// slot not yet decided, expense not terminated, sequential gating for
/// approvals, comment presence for rejections. Any violation returns the
/// matching error and implies no writes.
///
/// # Errors
///
/// See [`ApprovalError`] for the violation taxonomy.
pub fn decide(
    chain: &ChainSnapshot,
    rules: &[RuleConfig],
    input: &DecideInput,
) -> Result<Decision, ApprovalError> {
    let slot = chain
        .slots
        .iter()
        .find(|s| s.id == input.slot_id)
        .ok_or(ApprovalError::SlotNotFound(input.slot_id))?;

    if slot.approver_id != input.actor_id {
        return Err(ApprovalError::NotAssignedApprover {
            slot_id: slot.id,
            actor_id: input.actor_id,
        });
    }

    if slot.status != SlotStatus::Pending {
        return Err(ApprovalError::SlotAlreadyDecided(slot.id));
    }

    if chain.status.is_terminal() {
        return Err(ApprovalError::ExpenseTerminated {
            expense_id: chain.expense_id,
            status: chain.status,
        });
    }

    match input.verdict {
        Verdict::Approve => approve(chain, rules, slot, input.comment.clone()),
        Verdict::Reject => reject(chain, slot, input.comment.clone()),
    }
}

fn approve(
    chain: &ChainSnapshot,
    rules: &[RuleConfig],
    slot: &SlotView,
    comment: Option<String>,
) -> Result<Decision, ApprovalError> {
    // Every earlier slot must already be approved.
    if let Some(blocking) = chain
        .slots
        .iter()
        .filter(|s| s.sequence < slot.sequence && s.status != SlotStatus::Approved)
        .map(|s| s.sequence)
        .min()
    {
        return Err(ApprovalError::OutOfOrderApproval {
            blocking_sequence: blocking,
        });
    }

    // Apply the update to a working copy so the evaluator sees it.
    let updated: Vec<SlotView> = chain
        .slots
        .iter()
        .map(|s| {
            let mut s = s.clone();
            if s.id == slot.id {
                s.status = SlotStatus::Approved;
            }
            s
        })
        .collect();

    let all_approved = updated.iter().all(|s| s.status == SlotStatus::Approved);
    let rule_outcome = evaluate(&updated, rules);

    let expense_status = if all_approved || rule_outcome == Outcome::TerminateApproved {
        ExpenseStatus::Approved
    } else {
        ExpenseStatus::Pending
    };

    let next_pending_sequence = updated
        .iter()
        .filter(|s| s.status == SlotStatus::Pending)
        .map(|s| s.sequence)
        .min();

    Ok(Decision {
        slot: SlotChange {
            slot_id: slot.id,
            status: SlotStatus::Approved,
            comment,
        },
        cascade: Vec::new(),
        expense_status,
        next_pending_sequence,
        terminal: expense_status.is_terminal(),
    })
}

fn reject(
    chain: &ChainSnapshot,
    slot: &SlotView,
    comment: Option<String>,
) -> Result<Decision, ApprovalError> {
    let comment = match comment {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Err(ApprovalError::CommentRequired),
    };

    // Every other pending slot is rejected with the cascade comment.
    let cascade: Vec<SlotChange> = chain
        .slots
        .iter()
        .filter(|s| s.id != slot.id && s.status == SlotStatus::Pending)
        .map(|s| SlotChange {
            slot_id: s.id,
            status: SlotStatus::Rejected,
            comment: Some(CASCADE_COMMENT.to_string()),
        })
        .collect();

    Ok(Decision {
        slot: SlotChange {
            slot_id: slot.id,
            status: SlotStatus::Rejected,
            comment: Some(comment),
        },
        cascade,
        expense_status: ExpenseStatus::Rejected,
        next_pending_sequence: None,
        terminal: true,
    })
}
