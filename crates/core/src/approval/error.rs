//! Error types for approval-chain operations.

use claimflow_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::approval::types::ExpenseStatus;

/// Errors that can occur while building chains or deciding slots.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The slot does not exist or is outside the actor's company.
    #[error("Approval slot {0} not found")]
    SlotNotFound(Uuid),

    /// The expense does not exist or is outside the actor's company.
    #[error("Expense {0} not found")]
    ExpenseNotFound(Uuid),

    /// The actor is not the approver assigned to the slot.
    #[error("User {actor_id} is not the assigned approver for slot {slot_id}")]
    NotAssignedApprover {
        /// The slot being decided.
        slot_id: Uuid,
        /// The user who attempted the decision.
        actor_id: Uuid,
    },

    /// The slot already carries a terminal status.
    #[error("Approval slot {0} has already been decided")]
    SlotAlreadyDecided(Uuid),

    /// The expense reached a terminal status before this decision.
    #[error("Expense {expense_id} is already {status}")]
    ExpenseTerminated {
        /// The expense being decided.
        expense_id: Uuid,
        /// Its terminal status.
        status: ExpenseStatus,
    },

    /// An approve arrived while an earlier slot is still undecided.
    #[error("Cannot approve yet: sequence {blocking_sequence} must be approved first")]
    OutOfOrderApproval {
        /// Lowest sequence blocking this approval.
        blocking_sequence: i32,
    },

    /// A rejection was submitted without a comment.
    #[error("A comment is required when rejecting")]
    CommentRequired,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::SlotNotFound(_) | ApprovalError::ExpenseNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            ApprovalError::NotAssignedApprover { .. } => Self::Forbidden(err.to_string()),
            ApprovalError::SlotAlreadyDecided(_) | ApprovalError::ExpenseTerminated { .. } => {
                Self::Conflict(err.to_string())
            }
            ApprovalError::OutOfOrderApproval { blocking_sequence } => {
                Self::OutOfOrderApproval { blocking_sequence }
            }
            ApprovalError::CommentRequired => Self::CommentRequired,
            ApprovalError::Database(msg) => Self::Database(msg),
        }
    }
}
