//! Domain types for the expense approval lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Comment written onto slots rejected by cascade after an explicit rejection.
pub const CASCADE_COMMENT: &str = "Rejected due to prior rejection in approval chain";

/// User role within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits expenses.
    Employee,
    /// Approves expenses and manages direct reports.
    Manager,
    /// Full access including company configuration.
    Admin,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Returns true if users with this role may be configured as approvers.
    #[must_use]
    pub const fn can_approve(&self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expense status rollup.
///
/// Transitions are monotonic: `Pending` may move to `Approved` or
/// `Rejected`; both are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Waiting on the approval chain.
    Pending,
    /// Terminal: chain completed or a rule short-circuited.
    Approved,
    /// Terminal: an approver rejected.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once the expense can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single approval slot. Once a slot leaves `Pending` it is
/// immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// Awaiting the assigned approver.
    Pending,
    /// Approved by the assigned approver.
    Approved,
    /// Rejected explicitly or by cascade.
    Rejected,
}

impl SlotStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The verdict an approver hands down on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Approve the slot.
    Approve,
    /// Reject the slot (terminates the expense).
    Reject,
}

/// Snapshot of one slot, as read inside the decider transaction.
#[derive(Debug, Clone)]
pub struct SlotView {
    /// Slot identifier.
    pub id: Uuid,
    /// Assigned approver.
    pub approver_id: Uuid,
    /// Position in the chain, 1-based and dense per expense.
    pub sequence: i32,
    /// Current status.
    pub status: SlotStatus,
}

/// Snapshot of an expense's chain, read under the expense lock.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    /// Owning expense.
    pub expense_id: Uuid,
    /// Company the expense belongs to.
    pub company_id: Uuid,
    /// Current expense rollup status.
    pub status: ExpenseStatus,
    /// All slots, ordered by sequence ascending.
    pub slots: Vec<SlotView>,
}

impl ChainSnapshot {
    /// Lowest-sequence slot still pending, if any.
    #[must_use]
    pub fn next_pending(&self) -> Option<&SlotView> {
        self.slots
            .iter()
            .filter(|s| s.status == SlotStatus::Pending)
            .min_by_key(|s| s.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("employee"), Some(Role::Employee));
        assert_eq!(Role::parse("MANAGER"), Some(Role::Manager));
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_role_can_approve() {
        assert!(!Role::Employee.can_approve());
        assert!(Role::Manager.can_approve());
        assert!(Role::Admin.can_approve());
    }

    #[test]
    fn test_expense_status_terminal() {
        assert!(!ExpenseStatus::Pending.is_terminal());
        assert!(ExpenseStatus::Approved.is_terminal());
        assert!(ExpenseStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "approved", "rejected"] {
            assert_eq!(ExpenseStatus::parse(s).unwrap().as_str(), s);
            assert_eq!(SlotStatus::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(ExpenseStatus::parse("draft"), None);
        assert_eq!(SlotStatus::parse("voided"), None);
    }

    #[test]
    fn test_next_pending_lowest_sequence() {
        let chain = ChainSnapshot {
            expense_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            status: ExpenseStatus::Pending,
            slots: vec![
                SlotView {
                    id: Uuid::new_v4(),
                    approver_id: Uuid::new_v4(),
                    sequence: 1,
                    status: SlotStatus::Approved,
                },
                SlotView {
                    id: Uuid::new_v4(),
                    approver_id: Uuid::new_v4(),
                    sequence: 2,
                    status: SlotStatus::Pending,
                },
                SlotView {
                    id: Uuid::new_v4(),
                    approver_id: Uuid::new_v4(),
                    sequence: 3,
                    status: SlotStatus::Pending,
                },
            ],
        };
        assert_eq!(chain.next_pending().unwrap().sequence, 2);
    }
}
