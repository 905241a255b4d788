//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. Every multi-row write that derives expense or chain
//! state runs inside a transaction scope.

pub mod approval;
pub mod approval_rule;
pub mod approver;
pub mod company;
pub mod expense;
pub mod user;

pub use approval::ApprovalRepository;
pub use approval_rule::ApprovalRuleRepository;
pub use approver::ApproverRepository;
pub use company::CompanyRepository;
pub use expense::ExpenseRepository;
pub use user::UserRepository;

use claimflow_core::approval::{ExpenseStatus, Role, SlotStatus};
use uuid::Uuid;

use crate::entities::sea_orm_active_enums;

/// The authenticated principal acting on a repository call.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    /// Acting user.
    pub user_id: Uuid,
    /// The company the principal acts within.
    pub company_id: Uuid,
    /// The principal's role.
    pub role: Role,
}

// ============================================================================
// Conversion helpers between database enums and core domain enums
// ============================================================================

/// Converts a database expense status to the core status.
#[must_use]
pub fn expense_status_to_core(status: &sea_orm_active_enums::ExpenseStatus) -> ExpenseStatus {
    match status {
        sea_orm_active_enums::ExpenseStatus::Pending => ExpenseStatus::Pending,
        sea_orm_active_enums::ExpenseStatus::Approved => ExpenseStatus::Approved,
        sea_orm_active_enums::ExpenseStatus::Rejected => ExpenseStatus::Rejected,
    }
}

/// Converts a core expense status to the database enum.
#[must_use]
pub fn core_to_expense_status(status: ExpenseStatus) -> sea_orm_active_enums::ExpenseStatus {
    match status {
        ExpenseStatus::Pending => sea_orm_active_enums::ExpenseStatus::Pending,
        ExpenseStatus::Approved => sea_orm_active_enums::ExpenseStatus::Approved,
        ExpenseStatus::Rejected => sea_orm_active_enums::ExpenseStatus::Rejected,
    }
}

/// Converts a database slot status to the core status.
#[must_use]
pub fn slot_status_to_core(status: &sea_orm_active_enums::ApprovalStatus) -> SlotStatus {
    match status {
        sea_orm_active_enums::ApprovalStatus::Pending => SlotStatus::Pending,
        sea_orm_active_enums::ApprovalStatus::Approved => SlotStatus::Approved,
        sea_orm_active_enums::ApprovalStatus::Rejected => SlotStatus::Rejected,
    }
}

/// Converts a core slot status to the database enum.
#[must_use]
pub fn core_to_slot_status(status: SlotStatus) -> sea_orm_active_enums::ApprovalStatus {
    match status {
        SlotStatus::Pending => sea_orm_active_enums::ApprovalStatus::Pending,
        SlotStatus::Approved => sea_orm_active_enums::ApprovalStatus::Approved,
        SlotStatus::Rejected => sea_orm_active_enums::ApprovalStatus::Rejected,
    }
}

/// Converts a database user role to the core role.
#[must_use]
pub fn user_role_to_core(role: &sea_orm_active_enums::UserRole) -> Role {
    match role {
        sea_orm_active_enums::UserRole::Employee => Role::Employee,
        sea_orm_active_enums::UserRole::Manager => Role::Manager,
        sea_orm_active_enums::UserRole::Admin => Role::Admin,
    }
}

/// Converts a core role to the database enum.
#[must_use]
pub fn core_to_user_role(role: Role) -> sea_orm_active_enums::UserRole {
    match role {
        Role::Employee => sea_orm_active_enums::UserRole::Employee,
        Role::Manager => sea_orm_active_enums::UserRole::Manager,
        Role::Admin => sea_orm_active_enums::UserRole::Admin,
    }
}
