//! Approver roster administration.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use claimflow_shared::AppError;

use crate::entities::{
    approvals, approvers, expenses,
    sea_orm_active_enums::{ApprovalStatus, ExpenseStatus, UserRole},
    users,
};

/// Errors for roster administration.
#[derive(Debug, Error)]
pub enum ApproverConfigError {
    /// The user is not in the company.
    #[error("User {0} not found in this company")]
    UserNotFound(Uuid),

    /// Only active managers and admins can be configured as approvers.
    #[error("User {0} cannot approve: {1}")]
    UserNotEligible(Uuid, String),

    /// An active row for this (user, role_name) already exists.
    #[error("User is already an active approver under this role name")]
    DuplicateApprover,

    /// Another active row already occupies the sequence.
    #[error("Sequence {0} is already occupied by an active approver")]
    SequenceTaken(i32),

    /// Sequences are positive integers.
    #[error("Sequence must be a positive integer, got {0}")]
    InvalidSequence(i32),

    /// The roster row is not present.
    #[error("Approver {0} not found")]
    NotFound(Uuid),

    /// The approver still holds pending slots.
    #[error("Approver holds {0} pending approval slot(s)")]
    PendingWorkBlocksRemoval(u64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<ApproverConfigError> for AppError {
    fn from(err: ApproverConfigError) -> Self {
        match err {
            ApproverConfigError::UserNotFound(_) | ApproverConfigError::NotFound(_) => {
                Self::NotFound(err.to_string())
            }
            ApproverConfigError::UserNotEligible(..) | ApproverConfigError::InvalidSequence(_) => {
                Self::Validation(err.to_string())
            }
            ApproverConfigError::DuplicateApprover | ApproverConfigError::SequenceTaken(_) => {
                Self::Conflict(err.to_string())
            }
            ApproverConfigError::PendingWorkBlocksRemoval(_) => {
                Self::PendingWorkBlocksRemoval(err.to_string())
            }
            ApproverConfigError::Database(msg) => Self::Database(msg),
        }
    }
}

impl From<sea_orm::DbErr> for ApproverConfigError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

fn flatten_txn(err: TransactionError<ApproverConfigError>) -> ApproverConfigError {
    match err {
        TransactionError::Connection(db) => ApproverConfigError::Database(db.to_string()),
        TransactionError::Transaction(inner) => inner,
    }
}

/// A roster row with the approver's display name.
#[derive(Debug, Clone)]
pub struct ApproverDetail {
    /// The roster row.
    pub approver: approvers::Model,
    /// Display name of the user.
    pub user_name: String,
}

/// Approver roster repository.
#[derive(Debug, Clone)]
pub struct ApproverRepository {
    db: DatabaseConnection,
}

impl ApproverRepository {
    /// Creates a new approver repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds a user to the company's approver roster.
    ///
    /// # Errors
    ///
    /// Rejects users outside the company, inactive users, employees,
    /// duplicate active (user, role_name) pairs, and occupied sequences.
    pub async fn add(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        role_name: &str,
        sequence: i32,
    ) -> Result<approvers::Model, ApproverConfigError> {
        if sequence < 1 {
            return Err(ApproverConfigError::InvalidSequence(sequence));
        }

        let user = users::Entity::find_by_id(user_id)
            .filter(users::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(ApproverConfigError::UserNotFound(user_id))?;

        if !user.is_active {
            return Err(ApproverConfigError::UserNotEligible(
                user_id,
                "user is inactive".to_string(),
            ));
        }
        if user.role == UserRole::Employee {
            return Err(ApproverConfigError::UserNotEligible(
                user_id,
                "approvers must have the manager or admin role".to_string(),
            ));
        }

        let duplicate = approvers::Entity::find()
            .filter(approvers::Column::CompanyId.eq(company_id))
            .filter(approvers::Column::UserId.eq(user_id))
            .filter(approvers::Column::RoleName.eq(role_name))
            .filter(approvers::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        if duplicate > 0 {
            return Err(ApproverConfigError::DuplicateApprover);
        }

        let occupied = approvers::Entity::find()
            .filter(approvers::Column::CompanyId.eq(company_id))
            .filter(approvers::Column::Sequence.eq(sequence))
            .filter(approvers::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        if occupied > 0 {
            return Err(ApproverConfigError::SequenceTaken(sequence));
        }

        let now = chrono::Utc::now().into();
        let row = approvers::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            user_id: Set(user_id),
            role_name: Set(role_name.to_string()),
            sequence: Set(sequence),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(row.insert(&self.db).await?)
    }

    /// Moves an approver to a new sequence, swapping atomically with any
    /// active occupant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or inactive rows and
    /// `InvalidSequence` for non-positive targets.
    pub async fn update_sequence(
        &self,
        company_id: Uuid,
        approver_id: Uuid,
        new_sequence: i32,
    ) -> Result<approvers::Model, ApproverConfigError> {
        if new_sequence < 1 {
            return Err(ApproverConfigError::InvalidSequence(new_sequence));
        }

        self.db
            .transaction::<_, approvers::Model, ApproverConfigError>(|txn| {
                Box::pin(async move {
                    let row = approvers::Entity::find_by_id(approver_id)
                        .filter(approvers::Column::CompanyId.eq(company_id))
                        .filter(approvers::Column::IsActive.eq(true))
                        .one(txn)
                        .await?
                        .ok_or(ApproverConfigError::NotFound(approver_id))?;

                    let old_sequence = row.sequence;
                    if old_sequence == new_sequence {
                        return Ok(row);
                    }

                    let occupant = approvers::Entity::find()
                        .filter(approvers::Column::CompanyId.eq(company_id))
                        .filter(approvers::Column::Sequence.eq(new_sequence))
                        .filter(approvers::Column::IsActive.eq(true))
                        .one(txn)
                        .await?;

                    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

                    // Park the moving row on a sentinel first so the
                    // partial unique index never sees two rows on one
                    // sequence mid-swap.
                    let mut moving: approvers::ActiveModel = row.into();
                    moving.sequence = Set(-new_sequence);
                    moving.updated_at = Set(now);
                    let parked = moving.update(txn).await?;

                    if let Some(occupant) = occupant {
                        let mut displaced: approvers::ActiveModel = occupant.into();
                        displaced.sequence = Set(old_sequence);
                        displaced.updated_at = Set(now);
                        displaced.update(txn).await?;
                    }

                    let mut landing: approvers::ActiveModel = parked.into();
                    landing.sequence = Set(new_sequence);
                    landing.updated_at = Set(now);
                    Ok(landing.update(txn).await?)
                })
            })
            .await
            .map_err(flatten_txn)
    }

    /// Soft-deletes a roster row.
    ///
    /// Refused while the approver still holds pending slots on pending
    /// expenses.
    ///
    /// # Errors
    ///
    /// Returns `PendingWorkBlocksRemoval` with the blocking slot count.
    pub async fn remove(
        &self,
        company_id: Uuid,
        approver_id: Uuid,
    ) -> Result<approvers::Model, ApproverConfigError> {
        let row = approvers::Entity::find_by_id(approver_id)
            .filter(approvers::Column::CompanyId.eq(company_id))
            .filter(approvers::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or(ApproverConfigError::NotFound(approver_id))?;

        let pending = approvals::Entity::find()
            .filter(approvals::Column::ApproverId.eq(row.user_id))
            .filter(approvals::Column::Status.eq(ApprovalStatus::Pending))
            .inner_join(expenses::Entity)
            .filter(expenses::Column::Status.eq(ExpenseStatus::Pending))
            .count(&self.db)
            .await?;
        if pending > 0 {
            return Err(ApproverConfigError::PendingWorkBlocksRemoval(pending));
        }

        let mut active: approvers::ActiveModel = row.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Lists every roster row, active and inactive, with user names.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<ApproverDetail>, ApproverConfigError> {
        let rows = approvers::Entity::find()
            .filter(approvers::Column::CompanyId.eq(company_id))
            .find_also_related(users::Entity)
            .order_by_asc(approvers::Column::Sequence)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(approver, user)| ApproverDetail {
                user_name: user.map(|u| u.name).unwrap_or_default(),
                approver,
            })
            .collect())
    }
}
