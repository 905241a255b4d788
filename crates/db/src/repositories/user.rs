//! User repository: lookups, creation, and manager assignment.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
};
use thiserror::Error;
use uuid::Uuid;

use claimflow_core::approval::Role;
use claimflow_core::hierarchy::creates_cycle;
use claimflow_shared::AppError;

use crate::entities::users;
use crate::repositories::core_to_user_role;

/// Errors for user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// User not present.
    #[error("User {0} not found")]
    NotFound(Uuid),

    /// Email already registered.
    #[error("Email already in use: {0}")]
    EmailTaken(String),

    /// Manager must live in the same company.
    #[error("Manager must belong to the same company")]
    CrossCompanyManager,

    /// Assignment would make a user their own transitive manager.
    #[error("Manager assignment would create a reporting cycle")]
    ManagerCycle,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => Self::NotFound(err.to_string()),
            UserError::EmailTaken(_) => Self::Conflict(err.to_string()),
            UserError::CrossCompanyManager | UserError::ManagerCycle => {
                Self::Validation(err.to_string())
            }
            UserError::Database(msg) => Self::Database(msg),
        }
    }
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// User repository.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, UserError> {
        Ok(users::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Finds a user by email (compared lowercase, stored as given).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, UserError> {
        use sea_orm::sea_query::Func;
        use sea_orm::sea_query::Expr;

        Ok(users::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(users::Column::Email)))
                    .eq(email.to_lowercase()),
            )
            .one(&self.db)
            .await?)
    }

    /// Creates a user (bootstrap/seeding path).
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmailTaken` if the email is already registered.
    pub async fn create(
        &self,
        company_id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        manager_id: Option<Uuid>,
    ) -> Result<users::Model, UserError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(UserError::EmailTaken(email.to_string()));
        }

        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(core_to_user_role(role)),
            manager_id: Set(manager_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(user.insert(&self.db).await?)
    }

    /// Assigns (or clears) a user's direct manager.
    ///
    /// Both users must belong to `company_id`, and the assignment is
    /// rejected when walking the manager links upward from the candidate
    /// would reach the user again.
    ///
    /// # Errors
    ///
    /// Returns `CrossCompanyManager` or `ManagerCycle` on invalid
    /// assignments.
    pub async fn set_manager(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> Result<users::Model, UserError> {
        let user = users::Entity::find_by_id(user_id)
            .filter(users::Column::CompanyId.eq(company_id))
            .one(&self.db)
            .await?
            .ok_or(UserError::NotFound(user_id))?;

        if let Some(candidate) = manager_id {
            let manager = self
                .find_by_id(candidate)
                .await?
                .ok_or(UserError::NotFound(candidate))?;

            if manager.company_id != user.company_id {
                return Err(UserError::CrossCompanyManager);
            }

            // Bounded upward walk over the whole company roster.
            let links: Vec<(Uuid, Option<Uuid>)> = users::Entity::find()
                .filter(users::Column::CompanyId.eq(user.company_id))
                .select_only()
                .columns([users::Column::Id, users::Column::ManagerId])
                .into_tuple()
                .all(&self.db)
                .await?;

            let table: std::collections::HashMap<Uuid, Uuid> = links
                .iter()
                .filter_map(|(id, mgr)| mgr.map(|m| (*id, m)))
                .collect();

            if creates_cycle(user_id, candidate, |id| table.get(&id).copied(), links.len() + 1) {
                return Err(UserError::ManagerCycle);
            }
        }

        let mut active: users::ActiveModel = user.into();
        active.manager_id = Set(manager_id);
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }
}
