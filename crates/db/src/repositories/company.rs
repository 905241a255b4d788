//! Company repository for bootstrap and lookups.

use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use uuid::Uuid;

use crate::entities::companies;

/// Company repository.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    db: DatabaseConnection,
}

impl CompanyRepository {
    /// Creates a new company repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a company by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<companies::Model>, DbErr> {
        companies::Entity::find_by_id(id).one(&self.db).await
    }

    /// Creates a company (admin bootstrap).
    ///
    /// The base currency is stored uppercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        name: &str,
        country: &str,
        currency: &str,
    ) -> Result<companies::Model, DbErr> {
        let now = chrono::Utc::now().into();
        let company = companies::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            country: Set(country.to_string()),
            currency: Set(currency.to_ascii_uppercase()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        company.insert(&self.db).await
    }
}
