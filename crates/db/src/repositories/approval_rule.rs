//! Approval rule administration.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use claimflow_core::rules::{RuleConfig, RuleError};
use claimflow_shared::AppError;

use crate::entities::{approval_rules, sea_orm_active_enums::RuleType};

/// Errors for rule administration.
#[derive(Debug, Error)]
pub enum RuleConfigError {
    /// The configuration failed validation.
    #[error("Invalid rule configuration: {0}")]
    Invalid(#[from] RuleError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<RuleConfigError> for AppError {
    fn from(err: RuleConfigError) -> Self {
        match err {
            RuleConfigError::Invalid(_) => Self::Validation(err.to_string()),
            RuleConfigError::Database(msg) => Self::Database(msg),
        }
    }
}

fn flatten_txn(err: TransactionError<RuleConfigError>) -> RuleConfigError {
    match err {
        TransactionError::Connection(db) => RuleConfigError::Database(db.to_string()),
        TransactionError::Transaction(inner) => inner,
    }
}

/// Approval rule repository.
#[derive(Debug, Clone)]
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new approval rule repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Activates a rule, deactivating any active rule of the same type
    /// in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RuleConfigError::Invalid` when the configuration fails
    /// validation.
    pub async fn set_rule(
        &self,
        company_id: Uuid,
        config: RuleConfig,
    ) -> Result<approval_rules::Model, RuleConfigError> {
        config.validate()?;

        let rule_type = db_rule_type(&config);
        let rule_config = serde_json::to_value(&config)
            .map_err(|e| RuleConfigError::Database(e.to_string()))?;

        self.db
            .transaction::<_, approval_rules::Model, RuleConfigError>(|txn| {
                Box::pin(async move {
                    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

                    let existing = approval_rules::Entity::find()
                        .filter(approval_rules::Column::CompanyId.eq(company_id))
                        .filter(approval_rules::Column::RuleType.eq(rule_type.clone()))
                        .filter(approval_rules::Column::IsActive.eq(true))
                        .all(txn)
                        .await
                        .map_err(|e| RuleConfigError::Database(e.to_string()))?;

                    for row in existing {
                        let mut active: approval_rules::ActiveModel = row.into();
                        active.is_active = Set(false);
                        active.updated_at = Set(now);
                        active
                            .update(txn)
                            .await
                            .map_err(|e| RuleConfigError::Database(e.to_string()))?;
                    }

                    let rule = approval_rules::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        company_id: Set(company_id),
                        rule_type: Set(rule_type),
                        rule_config: Set(rule_config),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };

                    rule.insert(txn)
                        .await
                        .map_err(|e| RuleConfigError::Database(e.to_string()))
                })
            })
            .await
            .map_err(flatten_txn)
    }

    /// Lists every rule row, active and inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, company_id: Uuid) -> Result<Vec<approval_rules::Model>, RuleConfigError> {
        approval_rules::Entity::find()
            .filter(approval_rules::Column::CompanyId.eq(company_id))
            .order_by_desc(approval_rules::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RuleConfigError::Database(e.to_string()))
    }
}

fn db_rule_type(config: &RuleConfig) -> RuleType {
    match config {
        RuleConfig::Percentage { .. } => RuleType::Percentage,
        RuleConfig::SpecificApprover { .. } => RuleType::SpecificApprover,
        RuleConfig::Hybrid { .. } => RuleType::Hybrid,
    }
}
