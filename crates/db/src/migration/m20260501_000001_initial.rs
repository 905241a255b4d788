//! Initial database migration.
//!
//! Creates all enums, tables, and indexes for the expense approval
//! engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(APPROVERS_SQL).await?;
        db.execute_unprepared(APPROVALS_SQL).await?;
        db.execute_unprepared(APPROVAL_RULES_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('employee', 'manager', 'admin');
CREATE TYPE expense_status AS ENUM ('pending', 'approved', 'rejected');
CREATE TYPE approval_status AS ENUM ('pending', 'approved', 'rejected');
CREATE TYPE rule_type AS ENUM ('percentage', 'specific_approver', 'hybrid');
";

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    country VARCHAR(100) NOT NULL,
    currency CHAR(3) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    role user_role NOT NULL DEFAULT 'employee',
    manager_id UUID REFERENCES users(id),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id),
    company_id UUID NOT NULL REFERENCES companies(id),
    amount NUMERIC(14, 2) NOT NULL CHECK (amount > 0),
    original_amount NUMERIC(14, 2) NOT NULL CHECK (original_amount > 0),
    original_currency CHAR(3) NOT NULL,
    category VARCHAR(255) NOT NULL,
    description TEXT,
    date DATE NOT NULL,
    status expense_status NOT NULL DEFAULT 'pending',
    receipt_url TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const APPROVERS_SQL: &str = r"
CREATE TABLE approvers (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    role_name VARCHAR(255) NOT NULL,
    sequence INTEGER NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Sequence and (user, role_name) collisions only matter among active rows.
CREATE UNIQUE INDEX uq_approvers_company_sequence_active
    ON approvers(company_id, sequence) WHERE is_active;
CREATE UNIQUE INDEX uq_approvers_company_user_role_active
    ON approvers(company_id, user_id, role_name) WHERE is_active;
";

const APPROVALS_SQL: &str = r"
CREATE TABLE approvals (
    id UUID PRIMARY KEY,
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id),
    sequence INTEGER NOT NULL CHECK (sequence > 0),
    status approval_status NOT NULL DEFAULT 'pending',
    comments TEXT,
    approved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (expense_id, sequence)
);
";

const APPROVAL_RULES_SQL: &str = r"
CREATE TABLE approval_rules (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    rule_type rule_type NOT NULL,
    rule_config JSONB NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- At most one active rule per (company, rule_type).
CREATE UNIQUE INDEX uq_approval_rules_company_type_active
    ON approval_rules(company_id, rule_type) WHERE is_active;
";

const INDEXES_SQL: &str = r"
CREATE INDEX idx_users_company ON users(company_id);
CREATE INDEX idx_users_email ON users(email);
CREATE INDEX idx_users_manager ON users(manager_id);
CREATE INDEX idx_expenses_user ON expenses(user_id);
CREATE INDEX idx_expenses_company ON expenses(company_id);
CREATE INDEX idx_expenses_status ON expenses(status);
CREATE INDEX idx_expenses_date ON expenses(date);
CREATE INDEX idx_approvers_company ON approvers(company_id);
CREATE INDEX idx_approvers_user ON approvers(user_id);
CREATE INDEX idx_approvals_expense ON approvals(expense_id);
CREATE INDEX idx_approvals_approver ON approvals(approver_id);
CREATE INDEX idx_approval_rules_company ON approval_rules(company_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS approval_rules CASCADE;
DROP TABLE IF EXISTS approvals CASCADE;
DROP TABLE IF EXISTS approvers CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS companies CASCADE;
DROP TYPE IF EXISTS rule_type;
DROP TYPE IF EXISTS approval_status;
DROP TYPE IF EXISTS expense_status;
DROP TYPE IF EXISTS user_role;
";
