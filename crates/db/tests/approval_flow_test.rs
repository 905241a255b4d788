//! Integration tests for the submission and decide paths.
//!
//! These run against a real Postgres instance and are skipped unless
//! `DATABASE_URL` is set.

use rust_decimal_macros::dec;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::env;
use uuid::Uuid;

use claimflow_core::approval::{ApprovalError, Role, Verdict};
use claimflow_core::rules::RuleConfig;
use claimflow_db::entities::sea_orm_active_enums::{ApprovalStatus, ExpenseStatus};
use claimflow_db::migration::Migrator;
use claimflow_db::repositories::expense::{SubmitExpenseInput, SubmittedExpense};
use claimflow_db::repositories::{
    Actor, ApprovalRepository, ApprovalRuleRepository, ApproverRepository, CompanyRepository,
    ExpenseRepository, UserRepository,
};

async fn connect_or_skip() -> Option<DatabaseConnection> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    Some(db)
}

struct Org {
    company_id: Uuid,
    admin: Uuid,
    manager: Uuid,
    employee: Uuid,
}

fn email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4())
}

async fn seed_org(db: &DatabaseConnection) -> Org {
    let companies = CompanyRepository::new(db.clone());
    let users = UserRepository::new(db.clone());

    let company = companies
        .create("Acme Corp", "US", "usd")
        .await
        .expect("company");
    assert_eq!(company.currency, "USD");

    let admin = users
        .create(company.id, "Admin", &email("admin"), "x", Role::Admin, None)
        .await
        .expect("admin");
    let manager = users
        .create(
            company.id,
            "Manager",
            &email("manager"),
            "x",
            Role::Manager,
            None,
        )
        .await
        .expect("manager");
    let employee = users
        .create(
            company.id,
            "Employee",
            &email("employee"),
            "x",
            Role::Employee,
            Some(manager.id),
        )
        .await
        .expect("employee");

    Org {
        company_id: company.id,
        admin: admin.id,
        manager: manager.id,
        employee: employee.id,
    }
}

fn actor(org: &Org, user_id: Uuid, role: Role) -> Actor {
    Actor {
        user_id,
        company_id: org.company_id,
        role,
    }
}

fn submission(org: &Org) -> SubmitExpenseInput {
    SubmitExpenseInput {
        submitter_id: org.employee,
        company_id: org.company_id,
        amount: dec!(100.00),
        original_amount: dec!(100.00),
        original_currency: "USD".to_string(),
        category: "Travel".to_string(),
        description: None,
        date: chrono::NaiveDate::from_ymd_opt(2025, 10, 4).unwrap(),
        receipt_url: None,
    }
}

async fn submit(db: &DatabaseConnection, org: &Org) -> SubmittedExpense {
    ExpenseRepository::new(db.clone())
        .submit(submission(org))
        .await
        .expect("submission")
}

// ============================================================================
// Straight-line approval over a two-slot chain
// ============================================================================
#[tokio::test]
async fn test_straight_line_approval() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;

    // Roster: the admin at sequence 1; the direct manager leads anyway.
    ApproverRepository::new(db.clone())
        .add(org.company_id, org.admin, "Admin", 1)
        .await
        .expect("roster add");

    let submitted = submit(&db, &org).await;
    assert_eq!(submitted.expense.status, ExpenseStatus::Pending);
    assert!(submitted.warning.is_none());
    assert_eq!(submitted.chain.len(), 2);
    assert_eq!(submitted.chain[0].slot.approver_id, org.manager);
    assert_eq!(submitted.chain[0].slot.sequence, 1);
    assert_eq!(submitted.chain[1].slot.approver_id, org.admin);
    assert_eq!(submitted.chain[1].slot.sequence, 2);

    let approvals = ApprovalRepository::new(db.clone());

    let first = approvals
        .decide(
            &actor(&org, org.manager, Role::Manager),
            submitted.chain[0].slot.id,
            Verdict::Approve,
            Some("ok".to_string()),
        )
        .await
        .expect("manager approval");
    assert_eq!(first.expense.status, ExpenseStatus::Pending);
    assert!(!first.terminal);
    assert_eq!(first.next_pending_sequence, Some(2));
    assert_eq!(first.slot.comments.as_deref(), Some("ok"));

    let second = approvals
        .decide(
            &actor(&org, org.admin, Role::Admin),
            submitted.chain[1].slot.id,
            Verdict::Approve,
            None,
        )
        .await
        .expect("admin approval");
    assert_eq!(second.expense.status, ExpenseStatus::Approved);
    assert!(second.terminal);
    assert_eq!(second.next_pending_sequence, None);
}

// ============================================================================
// Cascade rejection across a three-slot chain
// ============================================================================
#[tokio::test]
async fn test_cascade_rejection() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let users = UserRepository::new(db.clone());
    let roster = ApproverRepository::new(db.clone());

    let finance = users
        .create(
            org.company_id,
            "Finance",
            &email("finance"),
            "x",
            Role::Manager,
            None,
        )
        .await
        .unwrap();
    let ceo = users
        .create(org.company_id, "CEO", &email("ceo"), "x", Role::Admin, None)
        .await
        .unwrap();
    roster
        .add(org.company_id, finance.id, "Finance", 1)
        .await
        .unwrap();
    roster.add(org.company_id, ceo.id, "CEO", 2).await.unwrap();

    let submitted = submit(&db, &org).await;
    assert_eq!(submitted.chain.len(), 3);

    let approvals = ApprovalRepository::new(db.clone());
    approvals
        .decide(
            &actor(&org, org.manager, Role::Manager),
            submitted.chain[0].slot.id,
            Verdict::Approve,
            None,
        )
        .await
        .unwrap();

    let rejection = approvals
        .decide(
            &Actor {
                user_id: finance.id,
                company_id: org.company_id,
                role: Role::Manager,
            },
            submitted.chain[1].slot.id,
            Verdict::Reject,
            Some("missing receipt".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(rejection.expense.status, ExpenseStatus::Rejected);
    assert!(rejection.terminal);
    assert_eq!(rejection.slot.comments.as_deref(), Some("missing receipt"));

    let detail = ExpenseRepository::new(db.clone())
        .get_expense(
            &actor(&org, org.employee, Role::Employee),
            submitted.expense.id,
        )
        .await
        .unwrap();
    let ceo_slot = &detail.chain[2];
    assert_eq!(ceo_slot.slot.status, ApprovalStatus::Rejected);
    assert_eq!(
        ceo_slot.slot.comments.as_deref(),
        Some("Rejected due to prior rejection in approval chain")
    );
}

// ============================================================================
// Out-of-order approval attempt
// ============================================================================
#[tokio::test]
async fn test_out_of_order_approval() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let users = UserRepository::new(db.clone());
    let roster = ApproverRepository::new(db.clone());

    let finance = users
        .create(
            org.company_id,
            "Finance",
            &email("finance"),
            "x",
            Role::Manager,
            None,
        )
        .await
        .unwrap();
    let ceo = users
        .create(org.company_id, "CEO", &email("ceo"), "x", Role::Admin, None)
        .await
        .unwrap();
    roster
        .add(org.company_id, finance.id, "Finance", 1)
        .await
        .unwrap();
    roster.add(org.company_id, ceo.id, "CEO", 2).await.unwrap();

    let submitted = submit(&db, &org).await;

    let err = ApprovalRepository::new(db.clone())
        .decide(
            &Actor {
                user_id: ceo.id,
                company_id: org.company_id,
                role: Role::Admin,
            },
            submitted.chain[2].slot.id,
            Verdict::Approve,
            None,
        )
        .await
        .unwrap_err();

    match err {
        ApprovalError::OutOfOrderApproval { blocking_sequence } => {
            assert_eq!(blocking_sequence, 1);
        }
        other => panic!("expected OutOfOrderApproval, got {other:?}"),
    }

    // No state change.
    let detail = ExpenseRepository::new(db.clone())
        .get_expense(
            &actor(&org, org.employee, Role::Employee),
            submitted.expense.id,
        )
        .await
        .unwrap();
    assert_eq!(detail.expense.status, ExpenseStatus::Pending);
    assert!(detail
        .chain
        .iter()
        .all(|s| s.slot.status == ApprovalStatus::Pending));
}

// ============================================================================
// Percentage rule short-circuit leaves trailing slots pending
// ============================================================================
#[tokio::test]
async fn test_percentage_rule_short_circuit() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let users = UserRepository::new(db.clone());
    let roster = ApproverRepository::new(db.clone());

    let mut extra = Vec::new();
    for (i, label) in ["Second", "Third", "Fourth"].iter().enumerate() {
        let user = users
            .create(
                org.company_id,
                label,
                &email(label),
                "x",
                Role::Manager,
                None,
            )
            .await
            .unwrap();
        roster
            .add(org.company_id, user.id, label, (i + 1) as i32)
            .await
            .unwrap();
        extra.push(user.id);
    }

    ApprovalRuleRepository::new(db.clone())
        .set_rule(
            org.company_id,
            RuleConfig::Percentage {
                percentage: 75,
                total_approvers: 4,
            },
        )
        .await
        .unwrap();

    let submitted = submit(&db, &org).await;
    assert_eq!(submitted.chain.len(), 4);

    let approvals = ApprovalRepository::new(db.clone());
    let deciders = [org.manager, extra[0], extra[1]];
    let mut last = None;
    for (idx, decider) in deciders.iter().enumerate() {
        let result = approvals
            .decide(
                &Actor {
                    user_id: *decider,
                    company_id: org.company_id,
                    role: Role::Manager,
                },
                submitted.chain[idx].slot.id,
                Verdict::Approve,
                None,
            )
            .await
            .unwrap();
        last = Some(result);
    }

    let last = last.unwrap();
    assert_eq!(last.expense.status, ExpenseStatus::Approved);
    assert!(last.terminal);

    // The fourth slot is not cascade-rejected by an approval termination.
    let detail = ExpenseRepository::new(db.clone())
        .get_expense(
            &actor(&org, org.employee, Role::Employee),
            submitted.expense.id,
        )
        .await
        .unwrap();
    assert_eq!(detail.chain[3].slot.status, ApprovalStatus::Pending);
}

// ============================================================================
// Re-posting an approve on a decided slot
// ============================================================================
#[tokio::test]
async fn test_repost_approve_conflicts() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;

    let submitted = submit(&db, &org).await;
    let approvals = ApprovalRepository::new(db.clone());
    let manager = actor(&org, org.manager, Role::Manager);

    approvals
        .decide(&manager, submitted.chain[0].slot.id, Verdict::Approve, None)
        .await
        .unwrap();

    let err = approvals
        .decide(&manager, submitted.chain[0].slot.id, Verdict::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::SlotAlreadyDecided(_)));
}

// ============================================================================
// Admin self-approval and the unrouted warning
// ============================================================================
#[tokio::test]
async fn test_empty_chain_outcomes() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let expenses = ExpenseRepository::new(db.clone());

    // No roster, submitter has a manager: normal one-slot chain.
    let routed = submit(&db, &org).await;
    assert_eq!(routed.chain.len(), 1);

    // Admin with no manager and no roster: immediate self-approval.
    let admin_submission = SubmitExpenseInput {
        submitter_id: org.admin,
        ..submission(&org)
    };
    let self_approved = expenses.submit(admin_submission).await.unwrap();
    assert_eq!(self_approved.expense.status, ExpenseStatus::Approved);
    assert!(self_approved.chain.is_empty());
    assert!(self_approved.warning.is_none());

    // Manager with no manager of their own and no roster: dead-ends with
    // a configuration warning.
    let manager_submission = SubmitExpenseInput {
        submitter_id: org.manager,
        ..submission(&org)
    };
    let unrouted = expenses.submit(manager_submission).await.unwrap();
    assert_eq!(unrouted.expense.status, ExpenseStatus::Pending);
    assert!(unrouted.chain.is_empty());
    assert!(unrouted.warning.is_some());
}

// ============================================================================
// Manager reassignment: cycles and cross-company links are rejected
// ============================================================================
#[tokio::test]
async fn test_manager_assignment() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let users = UserRepository::new(db.clone());

    // The employee already reports to the manager, so pointing the
    // manager at the employee would close a two-node loop.
    let err = users
        .set_manager(org.company_id, org.manager, Some(org.employee))
        .await
        .unwrap_err();
    assert!(matches!(err, claimflow_db::repositories::user::UserError::ManagerCycle));

    // Self-management is the degenerate cycle.
    let err = users
        .set_manager(org.company_id, org.manager, Some(org.manager))
        .await
        .unwrap_err();
    assert!(matches!(err, claimflow_db::repositories::user::UserError::ManagerCycle));

    // A manager from another company is rejected.
    let other = seed_org(&db).await;
    let err = users
        .set_manager(org.company_id, org.manager, Some(other.admin))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        claimflow_db::repositories::user::UserError::CrossCompanyManager
    ));

    // A valid reassignment within the company sticks, and the new
    // manager leads the chain on the next submission.
    let updated = users
        .set_manager(org.company_id, org.employee, Some(org.admin))
        .await
        .expect("reassignment");
    assert_eq!(updated.manager_id, Some(org.admin));

    let submitted = submit(&db, &org).await;
    assert_eq!(submitted.chain[0].slot.approver_id, org.admin);

    // Clearing the link leaves the employee unrouted.
    let cleared = users
        .set_manager(org.company_id, org.employee, None)
        .await
        .expect("clearing");
    assert_eq!(cleared.manager_id, None);
}

// ============================================================================
// Roster sequence swap
// ============================================================================
#[tokio::test]
async fn test_sequence_swap() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let users = UserRepository::new(db.clone());
    let roster = ApproverRepository::new(db.clone());

    let mut ids = Vec::new();
    for (i, name) in ["Alice", "Bob", "Carol"].iter().enumerate() {
        let user = users
            .create(
                org.company_id,
                name,
                &email(name),
                "x",
                Role::Manager,
                None,
            )
            .await
            .unwrap();
        let row = roster
            .add(org.company_id, user.id, name, (i + 1) as i32)
            .await
            .unwrap();
        ids.push(row.id);
    }

    roster
        .update_sequence(org.company_id, ids[2], 2)
        .await
        .expect("swap");

    let listed = roster.list(org.company_id).await.unwrap();
    let by_name: Vec<(String, i32)> = listed
        .iter()
        .map(|d| (d.user_name.clone(), d.approver.sequence))
        .collect();

    assert!(by_name.contains(&("Alice".to_string(), 1)));
    assert!(by_name.contains(&("Carol".to_string(), 2)));
    assert!(by_name.contains(&("Bob".to_string(), 3)));
}

// ============================================================================
// Decide on an unknown slot
// ============================================================================
#[tokio::test]
async fn test_decide_slot_not_found() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;

    let missing = Uuid::new_v4();
    let err = ApprovalRepository::new(db.clone())
        .decide(
            &actor(&org, org.manager, Role::Manager),
            missing,
            Verdict::Approve,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApprovalError::SlotNotFound(id) if id == missing));
}

// ============================================================================
// Pending queue gating
// ============================================================================
#[tokio::test]
async fn test_pending_for_me_gating() {
    let Some(db) = connect_or_skip().await else {
        return;
    };
    let org = seed_org(&db).await;
    let users = UserRepository::new(db.clone());
    let roster = ApproverRepository::new(db.clone());

    let finance = users
        .create(
            org.company_id,
            "Finance",
            &email("finance"),
            "x",
            Role::Manager,
            None,
        )
        .await
        .unwrap();
    roster
        .add(org.company_id, finance.id, "Finance", 1)
        .await
        .unwrap();

    let submitted = submit(&db, &org).await;
    let approvals = ApprovalRepository::new(db.clone());

    // Finance's slot is gated behind the manager's.
    let finance_actor = Actor {
        user_id: finance.id,
        company_id: org.company_id,
        role: Role::Manager,
    };
    let queue = approvals.pending_for_me(&finance_actor).await.unwrap();
    assert!(
        !queue.iter().any(|i| i.expense.id == submitted.expense.id),
        "gated slot must not appear in the pending queue"
    );

    approvals
        .decide(
            &actor(&org, org.manager, Role::Manager),
            submitted.chain[0].slot.id,
            Verdict::Approve,
            Some("fine".to_string()),
        )
        .await
        .unwrap();

    let queue = approvals.pending_for_me(&finance_actor).await.unwrap();
    let item = queue
        .iter()
        .find(|i| i.expense.id == submitted.expense.id)
        .expect("slot now actionable");
    assert_eq!(item.total_slots, 2);
    assert_eq!(item.approved_slots, 1);
    assert_eq!(item.prior.len(), 1);
    assert_eq!(item.prior[0].approver_name, "Manager");
    assert_eq!(item.prior[0].comments.as_deref(), Some("fine"));
    assert_eq!(item.submitter_name, "Employee");
}
