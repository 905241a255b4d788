//! Property suites for the approval engine.

use proptest::prelude::*;
use uuid::Uuid;

use crate::approval::chain::{ConfiguredApprover, assemble};
use crate::approval::decide::{DecideInput, decide};
use crate::approval::error::ApprovalError;
use crate::approval::types::{
    CASCADE_COMMENT, ChainSnapshot, ExpenseStatus, SlotStatus, SlotView, Verdict,
};
use crate::rules::RuleConfig;

fn user_pool() -> Vec<Uuid> {
    (0..8).map(|_| Uuid::new_v4()).collect()
}

fn snapshot(statuses: &[SlotStatus]) -> ChainSnapshot {
    ChainSnapshot {
        expense_id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        status: ExpenseStatus::Pending,
        slots: statuses
            .iter()
            .enumerate()
            .map(|(i, status)| SlotView {
                id: Uuid::new_v4(),
                approver_id: Uuid::new_v4(),
                sequence: (i + 1) as i32,
                status: *status,
            })
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The assembled chain never contains a user twice, regardless of the
    /// roster and who the direct manager is.
    #[test]
    fn prop_chain_has_no_duplicates(
        roster in prop::collection::vec((0usize..8, 1i32..50), 0..10),
        manager_idx in prop::option::of(0usize..8),
    ) {
        let pool = user_pool();
        let configured: Vec<ConfiguredApprover> = roster
            .iter()
            .map(|(idx, seq)| ConfiguredApprover { user_id: pool[*idx], sequence: *seq })
            .collect();
        let manager = manager_idx.map(|i| pool[i]);

        let chain = assemble(manager, &configured);

        let mut seen = std::collections::HashSet::new();
        for user in &chain {
            prop_assert!(seen.insert(*user), "user {user} appears twice");
        }
    }

    /// The direct manager, when present, always lands at position 1.
    #[test]
    fn prop_manager_leads_chain(
        roster in prop::collection::vec((0usize..8, 1i32..50), 0..10),
        manager_idx in 0usize..8,
    ) {
        let pool = user_pool();
        let configured: Vec<ConfiguredApprover> = roster
            .iter()
            .map(|(idx, seq)| ConfiguredApprover { user_id: pool[*idx], sequence: *seq })
            .collect();
        let manager = pool[manager_idx];

        let chain = assemble(Some(manager), &configured);
        prop_assert_eq!(chain[0], manager);
    }

    /// Approving at position k fails with the lowest blocking sequence
    /// whenever any earlier slot is not approved.
    #[test]
    fn prop_gating_names_lowest_blocker(
        prefix in prop::collection::vec(
            prop::sample::select(vec![SlotStatus::Approved, SlotStatus::Pending]),
            1..6,
        ),
    ) {
        let mut statuses = prefix.clone();
        statuses.push(SlotStatus::Pending);
        let chain = snapshot(&statuses);
        let target = chain.slots.last().unwrap();

        let result = decide(&chain, &[], &DecideInput {
            slot_id: target.id,
            actor_id: target.approver_id,
            verdict: Verdict::Approve,
            comment: None,
        });

        let expected_blocker = prefix
            .iter()
            .enumerate()
            .find(|(_, s)| **s != SlotStatus::Approved)
            .map(|(i, _)| (i + 1) as i32);

        match expected_blocker {
            Some(seq) => match result {
                Err(ApprovalError::OutOfOrderApproval { blocking_sequence }) => {
                    prop_assert_eq!(blocking_sequence, seq);
                }
                other => prop_assert!(false, "expected OutOfOrderApproval, got {other:?}"),
            },
            None => prop_assert!(result.is_ok()),
        }
    }

    /// After any valid rejection, no slot remains pending: the decided
    /// slot is rejected with the actor's comment and every other pending
    /// slot carries the cascade comment.
    #[test]
    fn prop_cascade_leaves_nothing_pending(
        approved_prefix in 0usize..5,
        trailing in 1usize..5,
    ) {
        let mut statuses = vec![SlotStatus::Approved; approved_prefix];
        statuses.extend(std::iter::repeat_n(SlotStatus::Pending, trailing));
        let chain = snapshot(&statuses);
        let target = &chain.slots[approved_prefix];

        let decision = decide(&chain, &[], &DecideInput {
            slot_id: target.id,
            actor_id: target.approver_id,
            verdict: Verdict::Reject,
            comment: Some("not compliant".to_string()),
        }).unwrap();

        prop_assert_eq!(decision.expense_status, ExpenseStatus::Rejected);
        prop_assert_eq!(decision.cascade.len(), trailing - 1);
        for change in &decision.cascade {
            prop_assert_eq!(change.status, SlotStatus::Rejected);
            prop_assert_eq!(change.comment.as_deref(), Some(CASCADE_COMMENT));
        }
        prop_assert_eq!(decision.slot.comment.as_deref(), Some("not compliant"));
    }

    /// Once a percentage rule terminates a chain, approving more slots
    /// can only keep it terminated: the approved share never decreases
    /// as further slots flip to approved.
    #[test]
    fn prop_percentage_monotone(
        total in 1usize..8,
        threshold in 1u32..=100,
    ) {
        let rules = [RuleConfig::Percentage { percentage: threshold, total_approvers: total as u32 }];
        let mut statuses = vec![SlotStatus::Pending; total];
        let mut terminated = false;

        for i in 0..total {
            statuses[i] = SlotStatus::Approved;
            let chain = snapshot(&statuses);
            let outcome = crate::rules::evaluate(&chain.slots, &rules);
            let now_terminated = outcome == crate::rules::Outcome::TerminateApproved;
            prop_assert!(!terminated || now_terminated, "termination must be monotone");
            terminated = now_terminated;
        }

        // With every slot approved, any threshold up to 100 is met.
        prop_assert!(terminated);
    }
}
