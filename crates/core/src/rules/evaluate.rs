//! Rule evaluation after each approval.
//!
//! Rules are orthogonal, not prioritized: any rule voting to terminate
//! ends the expense approved. The evaluator never rejects.

use crate::approval::types::{SlotStatus, SlotView};
use crate::rules::types::RuleConfig;

/// Verdict of a rule evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep waiting on the chain.
    Continue,
    /// Terminate the expense in the approved state.
    TerminateApproved,
}

/// Evaluates every active rule against the post-update slot set.
#[must_use]
pub fn evaluate(slots: &[SlotView], rules: &[RuleConfig]) -> Outcome {
    if rules.iter().any(|rule| rule_terminates(slots, rule)) {
        Outcome::TerminateApproved
    } else {
        Outcome::Continue
    }
}

fn rule_terminates(slots: &[SlotView], rule: &RuleConfig) -> bool {
    match rule {
        RuleConfig::Percentage { percentage, .. } => percentage_met(slots, *percentage),
        RuleConfig::SpecificApprover { approver_id } => approver_approved(slots, *approver_id),
        RuleConfig::Hybrid {
            percentage,
            special_approver_id,
            ..
        } => percentage_met(slots, *percentage) && approver_approved(slots, *special_approver_id),
    }
}

/// Percentage is computed over the actual slot count, not the count the
/// rule was configured with.
fn percentage_met(slots: &[SlotView], percentage: u32) -> bool {
    let total = slots.len() as u64;
    if total == 0 {
        return false;
    }
    let approved = slots
        .iter()
        .filter(|s| s.status == SlotStatus::Approved)
        .count() as u64;

    approved * 100 >= u64::from(percentage) * total
}

/// Inert when no slot is assigned to the named approver.
fn approver_approved(slots: &[SlotView], approver_id: uuid::Uuid) -> bool {
    slots
        .iter()
        .any(|s| s.approver_id == approver_id && s.status == SlotStatus::Approved)
}
