//! Approval chain assembly.
//!
//! On submission the chain is materialized from the submitter's direct
//! manager (if any) followed by the company's configured approvers in
//! their configured order, deduplicated by user. Positions are dense,
//! starting at 1.

use uuid::Uuid;

use crate::approval::types::Role;

/// One active row of the company approver roster.
#[derive(Debug, Clone)]
pub struct ConfiguredApprover {
    /// The approving user.
    pub user_id: Uuid,
    /// Configured position among company approvers.
    pub sequence: i32,
}

/// Assembles the ordered, deduplicated approver list for a new expense.
///
/// The submitter's direct manager always comes first. Configured
/// approvers follow in configured order, skipping any entry that repeats
/// an earlier user. The returned vector index + 1 is the slot sequence.
#[must_use]
pub fn assemble(direct_manager: Option<Uuid>, configured: &[ConfiguredApprover]) -> Vec<Uuid> {
    let mut ordered: Vec<&ConfiguredApprover> = configured.iter().collect();
    ordered.sort_by_key(|c| c.sequence);

    let mut chain = Vec::with_capacity(ordered.len() + 1);
    if let Some(manager) = direct_manager {
        chain.push(manager);
    }

    for entry in ordered {
        if !chain.contains(&entry.user_id) {
            chain.push(entry.user_id);
        }
    }

    chain
}

/// What submission does when the assembled chain is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyChainOutcome {
    /// Admin submitters with nobody to route to are approved immediately.
    SelfApproved,
    /// Anyone else is left pending with no slots; the response carries a
    /// configuration warning.
    PendingUnrouted,
}

/// Decides the empty-chain outcome from the submitter's role.
#[must_use]
pub fn empty_chain_outcome(submitter_role: Role) -> EmptyChainOutcome {
    if submitter_role == Role::Admin {
        EmptyChainOutcome::SelfApproved
    } else {
        EmptyChainOutcome::PendingUnrouted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(user_id: Uuid, sequence: i32) -> ConfiguredApprover {
        ConfiguredApprover { user_id, sequence }
    }

    #[test]
    fn test_manager_first_then_configured() {
        let manager = Uuid::new_v4();
        let finance = Uuid::new_v4();
        let ceo = Uuid::new_v4();

        let chain = assemble(Some(manager), &[cfg(finance, 1), cfg(ceo, 2)]);
        assert_eq!(chain, vec![manager, finance, ceo]);
    }

    #[test]
    fn test_configured_order_respected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // Configured out of order; sequence wins.
        let chain = assemble(None, &[cfg(b, 5), cfg(a, 2)]);
        assert_eq!(chain, vec![a, b]);
    }

    #[test]
    fn test_manager_also_configured_deduplicated() {
        let manager = Uuid::new_v4();
        let other = Uuid::new_v4();

        let chain = assemble(Some(manager), &[cfg(manager, 1), cfg(other, 2)]);
        assert_eq!(chain, vec![manager, other]);
    }

    #[test]
    fn test_duplicate_configured_user_deduplicated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let chain = assemble(None, &[cfg(a, 1), cfg(b, 2), cfg(a, 3)]);
        assert_eq!(chain, vec![a, b]);
    }

    #[test]
    fn test_no_manager_no_configured() {
        let chain = assemble(None, &[]);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_empty_chain_outcome_by_role() {
        assert_eq!(
            empty_chain_outcome(Role::Admin),
            EmptyChainOutcome::SelfApproved
        );
        assert_eq!(
            empty_chain_outcome(Role::Employee),
            EmptyChainOutcome::PendingUnrouted
        );
        assert_eq!(
            empty_chain_outcome(Role::Manager),
            EmptyChainOutcome::PendingUnrouted
        );
    }
}
