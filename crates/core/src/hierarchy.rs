//! Manager-link cycle detection.
//!
//! Only the immediate parent link is stored; cycles are caught on
//! assignment by walking upward to a bounded depth. No reporting tree is
//! ever materialized.

use uuid::Uuid;

/// Checks whether pointing `user_id` at `new_manager_id` would close a
/// management cycle.
///
/// `manager_of` resolves a user to their current manager; `max_depth`
/// bounds the walk (organization size is a safe bound). A walk that hits
/// the bound is treated as cyclic and rejected.
pub fn creates_cycle<F>(
    user_id: Uuid,
    new_manager_id: Uuid,
    manager_of: F,
    max_depth: usize,
) -> bool
where
    F: Fn(Uuid) -> Option<Uuid>,
{
    if user_id == new_manager_id {
        return true;
    }

    let mut current = new_manager_id;
    for _ in 0..max_depth {
        match manager_of(current) {
            Some(next) if next == user_id => return true,
            Some(next) => current = next,
            None => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(links: &HashMap<Uuid, Uuid>) -> impl Fn(Uuid) -> Option<Uuid> + '_ {
        move |id| links.get(&id).copied()
    }

    #[test]
    fn test_self_manager_is_cycle() {
        let user = Uuid::new_v4();
        let links = HashMap::new();
        assert!(creates_cycle(user, user, lookup(&links), 10));
    }

    #[test]
    fn test_simple_chain_no_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        // b reports to c; assigning a -> b is fine.
        let links = HashMap::from([(b, c)]);
        assert!(!creates_cycle(a, b, lookup(&links), 10));
    }

    #[test]
    fn test_two_node_cycle_detected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // b already reports to a; assigning a -> b closes the loop.
        let links = HashMap::from([(b, a)]);
        assert!(creates_cycle(a, b, lookup(&links), 10));
    }

    #[test]
    fn test_transitive_cycle_detected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        // c -> b -> a; assigning a -> c closes a three-node loop.
        let links = HashMap::from([(c, b), (b, a)]);
        assert!(creates_cycle(a, c, lookup(&links), 10));
    }

    #[test]
    fn test_depth_bound_treated_as_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let links = HashMap::from([(b, c), (c, b)]); // pre-existing loop not touching a
        assert!(creates_cycle(a, b, lookup(&links), 5));
    }
}
