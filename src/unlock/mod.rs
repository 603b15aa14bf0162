//! Unlock evaluation
//!
//! A challenge is unlocked for a player when every one of its DIRECT
//! predecessors is in the player's solved set. Transitive gating falls out
//! of the graph being acyclic: a predecessor is itself gated by its own
//! predecessors, so nothing deeper than one level is ever inspected.
//!
//! Everything here is a pure function of its arguments. Caching lives in
//! [`crate::cache::FrontierCache`].

pub mod expiry;

pub use expiry::{expired_set, expires_at, is_expired, minutes_remaining, unlocked_at, SolveTimes};

use crate::graph::GraphSnapshot;
use crate::models::{ChallengeId, ChallengeStatus};
use std::collections::BTreeSet;

pub type SolvedSet = BTreeSet<ChallengeId>;

/// Stateless unlock rules
pub struct UnlockEvaluator;

impl UnlockEvaluator {
    /// Every challenge whose predecessors are all in `solved`.
    ///
    /// Includes solved challenges and every root. Ids in `solved` that are not
    /// in the graph are ignored.
    pub fn unlocked_set(solved: &SolvedSet, graph: &GraphSnapshot) -> SolvedSet {
        graph
            .challenges()
            .filter(|c| c.predecessors.is_subset(solved))
            .map(|c| c.id)
            .collect()
    }

    /// Membership form of [`Self::unlocked_set`]; false for unknown ids
    pub fn is_unlocked(id: ChallengeId, solved: &SolvedSet, graph: &GraphSnapshot) -> bool {
        graph
            .predecessors(id)
            .is_some_and(|preds| preds.is_subset(solved))
    }

    /// Unlocked but not yet solved
    pub fn frontier(solved: &SolvedSet, graph: &GraphSnapshot) -> SolvedSet {
        Self::unlocked_set(solved, graph)
            .difference(solved)
            .copied()
            .collect()
    }

    pub fn newly_unlocked(before: &SolvedSet, after: &SolvedSet) -> SolvedSet {
        after.difference(before).copied().collect()
    }

    /// Status ignoring time limits
    pub fn status(id: ChallengeId, solved: &SolvedSet, graph: &GraphSnapshot) -> ChallengeStatus {
        if solved.contains(&id) {
            ChallengeStatus::Solved
        } else if Self::is_unlocked(id, solved, graph) {
            ChallengeStatus::Unlocked
        } else {
            ChallengeStatus::Locked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use crate::models::Challenge;

    fn ids(list: &[u64]) -> SolvedSet {
        list.iter().map(|n| ChallengeId(*n)).collect()
    }

    fn chain() -> GraphStore {
        let store = GraphStore::new();
        store
            .add_challenges(vec![
                Challenge::new(1, "a"),
                Challenge::new(2, "b").with_predecessor(1u64),
                Challenge::new(3, "c").with_predecessor(2u64),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_chain_unlocks_in_order() {
        let graph = chain().snapshot();

        assert_eq!(UnlockEvaluator::unlocked_set(&ids(&[]), &graph), ids(&[1]));
        assert_eq!(UnlockEvaluator::unlocked_set(&ids(&[1]), &graph), ids(&[1, 2]));
        assert_eq!(
            UnlockEvaluator::unlocked_set(&ids(&[1, 2]), &graph),
            ids(&[1, 2, 3])
        );
    }

    #[test]
    fn test_only_direct_predecessors_gate() {
        // Solving 2 without 1 cannot happen through the processor, but the
        // rule itself only looks one level up.
        let graph = chain().snapshot();
        assert!(UnlockEvaluator::is_unlocked(ChallengeId(3), &ids(&[2]), &graph));
    }

    #[test]
    fn test_multi_predecessor_order_independent() {
        let store = GraphStore::new();
        store
            .add_challenges(vec![
                Challenge::new(1, "a"),
                Challenge::new(2, "b"),
                Challenge::new(3, "ab").with_predecessors([1u64, 2]),
            ])
            .unwrap();
        let graph = store.snapshot();
        let target = ChallengeId(3);

        for order in [[1u64, 2], [2, 1]] {
            let mut solved = SolvedSet::new();
            solved.insert(ChallengeId(order[0]));
            assert!(!UnlockEvaluator::is_unlocked(target, &solved, &graph));
            solved.insert(ChallengeId(order[1]));
            assert!(UnlockEvaluator::is_unlocked(target, &solved, &graph));
        }
    }

    #[test]
    fn test_membership_agrees_with_set() {
        let graph = chain().snapshot();
        for solved in [ids(&[]), ids(&[1]), ids(&[1, 2]), ids(&[1, 2, 3]), ids(&[3])] {
            let set = UnlockEvaluator::unlocked_set(&solved, &graph);
            for id in graph.ids().chain([ChallengeId(99)]) {
                assert_eq!(
                    set.contains(&id),
                    UnlockEvaluator::is_unlocked(id, &solved, &graph),
                    "disagreement for {id} with solved {solved:?}"
                );
            }
        }
    }

    #[test]
    fn test_frontier_and_status() {
        let graph = chain().snapshot();
        let solved = ids(&[1]);

        assert_eq!(UnlockEvaluator::frontier(&solved, &graph), ids(&[2]));
        assert_eq!(
            UnlockEvaluator::status(ChallengeId(1), &solved, &graph),
            ChallengeStatus::Solved
        );
        assert_eq!(
            UnlockEvaluator::status(ChallengeId(2), &solved, &graph),
            ChallengeStatus::Unlocked
        );
        assert_eq!(
            UnlockEvaluator::status(ChallengeId(3), &solved, &graph),
            ChallengeStatus::Locked
        );
    }

    #[test]
    fn test_newly_unlocked() {
        assert_eq!(
            UnlockEvaluator::newly_unlocked(&ids(&[1]), &ids(&[1, 2, 5])),
            ids(&[2, 5])
        );
    }
}
