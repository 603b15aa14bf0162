use super::*;
use std::sync::Arc;
use std::thread;

fn id(n: u64) -> ChallengeId {
    ChallengeId(n)
}

/// 1 <- 2 <- 3
fn chain_store() -> GraphStore {
    let store = GraphStore::new();
    store.add_challenge(Challenge::new(1, "Recon")).unwrap();
    store
        .add_challenge(Challenge::new(2, "Foothold").with_predecessor(1u64))
        .unwrap();
    store
        .add_challenge(Challenge::new(3, "Escalate").with_predecessor(2u64))
        .unwrap();
    store
}

#[test]
fn test_basic_operations() {
    let store = chain_store();

    assert_eq!(store.len(), 3);
    assert_eq!(store.version(), 3);
    assert_eq!(store.dependents(id(1)), BTreeSet::from([id(2)]));

    let c = store.get(id(3)).expect("challenge 3 exists");
    assert_eq!(c.name, "Escalate");
    assert!(c.predecessors.contains(&id(2)));
}

#[test]
fn test_self_reference_is_cycle() {
    let store = chain_store();
    let err = store
        .add_challenge(Challenge::new(4, "Loop").with_predecessor(4u64))
        .unwrap_err();
    assert_eq!(
        err,
        StorylineError::CycleDetected {
            challenge: id(4),
            via: id(4)
        }
    );
}

#[test]
fn test_readding_ancestor_below_descendant_is_cycle() {
    let store = chain_store();
    let err = store
        .add_challenge(Challenge::new(1, "Recon").with_predecessor(3u64))
        .unwrap_err();
    assert!(matches!(err, StorylineError::CycleDetected { challenge, .. } if challenge == id(1)));
}

#[test]
fn test_duplicate_without_cycle() {
    let store = chain_store();
    let err = store.add_challenge(Challenge::new(2, "Again")).unwrap_err();
    assert_eq!(err, StorylineError::DuplicateChallenge(id(2)));
}

#[test]
fn test_unknown_predecessor() {
    let store = chain_store();
    let err = store
        .add_challenge(Challenge::new(5, "Orphan").with_predecessors([1u64, 99]))
        .unwrap_err();
    assert_eq!(
        err,
        StorylineError::UnknownPredecessor {
            challenge: id(5),
            predecessor: id(99)
        }
    );
}

#[test]
fn test_zero_lifetime_rejected() {
    let store = chain_store();
    let err = store
        .add_challenge(Challenge::new(6, "Timed").with_max_lifetime(0))
        .unwrap_err();
    assert_eq!(err.code(), "invalid_lifetime");
}

#[test]
fn test_rejected_mutation_leaves_snapshot_equal() {
    let store = chain_store();
    let before = store.snapshot();

    assert!(store
        .update_challenge(Challenge::new(1, "Recon").with_predecessor(3u64))
        .is_err());
    assert!(store
        .add_challenge(Challenge::new(7, "Bad").with_predecessor(42u64))
        .is_err());
    assert!(store.remove_challenge(id(42)).is_err());

    let after = store.snapshot();
    assert_eq!(*before, *after);
    assert_eq!(before.version(), after.version());
}

#[test]
fn test_update_replaces_edges() {
    let store = chain_store();
    store
        .update_challenge(Challenge::new(3, "Escalate").with_predecessor(1u64))
        .unwrap();

    let snap = store.snapshot();
    assert_eq!(snap.predecessors(id(3)), Some(&BTreeSet::from([id(1)])));
    assert!(snap.dependents(id(2)).is_empty());

    // 1 no longer reaches through 2, so 2 may now depend on 3
    store
        .update_challenge(Challenge::new(2, "Foothold").with_predecessor(3u64))
        .unwrap();
}

#[test]
fn test_update_missing_is_not_found() {
    let store = chain_store();
    let err = store.update_challenge(Challenge::new(9, "Ghost")).unwrap_err();
    assert_eq!(err, StorylineError::NotFound(id(9)));
}

#[test]
fn test_remove_cascades() {
    let store = chain_store();
    let removed = store.remove_challenge(id(2)).unwrap();
    assert_eq!(removed.id, id(2));

    let snap = store.snapshot();
    assert!(!snap.contains(id(2)));
    assert!(snap.get(id(3)).unwrap().is_root());
    assert!(snap.dependents(id(1)).is_empty());
}

#[test]
fn test_snapshot_isolation() {
    let store = chain_store();
    let old = store.snapshot();

    store.remove_challenge(id(3)).unwrap();

    // The old snapshot is untouched by later mutations
    assert!(old.contains(id(3)));
    assert!(!store.snapshot().contains(id(3)));
}

#[test]
fn test_batch_import_any_order() {
    let store = GraphStore::new();
    store
        .add_challenges(vec![
            Challenge::new(3, "c").with_predecessors([1u64, 2]),
            Challenge::new(2, "b").with_predecessor(1u64),
            Challenge::new(1, "a"),
        ])
        .unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(store.version(), 1);
}

#[test]
fn test_batch_import_is_atomic() {
    let store = chain_store();
    let before = store.snapshot();

    let err = store
        .add_challenges(vec![
            Challenge::new(10, "x"),
            Challenge::new(11, "y").with_predecessor(12u64),
            Challenge::new(12, "z").with_predecessor(11u64),
        ])
        .unwrap_err();

    assert!(matches!(err, StorylineError::CycleDetected { .. }));
    assert_eq!(*before, *store.snapshot());
}

#[test]
fn test_batch_import_unknown() {
    let store = GraphStore::new();
    let err = store
        .add_challenges(vec![Challenge::new(1, "a").with_predecessor(5u64)])
        .unwrap_err();
    assert_eq!(err.code(), "unknown_predecessor");
    assert!(store.is_empty());
}

#[test]
fn test_restore_version_only_raises() {
    let store = chain_store();
    let current = store.version();

    assert_eq!(store.restore_version(current - 1), current);
    assert_eq!(store.version(), current);

    assert_eq!(store.restore_version(40), 40);
    assert_eq!(store.len(), 3);
    assert_eq!(store.add_challenge(Challenge::new(4, "d")).unwrap(), 41);
}

#[test]
fn test_concurrent_mutations_stay_acyclic() {
    let store = Arc::new(GraphStore::new());
    store.add_challenge(Challenge::new(0, "root")).unwrap();

    // Threads race to build a chain in both directions; validation must
    // keep the graph a DAG no matter how they interleave.
    let handles: Vec<_> = (1..=8u64)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..20u64 {
                    let node = t * 100 + i;
                    let _ = store.add_challenge(Challenge::new(node, "n").with_predecessor(0u64));
                    let other = ((t % 8) + 1) * 100 + i;
                    let _ = store
                        .update_challenge(Challenge::new(node, "n").with_predecessor(other));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().expect("writer thread panicked");
    }

    let snap = store.snapshot();
    assert!(snap.find_cycles().is_empty());
    assert!(snap.topological_order().is_ok());
    assert_eq!(snap.len(), 1 + 8 * 20);
}
