//! Solve event processing
//!
//! Each player owns an independently locked ledger, so solves by different
//! players never contend, while two solves by the same player are applied
//! one after the other (atomic check-then-insert).
//!
//! Per (player, challenge) the lifecycle is Locked -> Unlocked -> Solved.
//! Locked -> Unlocked is implicit (predecessors get solved); Unlocked ->
//! Solved is the only transition recorded here, and Solved is terminal.

use crate::cache::FrontierCache;
use crate::error::{StorylineError, StorylineResult};
use crate::graph::{GraphSnapshot, GraphSource};
use crate::models::{ChallengeId, PlayerId, PlayerSolveRecord};
use crate::unlock::{is_expired, SolveTimes, SolvedSet, UnlockEvaluator};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct PlayerLedger {
    records: BTreeMap<ChallengeId, PlayerSolveRecord>,
    /// Bumped on every appended record; keys the frontier cache
    version: u64,
}

impl PlayerLedger {
    fn solved(&self) -> SolvedSet {
        self.records.keys().copied().collect()
    }

    fn times(&self) -> SolveTimes {
        self.records
            .iter()
            .map(|(id, r)| (*id, r.solved_at))
            .collect()
    }
}

/// Consistent copy of one player's solve state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub version: u64,
    pub records: BTreeMap<ChallengeId, PlayerSolveRecord>,
}

impl PlayerState {
    pub fn solved(&self) -> SolvedSet {
        self.records.keys().copied().collect()
    }

    pub fn times(&self) -> SolveTimes {
        self.records
            .iter()
            .map(|(id, r)| (*id, r.solved_at))
            .collect()
    }
}

/// Result of a solve submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub record: PlayerSolveRecord,
    /// True when the solve was already on record and nothing changed
    pub already_solved: bool,
    /// Player's unlocked set after the solve
    pub unlocked: SolvedSet,
    /// Challenges this solve unlocked
    pub newly_unlocked: SolvedSet,
}

pub struct SolveEventProcessor {
    graph: Arc<dyn GraphSource>,
    ledgers: DashMap<PlayerId, Arc<Mutex<PlayerLedger>>>,
    frontier: Arc<FrontierCache>,
}

fn lock(ledger: &Mutex<PlayerLedger>) -> MutexGuard<'_, PlayerLedger> {
    ledger
        .lock()
        .expect("player ledger lock poisoned: a thread panicked while recording a solve")
}

impl SolveEventProcessor {
    pub fn new(graph: Arc<dyn GraphSource>, frontier: Arc<FrontierCache>) -> Self {
        Self {
            graph,
            ledgers: DashMap::new(),
            frontier,
        }
    }

    /// Ledger for `player`, created on first use. The map guard is released
    /// before the caller locks the ledger itself.
    fn ledger(&self, player: PlayerId) -> Arc<Mutex<PlayerLedger>> {
        Arc::clone(self.ledgers.entry(player).or_default().value())
    }

    fn existing_ledger(&self, player: PlayerId) -> Option<Arc<Mutex<PlayerLedger>>> {
        self.ledgers.get(&player).map(|l| Arc::clone(l.value()))
    }

    /// Record a solve happening now
    pub fn record_solve(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
    ) -> StorylineResult<SolveOutcome> {
        self.record_solve_at(player, challenge, Utc::now())
    }

    /// Record a solve with an explicit timestamp.
    ///
    /// Idempotent: an existing record is returned unchanged. Otherwise the
    /// challenge must exist, be unlocked against the current snapshot, and
    /// (if timed) still be inside its window.
    pub fn record_solve_at(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
        at: DateTime<Utc>,
    ) -> StorylineResult<SolveOutcome> {
        let ledger = self.ledger(player);
        let mut ledger = lock(&ledger);
        let graph = self.graph.snapshot();

        if let Some(existing) = ledger.records.get(&challenge) {
            debug!(player = %player, challenge = %challenge, "Duplicate solve ignored");
            let unlocked =
                self.frontier
                    .get_or_compute(player, &graph, ledger.version, &ledger.solved());
            return Ok(SolveOutcome {
                record: existing.clone(),
                already_solved: true,
                unlocked: (*unlocked).clone(),
                newly_unlocked: SolvedSet::new(),
            });
        }

        let node = graph
            .get(challenge)
            .ok_or(StorylineError::NotFound(challenge))?;

        let mut solved = ledger.solved();
        let before = self
            .frontier
            .get_or_compute(player, &graph, ledger.version, &solved);

        if !before.contains(&challenge) {
            debug!(player = %player, challenge = %challenge, "Rejected solve of locked challenge");
            return Err(StorylineError::ChallengeLocked { player, challenge });
        }

        if node.is_timed() && is_expired(node, &ledger.times(), at) {
            debug!(player = %player, challenge = %challenge, "Rejected solve of expired challenge");
            return Err(StorylineError::ChallengeExpired { player, challenge });
        }

        let record = PlayerSolveRecord {
            player,
            challenge,
            solved_at: at,
        };
        ledger.records.insert(challenge, record.clone());
        ledger.version += 1;
        solved.insert(challenge);

        let after = self
            .frontier
            .get_or_compute(player, &graph, ledger.version, &solved);
        let newly_unlocked = UnlockEvaluator::newly_unlocked(&before, &after);

        info!(
            player = %player,
            challenge = %challenge,
            unlocked = newly_unlocked.len(),
            "Recorded solve"
        );

        Ok(SolveOutcome {
            record,
            already_solved: false,
            unlocked: (*after).clone(),
            newly_unlocked,
        })
    }

    /// Load historical records without validation (persistence restore).
    ///
    /// Duplicates keep the first record seen.
    pub fn restore_records(&self, records: Vec<PlayerSolveRecord>) -> usize {
        let mut restored = 0;
        for record in records {
            let ledger = self.ledger(record.player);
            let mut ledger = lock(&ledger);
            if !ledger.records.contains_key(&record.challenge) {
                ledger.records.insert(record.challenge, record);
                ledger.version += 1;
                restored += 1;
            }
        }
        restored
    }

    // ==================== Queries ====================

    pub fn player_state(&self, player: PlayerId) -> PlayerState {
        match self.existing_ledger(player) {
            Some(ledger) => {
                let ledger = lock(&ledger);
                PlayerState {
                    version: ledger.version,
                    records: ledger.records.clone(),
                }
            }
            None => PlayerState::default(),
        }
    }

    pub fn solved_set(&self, player: PlayerId) -> SolvedSet {
        self.player_state(player).solved()
    }

    pub fn is_solved(&self, player: PlayerId, challenge: ChallengeId) -> bool {
        self.existing_ledger(player)
            .is_some_and(|ledger| lock(&ledger).records.contains_key(&challenge))
    }

    pub fn record(&self, player: PlayerId, challenge: ChallengeId) -> Option<PlayerSolveRecord> {
        self.existing_ledger(player)
            .and_then(|ledger| lock(&ledger).records.get(&challenge).cloned())
    }

    pub fn records(&self, player: PlayerId) -> Vec<PlayerSolveRecord> {
        self.player_state(player).records.into_values().collect()
    }

    /// Cached unlocked set against the current graph
    pub fn unlocked_set(&self, player: PlayerId) -> Arc<SolvedSet> {
        let state = self.player_state(player);
        let graph = self.graph.snapshot();
        self.unlocked_for(player, &graph, &state)
    }

    /// Cached unlocked set for a state the caller already holds
    pub fn unlocked_for(
        &self,
        player: PlayerId,
        graph: &GraphSnapshot,
        state: &PlayerState,
    ) -> Arc<SolvedSet> {
        self.frontier
            .get_or_compute(player, graph, state.version, &state.solved())
    }

    /// Players with at least one solve, in id order
    pub fn players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self
            .ledgers
            .iter()
            .filter(|entry| !lock(entry.value()).records.is_empty())
            .map(|entry| *entry.key())
            .collect();
        players.sort();
        players
    }

    /// Every record, ordered by player then challenge
    pub fn all_records(&self) -> Vec<PlayerSolveRecord> {
        self.players()
            .into_iter()
            .flat_map(|p| self.records(p))
            .collect()
    }

    /// Players with a solve of a challenge still present in `graph`
    pub fn players_in(&self, graph: &GraphSnapshot) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self
            .ledgers
            .iter()
            .filter(|entry| lock(entry.value()).records.keys().any(|c| graph.contains(*c)))
            .map(|entry| *entry.key())
            .collect();
        players.sort();
        players
    }

    /// Solves of challenges still present in `graph`
    pub fn solves_in(&self, graph: &GraphSnapshot) -> usize {
        self.ledgers
            .iter()
            .map(|entry| {
                lock(entry.value())
                    .records
                    .keys()
                    .filter(|c| graph.contains(**c))
                    .count()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FixedGraph, GraphStore};
    use crate::models::Challenge;
    use chrono::{Duration, TimeZone};
    use std::thread;

    fn id(n: u64) -> ChallengeId {
        ChallengeId(n)
    }

    fn processor() -> (Arc<GraphStore>, SolveEventProcessor) {
        let store = Arc::new(GraphStore::new());
        store
            .add_challenges(vec![
                Challenge::new(1, "a"),
                Challenge::new(2, "b").with_predecessor(1u64),
                Challenge::new(3, "c").with_predecessor(2u64),
            ])
            .unwrap();
        let processor = SolveEventProcessor::new(store.clone(), Arc::new(FrontierCache::new()));
        (store, processor)
    }

    #[test]
    fn test_solve_expands_unlocked_set() {
        let (_, p) = processor();
        let player = PlayerId(7);

        let outcome = p.record_solve(player, id(1)).unwrap();
        assert!(!outcome.already_solved);
        assert_eq!(outcome.unlocked, SolvedSet::from([id(1), id(2)]));
        assert_eq!(outcome.newly_unlocked, SolvedSet::from([id(2)]));
    }

    #[test]
    fn test_locked_solve_rejected_without_state_change() {
        let (_, p) = processor();
        let player = PlayerId(7);

        let err = p.record_solve(player, id(3)).unwrap_err();
        assert_eq!(
            err,
            StorylineError::ChallengeLocked {
                player,
                challenge: id(3)
            }
        );
        assert!(p.solved_set(player).is_empty());
        assert_eq!(p.player_state(player).version, 0);
    }

    #[test]
    fn test_duplicate_solve_is_noop() {
        let (_, p) = processor();
        let player = PlayerId(1);

        let first = p.record_solve(player, id(1)).unwrap();
        let second = p.record_solve(player, id(1)).unwrap();

        assert!(second.already_solved);
        assert_eq!(first.record, second.record);
        assert_eq!(first.unlocked, second.unlocked);
        assert!(second.newly_unlocked.is_empty());
        assert_eq!(p.player_state(player).version, 1);
    }

    #[test]
    fn test_unknown_challenge() {
        let (_, p) = processor();
        let err = p.record_solve(PlayerId(1), id(42)).unwrap_err();
        assert_eq!(err, StorylineError::NotFound(id(42)));
    }

    #[test]
    fn test_players_are_independent() {
        let (_, p) = processor();
        p.record_solve(PlayerId(1), id(1)).unwrap();

        assert!(p.record_solve(PlayerId(2), id(2)).is_err());
        assert!(p.record_solve(PlayerId(1), id(2)).is_ok());
        assert_eq!(p.players(), vec![PlayerId(1)]);
    }

    #[test]
    fn test_graph_edit_changes_gate() {
        let (store, p) = processor();
        let player = PlayerId(3);
        p.record_solve(player, id(1)).unwrap();
        assert!(!p.unlocked_set(player).contains(&id(3)));

        // Re-point 3 at 1 and it unlocks without any new solve
        store
            .update_challenge(Challenge::new(3, "c").with_predecessor(1u64))
            .unwrap();
        assert!(p.unlocked_set(player).contains(&id(3)));
        assert!(p.record_solve(player, id(3)).is_ok());
    }

    #[test]
    fn test_expired_challenge_rejected() {
        let snapshot = {
            let store = GraphStore::new();
            store
                .add_challenges(vec![
                    Challenge::new(1, "a"),
                    Challenge::new(2, "b").with_predecessor(1u64).with_max_lifetime(10),
                ])
                .unwrap();
            store.snapshot()
        };
        let p = SolveEventProcessor::new(
            Arc::new(FixedGraph(snapshot)),
            Arc::new(FrontierCache::new()),
        );
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        p.record_solve_at(PlayerId(1), id(1), t0).unwrap();
        let err = p
            .record_solve_at(PlayerId(1), id(2), t0 + Duration::minutes(11))
            .unwrap_err();
        assert_eq!(err.code(), "challenge_expired");

        p.record_solve_at(PlayerId(2), id(1), t0).unwrap();
        assert!(p
            .record_solve_at(PlayerId(2), id(2), t0 + Duration::minutes(10))
            .is_ok());
    }

    #[test]
    fn test_concurrent_duplicate_solves_apply_once() {
        let (_, p) = processor();
        let p = Arc::new(p);
        let player = PlayerId(9);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || p.record_solve(player, id(1)).unwrap())
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().expect("solver thread panicked"))
            .filter(|o| !o.already_solved)
            .count();

        assert_eq!(fresh, 1);
        assert_eq!(p.player_state(player).version, 1);
    }

    #[test]
    fn test_restore_records() {
        let (_, p) = processor();
        let at = Utc::now();
        let restored = p.restore_records(vec![
            PlayerSolveRecord {
                player: PlayerId(1),
                challenge: id(1),
                solved_at: at,
            },
            PlayerSolveRecord {
                player: PlayerId(1),
                challenge: id(1),
                solved_at: at,
            },
        ]);

        assert_eq!(restored, 1);
        assert_eq!(p.all_records().len(), 1);
    }

    #[test]
    fn test_live_counts_skip_deleted_challenges() {
        let (store, p) = processor();
        p.record_solve(PlayerId(1), id(1)).unwrap();
        p.record_solve(PlayerId(2), id(1)).unwrap();
        p.record_solve(PlayerId(2), id(2)).unwrap();

        let graph = store.snapshot();
        assert_eq!(p.players_in(&graph), vec![PlayerId(1), PlayerId(2)]);
        assert_eq!(p.solves_in(&graph), 3);

        store.remove_challenge(id(1)).unwrap();
        let graph = store.snapshot();
        assert_eq!(p.players_in(&graph), vec![PlayerId(2)]);
        assert_eq!(p.solves_in(&graph), 1);
        // Raw records are kept
        assert_eq!(p.players(), vec![PlayerId(1), PlayerId(2)]);
    }
}
