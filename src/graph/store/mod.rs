//! Canonical storyline graph with validated, serialized mutations
//!
//! Readers grab the current `Arc<GraphSnapshot>` under a short read lock and
//! then work lock-free. Writers take the writer mutex, validate against a
//! private draft, and publish the draft with a single pointer swap. A rejected
//! mutation never touches the published snapshot.

use crate::error::{StorylineError, StorylineResult};
use crate::graph::GraphSnapshot;
use crate::models::{Challenge, ChallengeId};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

/// How a candidate challenge relates to the existing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Insert,
    Replace,
}

/// Owner of the canonical storyline graph
pub struct GraphStore {
    /// Currently published snapshot
    current: RwLock<Arc<GraphSnapshot>>,
    /// Serializes validate-then-apply so mutations are totally ordered
    writer: Mutex<()>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(GraphSnapshot::empty())),
            writer: Mutex::new(()),
        }
    }

    // ==================== Lock Helpers ====================
    //
    // Poisoning means a thread panicked while holding the lock. The snapshot
    // behind `current` is only ever replaced wholesale, so it is never left
    // half-written, but a poisoned lock still signals a bug we cannot act on.

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer
            .lock()
            .expect("graph writer lock poisoned: a thread panicked while mutating the graph")
    }

    fn publish(&self, next: GraphSnapshot) {
        let mut current = self
            .current
            .write()
            .expect("graph snapshot lock poisoned: a thread panicked while publishing");
        *current = Arc::new(next);
    }

    /// Current immutable snapshot
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        let current = self
            .current
            .read()
            .expect("graph snapshot lock poisoned: a thread panicked while publishing");
        Arc::clone(&current)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Run `apply` on a private copy of the graph and publish it on success
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut GraphSnapshot) -> StorylineResult<T>,
    ) -> StorylineResult<(T, u64)> {
        let _guard = self.lock_writer();
        let base = self.snapshot();

        let mut draft = (*base).clone();
        let value = apply(&mut draft)?;
        draft.version = base.version() + 1;

        let version = draft.version;
        self.publish(draft);
        Ok((value, version))
    }

    // ==================== Mutations ====================

    /// Add a new challenge. Returns the new graph version.
    pub fn add_challenge(&self, challenge: Challenge) -> StorylineResult<u64> {
        let id = challenge.id;
        let result = self.mutate(|draft| {
            validate(draft, &challenge, Mode::Insert)?;
            draft.insert(challenge);
            Ok(())
        });
        log_outcome("add", id, &result);
        result.map(|(_, version)| version)
    }

    /// Replace an existing challenge's metadata and predecessor set
    pub fn update_challenge(&self, challenge: Challenge) -> StorylineResult<u64> {
        let id = challenge.id;
        let result = self.mutate(|draft| {
            validate(draft, &challenge, Mode::Replace)?;
            draft.insert(challenge);
            Ok(())
        });
        log_outcome("update", id, &result);
        result.map(|(_, version)| version)
    }

    /// Remove a challenge and all incident edges. Returns the removed node.
    pub fn remove_challenge(&self, id: ChallengeId) -> StorylineResult<Challenge> {
        let result = self.mutate(|draft| draft.remove(id).ok_or(StorylineError::NotFound(id)));
        match result {
            Ok((removed, version)) => {
                info!(challenge = %id, version, "Removed challenge");
                Ok(removed)
            }
            Err(e) => {
                debug!(challenge = %id, error = %e, "Rejected challenge removal");
                Err(e)
            }
        }
    }

    /// Insert a batch of challenges atomically, in any input order.
    ///
    /// Either every challenge is added or none is. Used for imports and
    /// restoring persisted graphs.
    pub fn add_challenges(&self, challenges: Vec<Challenge>) -> StorylineResult<u64> {
        let count = challenges.len();
        let (_, version) = self.mutate(|draft| {
            let mut pending = challenges;

            while !pending.is_empty() {
                let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|c| {
                    c.predecessors
                        .iter()
                        .all(|p| draft.contains(*p) && *p != c.id)
                });

                if ready.is_empty() {
                    return Err(diagnose_blocked(draft, &blocked));
                }

                for challenge in ready {
                    validate(draft, &challenge, Mode::Insert)?;
                    draft.insert(challenge);
                }
                pending = blocked;
            }

            Ok(())
        })?;

        info!(count, version, "Imported challenges");
        Ok(version)
    }

    /// Raise the version to at least `version` without changing the graph.
    ///
    /// Used when restoring a persisted storyline so the counter keeps
    /// growing across reloads. Returns the resulting version.
    pub(crate) fn restore_version(&self, version: u64) -> u64 {
        let _guard = self.lock_writer();
        let base = self.snapshot();
        if base.version() >= version {
            return base.version();
        }

        let mut draft = (*base).clone();
        draft.version = version;
        self.publish(draft);
        debug!(version, "Restored graph version");
        version
    }

    // ==================== Queries ====================

    pub fn get(&self, id: ChallengeId) -> Option<Challenge> {
        self.snapshot().get(id).cloned()
    }

    pub fn contains(&self, id: ChallengeId) -> bool {
        self.snapshot().contains(id)
    }

    /// Challenges that directly depend on `id`
    pub fn dependents(&self, id: ChallengeId) -> BTreeSet<ChallengeId> {
        self.snapshot().dependents(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a candidate against `graph` without modifying anything.
///
/// Order: self-reference, unknown predecessors, lifetime, reachability,
/// then existence. A cycle is reported even when the id already exists.
fn validate(graph: &GraphSnapshot, challenge: &Challenge, mode: Mode) -> StorylineResult<()> {
    let id = challenge.id;

    if mode == Mode::Replace && !graph.contains(id) {
        return Err(StorylineError::NotFound(id));
    }

    if challenge.predecessors.contains(&id) {
        return Err(StorylineError::CycleDetected { challenge: id, via: id });
    }

    if let Some(missing) = challenge.predecessors.iter().find(|p| !graph.contains(**p)) {
        return Err(StorylineError::UnknownPredecessor {
            challenge: id,
            predecessor: *missing,
        });
    }

    if challenge.max_lifetime == Some(0) {
        return Err(StorylineError::InvalidLifetime {
            challenge: id,
            minutes: 0,
        });
    }

    // The challenge must not be an ancestor of any of its new predecessors
    if let Some(via) = graph.reaches(challenge.predecessors.iter().copied(), id) {
        return Err(StorylineError::CycleDetected { challenge: id, via });
    }

    if mode == Mode::Insert && graph.contains(id) {
        return Err(StorylineError::DuplicateChallenge(id));
    }

    Ok(())
}

/// Explain why no challenge in a batch could be placed
fn diagnose_blocked(graph: &GraphSnapshot, blocked: &[Challenge]) -> StorylineError {
    let batch: BTreeSet<ChallengeId> = blocked.iter().map(|c| c.id).collect();

    for challenge in blocked {
        if challenge.predecessors.contains(&challenge.id) {
            return StorylineError::CycleDetected {
                challenge: challenge.id,
                via: challenge.id,
            };
        }
        if let Some(missing) = challenge
            .predecessors
            .iter()
            .find(|p| !graph.contains(**p) && !batch.contains(*p))
        {
            return StorylineError::UnknownPredecessor {
                challenge: challenge.id,
                predecessor: *missing,
            };
        }
    }

    // Every blocker is inside the batch, so the remaining nodes form a cycle
    let first = &blocked[0];
    let via = first
        .predecessors
        .iter()
        .find(|p| batch.contains(*p))
        .copied()
        .unwrap_or(first.id);
    StorylineError::CycleDetected {
        challenge: first.id,
        via,
    }
}

fn log_outcome(action: &str, id: ChallengeId, result: &StorylineResult<((), u64)>) {
    match result {
        Ok((_, version)) => info!(challenge = %id, version, "Applied challenge {}", action),
        Err(e) => debug!(challenge = %id, error = %e, "Rejected challenge {}", action),
    }
}

#[cfg(test)]
mod tests;
