//! Solution descriptions
//!
//! After solving a challenge a player may leave a free-text description of
//! how they solved it. The window stays open (resubmission replaces the
//! text) until the description is finalized.

use crate::error::{StorylineError, StorylineResult};
use crate::graph::GraphSource;
use crate::models::{ChallengeId, PlayerId, SolutionDescription};
use crate::solves::SolveEventProcessor;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SolutionDescriptionStore {
    graph: Arc<dyn GraphSource>,
    solves: Arc<SolveEventProcessor>,
    entries: DashMap<(PlayerId, ChallengeId), SolutionDescription>,
    /// Character limit on trimmed text (None = unlimited)
    max_length: Option<usize>,
}

impl SolutionDescriptionStore {
    pub fn new(graph: Arc<dyn GraphSource>, solves: Arc<SolveEventProcessor>) -> Self {
        Self {
            graph,
            solves,
            entries: DashMap::new(),
            max_length: None,
        }
    }

    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    /// Create or replace the player's description for a solved challenge
    pub fn submit_description(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
        text: &str,
    ) -> StorylineResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StorylineError::EmptyDescription);
        }
        if let Some(max) = self.max_length {
            let len = text.chars().count();
            if len > max {
                return Err(StorylineError::DescriptionTooLong { len, max });
            }
        }
        // Solve records outlive their challenge; descriptions do not
        if !self.graph.snapshot().contains(challenge) {
            return Err(StorylineError::NotFound(challenge));
        }
        if !self.solves.is_solved(player, challenge) {
            return Err(StorylineError::NotSolved { player, challenge });
        }

        let description = SolutionDescription {
            player,
            challenge,
            text: text.to_string(),
            submitted_at: Utc::now(),
            finalized: false,
        };

        match self.entries.entry((player, challenge)) {
            Entry::Occupied(mut existing) => {
                if existing.get().finalized {
                    return Err(StorylineError::DescriptionFinalized { player, challenge });
                }
                existing.insert(description);
                debug!(player = %player, challenge = %challenge, "Replaced solution description");
            }
            Entry::Vacant(slot) => {
                slot.insert(description);
                info!(player = %player, challenge = %challenge, "Stored solution description");
            }
        }
        Ok(())
    }

    /// Description text, if one was submitted
    pub fn get_description(&self, player: PlayerId, challenge: ChallengeId) -> Option<String> {
        self.entries
            .get(&(player, challenge))
            .map(|d| d.text.clone())
    }

    pub fn get(&self, player: PlayerId, challenge: ChallengeId) -> Option<SolutionDescription> {
        self.entries.get(&(player, challenge)).map(|d| d.value().clone())
    }

    /// Close the submission window. Finalizing twice is a no-op.
    pub fn finalize(&self, player: PlayerId, challenge: ChallengeId) -> StorylineResult<()> {
        let mut entry = self
            .entries
            .get_mut(&(player, challenge))
            .ok_or(StorylineError::DescriptionMissing { player, challenge })?;
        if !entry.finalized {
            entry.finalized = true;
            info!(player = %player, challenge = %challenge, "Finalized solution description");
        }
        Ok(())
    }

    /// Every description, ordered by challenge then player
    pub fn all(&self) -> Vec<SolutionDescription> {
        let mut all: Vec<SolutionDescription> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|d| (d.challenge, d.player));
        all
    }

    /// Drop descriptions of a deleted challenge. Returns how many were removed.
    pub fn purge_challenge(&self, challenge: ChallengeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, c), _| *c != challenge);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(challenge = %challenge, removed, "Purged solution descriptions");
        }
        removed
    }

    /// Load persisted descriptions as-is
    pub fn restore(&self, descriptions: Vec<SolutionDescription>) {
        for d in descriptions {
            self.entries.insert((d.player, d.challenge), d);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FrontierCache;
    use crate::graph::GraphStore;
    use crate::models::Challenge;

    const P: PlayerId = PlayerId(1);
    const C: ChallengeId = ChallengeId(1);

    fn store_with_graph() -> (Arc<GraphStore>, SolutionDescriptionStore) {
        let graph = Arc::new(GraphStore::new());
        graph
            .add_challenges(vec![Challenge::new(1, "a"), Challenge::new(2, "b")])
            .unwrap();
        let solves = Arc::new(SolveEventProcessor::new(
            graph.clone(),
            Arc::new(FrontierCache::new()),
        ));
        solves.record_solve(P, C).unwrap();
        let store = SolutionDescriptionStore::new(graph.clone(), solves).with_max_length(Some(20));
        (graph, store)
    }

    fn store() -> SolutionDescriptionStore {
        store_with_graph().1
    }

    #[test]
    fn test_requires_solve() {
        let store = store();
        let err = store
            .submit_description(P, ChallengeId(2), "did it")
            .unwrap_err();
        assert_eq!(
            err,
            StorylineError::NotSolved {
                player: P,
                challenge: ChallengeId(2)
            }
        );
        assert_eq!(store.get_description(P, ChallengeId(2)), None);
    }

    #[test]
    fn test_upsert_replaces_text() {
        let store = store();
        store.submit_description(P, C, "  first  ").unwrap();
        assert_eq!(store.get_description(P, C).as_deref(), Some("first"));

        store.submit_description(P, C, "second").unwrap();
        assert_eq!(store.get_description(P, C).as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rejects_empty_and_long_text() {
        let store = store();
        assert_eq!(
            store.submit_description(P, C, "   \n"),
            Err(StorylineError::EmptyDescription)
        );
        assert_eq!(
            store.submit_description(P, C, &"x".repeat(21)),
            Err(StorylineError::DescriptionTooLong { len: 21, max: 20 })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_finalize_closes_window() {
        let store = store();
        assert_eq!(
            store.finalize(P, C),
            Err(StorylineError::DescriptionMissing {
                player: P,
                challenge: C
            })
        );

        store.submit_description(P, C, "done").unwrap();
        store.finalize(P, C).unwrap();
        store.finalize(P, C).unwrap();

        let err = store.submit_description(P, C, "again").unwrap_err();
        assert_eq!(err.code(), "description_finalized");
        assert_eq!(store.get_description(P, C).as_deref(), Some("done"));
    }

    #[test]
    fn test_purge_challenge() {
        let store = store();
        store.submit_description(P, C, "done").unwrap();
        assert_eq!(store.purge_challenge(ChallengeId(2)), 0);
        assert_eq!(store.purge_challenge(C), 1);
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_deleted_challenge_rejects_description() {
        let (graph, store) = store_with_graph();
        graph.remove_challenge(C).unwrap();

        assert_eq!(
            store.submit_description(P, C, "ghost"),
            Err(StorylineError::NotFound(C))
        );
        assert_eq!(store.get_description(P, C), None);
        assert!(store.is_empty());
    }
}
