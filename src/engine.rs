//! Storyline engine: wires the graph store, solve processor, description
//! store, caches and query facade together.

use crate::cache::{CacheCoordinator, FrontierCache};
use crate::config::StorylineConfig;
use crate::descriptions::SolutionDescriptionStore;
use crate::error::StorylineResult;
use crate::graph::{GraphSnapshot, GraphStore};
use crate::models::{Challenge, ChallengeId, PlayerId, PlayerSolveRecord};
use crate::query::GraphQueryFacade;
use crate::solves::{SolveEventProcessor, SolveOutcome};
use crate::storage::{PersistedState, StorylineDb};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

pub struct Storyline {
    config: StorylineConfig,
    graph: Arc<GraphStore>,
    frontier: Arc<FrontierCache>,
    caches: CacheCoordinator,
    solves: Arc<SolveEventProcessor>,
    descriptions: Arc<SolutionDescriptionStore>,
    queries: GraphQueryFacade,
}

impl Storyline {
    pub fn new() -> Self {
        Self::with_config(StorylineConfig::default())
    }

    pub fn with_config(config: StorylineConfig) -> Self {
        let graph = Arc::new(GraphStore::new());
        let frontier = Arc::new(FrontierCache::with_enabled(config.evaluator.cache));

        let mut caches = CacheCoordinator::new();
        caches.register(frontier.clone());

        let solves = Arc::new(SolveEventProcessor::new(graph.clone(), frontier.clone()));
        let descriptions = Arc::new(
            SolutionDescriptionStore::new(graph.clone(), solves.clone())
                .with_max_length(config.descriptions.limit()),
        );
        let queries = GraphQueryFacade::new(graph.clone(), solves.clone(), descriptions.clone());

        Self {
            config,
            graph,
            frontier,
            caches,
            solves,
            descriptions,
            queries,
        }
    }

    pub fn config(&self) -> &StorylineConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.graph.snapshot()
    }

    pub fn solves(&self) -> &SolveEventProcessor {
        &self.solves
    }

    pub fn descriptions(&self) -> &SolutionDescriptionStore {
        &self.descriptions
    }

    pub fn queries(&self) -> &GraphQueryFacade {
        &self.queries
    }

    pub fn frontier(&self) -> &FrontierCache {
        &self.frontier
    }

    // ==================== Admin ====================

    pub fn add_challenge(&self, challenge: Challenge) -> StorylineResult<u64> {
        let version = self.graph.add_challenge(challenge)?;
        self.caches.invalidate_all();
        Ok(version)
    }

    pub fn update_challenge(&self, challenge: Challenge) -> StorylineResult<u64> {
        let version = self.graph.update_challenge(challenge)?;
        self.caches.invalidate_all();
        Ok(version)
    }

    /// Delete a challenge, its edges and its solution descriptions.
    ///
    /// Solve records of the challenge are kept; views ignore them.
    pub fn remove_challenge(&self, id: ChallengeId) -> StorylineResult<Challenge> {
        let removed = self.graph.remove_challenge(id)?;
        self.descriptions.purge_challenge(id);
        self.caches.invalidate_all();
        Ok(removed)
    }

    /// Add a whole storyline at once, in any order
    pub fn import_challenges(&self, challenges: Vec<Challenge>) -> StorylineResult<u64> {
        let version = self.graph.add_challenges(challenges)?;
        self.caches.invalidate_all();
        Ok(version)
    }

    // ==================== Players ====================

    pub fn record_solve(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
    ) -> StorylineResult<SolveOutcome> {
        self.solves.record_solve(player, challenge)
    }

    pub fn record_solve_at(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
        at: DateTime<Utc>,
    ) -> StorylineResult<SolveOutcome> {
        self.solves.record_solve_at(player, challenge, at)
    }

    pub fn submit_description(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
        text: &str,
    ) -> StorylineResult<()> {
        self.descriptions.submit_description(player, challenge, text)
    }

    pub fn get_description(&self, player: PlayerId, challenge: ChallengeId) -> Option<String> {
        self.descriptions.get_description(player, challenge)
    }

    pub fn finalize_description(
        &self,
        player: PlayerId,
        challenge: ChallengeId,
    ) -> StorylineResult<()> {
        self.descriptions.finalize(player, challenge)
    }

    // ==================== Persistence ====================

    pub fn export_state(&self) -> PersistedState {
        let graph = self.graph.snapshot();
        PersistedState {
            graph_version: graph.version(),
            challenges: graph.challenges().cloned().collect(),
            solves: self.solves.all_records(),
            descriptions: self.descriptions.all(),
        }
    }

    /// Rebuild a storyline from persisted state.
    ///
    /// Challenges go back through store validation in topological order, so
    /// a tampered database is rejected rather than published. The graph
    /// version resumes from the stored one.
    pub fn from_state(config: StorylineConfig, state: PersistedState) -> Result<Self> {
        let storyline = Self::with_config(config);

        let raw = GraphSnapshot::from_unchecked(state.challenges);
        let order = raw
            .topological_order()
            .map_err(|id| anyhow::anyhow!("Stored storyline has a cycle through challenge {}", id))?;
        let ordered: Vec<Challenge> = order
            .into_iter()
            .filter_map(|id| raw.get(id).cloned())
            .collect();

        if !ordered.is_empty() {
            storyline
                .import_challenges(ordered)
                .context("Stored storyline failed validation")?;
        }
        let version = storyline.graph.restore_version(state.graph_version);

        let solves = storyline.solves.restore_records(state.solves);
        let descriptions = state.descriptions.len();
        storyline.descriptions.restore(state.descriptions);

        info!(
            version,
            challenges = storyline.graph.len(),
            solves,
            descriptions,
            "Restored storyline"
        );
        Ok(storyline)
    }

    pub fn load(db: &StorylineDb, config: StorylineConfig) -> Result<Self> {
        let state = db
            .load()
            .with_context(|| format!("Failed to read {}", db.path().display()))?;
        Self::from_state(config, state)
    }

    pub fn save(&self, db: &StorylineDb) -> Result<()> {
        db.save(&self.export_state())
            .with_context(|| format!("Failed to write {}", db.path().display()))
    }

    pub fn records(&self, player: PlayerId) -> Vec<PlayerSolveRecord> {
        self.solves.records(player)
    }
}

impl Default for Storyline {
    fn default() -> Self {
        Self::new()
    }
}
