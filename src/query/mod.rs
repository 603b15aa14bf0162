//! Read-only projections of the storyline for admins and players
//!
//! Every query works against a single graph snapshot and a single copy of
//! the player's solve state, so a view is always internally consistent even
//! while mutations and solves run concurrently.

pub mod integrity;
pub mod views;

pub use integrity::{IntegrityIssue, IntegrityReport};
pub use views::{
    AdminChallenge, AdminGraph, AdminView, GraphEdge, PlayerChallenge, PlayerProgress,
    PlayerView, StorylineStats,
};

use crate::descriptions::SolutionDescriptionStore;
use crate::graph::{GraphSnapshot, GraphSource};
use crate::models::{ChallengeId, ChallengeStatus, PlayerId, SolutionDescription};
use crate::solves::SolveEventProcessor;
use crate::unlock::{expired_set, minutes_remaining};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

pub struct GraphQueryFacade {
    graph: Arc<dyn GraphSource>,
    solves: Arc<SolveEventProcessor>,
    descriptions: Arc<SolutionDescriptionStore>,
}

impl GraphQueryFacade {
    pub fn new(
        graph: Arc<dyn GraphSource>,
        solves: Arc<SolveEventProcessor>,
        descriptions: Arc<SolutionDescriptionStore>,
    ) -> Self {
        Self {
            graph,
            solves,
            descriptions,
        }
    }

    /// Every challenge with its predecessors, plus the candidates an editor
    /// may offer as predecessors of `editing`.
    ///
    /// Candidates exclude `editing` itself and everything that transitively
    /// depends on it, since choosing any of those would close a cycle.
    pub fn admin_view(&self, editing: Option<ChallengeId>) -> AdminView {
        let graph = self.graph.snapshot();

        let excluded = editing
            .map(|id| {
                let mut set = graph.descendants(id);
                set.insert(id);
                set
            })
            .unwrap_or_default();

        AdminView {
            version: graph.version(),
            challenges: graph.challenges().map(AdminChallenge::from).collect(),
            candidate_predecessors: graph.ids().filter(|id| !excluded.contains(id)).collect(),
        }
    }

    pub fn admin_graph(&self) -> AdminGraph {
        let graph = self.graph.snapshot();
        AdminGraph {
            version: graph.version(),
            nodes: graph.challenges().map(AdminChallenge::from).collect(),
            edges: graph.edges().into_iter().map(GraphEdge::from).collect(),
            roots: graph.roots(),
        }
    }

    pub fn player_view(&self, player: PlayerId) -> PlayerView {
        self.player_view_at(player, Utc::now())
    }

    /// Player view evaluated at `now` (timed challenges depend on it)
    pub fn player_view_at(&self, player: PlayerId, now: DateTime<Utc>) -> PlayerView {
        let graph = self.graph.snapshot();
        let state = self.solves.player_state(player);
        let unlocked = self.solves.unlocked_for(player, &graph, &state);
        let times = state.times();
        let expired = expired_set(&times, &graph, now);

        let challenges = graph
            .challenges()
            .map(|c| {
                let status = if state.records.contains_key(&c.id) {
                    ChallengeStatus::Solved
                } else if !unlocked.contains(&c.id) {
                    ChallengeStatus::Locked
                } else if expired.contains(&c.id) {
                    ChallengeStatus::Expired
                } else {
                    ChallengeStatus::Unlocked
                };

                let visible = status.is_visible();
                PlayerChallenge {
                    challenge_id: c.id,
                    status,
                    predecessor_ids: c.predecessors.iter().copied().collect(),
                    name: visible.then(|| c.name.clone()),
                    category: if visible { c.category.clone() } else { None },
                    minutes_remaining: if status == ChallengeStatus::Unlocked {
                        minutes_remaining(c, &times, now)
                    } else {
                        None
                    },
                }
            })
            .collect();

        PlayerView {
            player,
            version: graph.version(),
            challenges,
            edges: graph.edges().into_iter().map(GraphEdge::from).collect(),
        }
    }

    pub fn progress(&self, player: PlayerId) -> PlayerProgress {
        let graph = self.graph.snapshot();
        self.progress_in(&graph, player, Utc::now())
    }

    fn progress_in(
        &self,
        graph: &GraphSnapshot,
        player: PlayerId,
        now: DateTime<Utc>,
    ) -> PlayerProgress {
        let state = self.solves.player_state(player);
        let unlocked = self.solves.unlocked_for(player, graph, &state);
        let times = state.times();

        // Records of deleted challenges are kept but never counted
        let solved: Vec<ChallengeId> = state
            .records
            .keys()
            .copied()
            .filter(|id| graph.contains(*id))
            .collect();
        let expired_count = expired_set(&times, graph, now)
            .intersection(&unlocked)
            .count();

        let total = graph.len();
        let progress_percentage = if total > 0 {
            (solved.len() as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        PlayerProgress {
            player,
            unlocked_count: unlocked.len(),
            solved_count: solved.len(),
            expired_count,
            total_challenges: total,
            progress_percentage,
            unlocked: unlocked.iter().copied().collect(),
            solved,
        }
    }

    /// Progress of every player with a solve on a live challenge, computed in parallel
    pub fn progress_report(&self) -> Vec<PlayerProgress> {
        let graph = self.graph.snapshot();
        let now = Utc::now();
        self.solves
            .players_in(&graph)
            .par_iter()
            .map(|player| self.progress_in(&graph, *player, now))
            .collect()
    }

    pub fn integrity_report(&self) -> IntegrityReport {
        IntegrityReport::scan(&self.graph.snapshot())
    }

    pub fn stats(&self) -> StorylineStats {
        let graph = self.graph.snapshot();
        StorylineStats {
            version: graph.version(),
            total_challenges: graph.len(),
            root_challenges: graph.roots().len(),
            timed_challenges: graph.challenges().filter(|c| c.is_timed()).count(),
            edges: graph.edge_count(),
            max_depth: max_depth(&graph),
            players: self.solves.players_in(&graph).len(),
            solves: self.solves.solves_in(&graph),
            descriptions: self.descriptions.len(),
        }
    }

    /// Every submitted solution description
    pub fn solutions(&self) -> Vec<SolutionDescription> {
        self.descriptions.all()
    }
}

/// Length of the longest predecessor chain; 0 when the graph is cyclic
fn max_depth(graph: &GraphSnapshot) -> usize {
    let Ok(order) = graph.topological_order() else {
        return 0;
    };

    let mut depth: HashMap<ChallengeId, usize> = HashMap::with_capacity(order.len());
    for id in order {
        let d = graph
            .predecessors(id)
            .into_iter()
            .flatten()
            .filter_map(|p| depth.get(p))
            .max()
            .map_or(1, |d| d + 1);
        depth.insert(id, d);
    }
    depth.into_values().max().unwrap_or(0)
}
