//! Immutable, versioned view of the storyline graph
//!
//! The forward mapping is challenge -> predecessor set. A reverse index
//! (predecessor -> dependents) is kept alongside it so "what depends on X"
//! is a lookup rather than a scan. Both maps hold ids only.

use crate::models::{Challenge, ChallengeId};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Point-in-time copy of the graph. Cheap to share behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub(crate) version: u64,
    challenges: BTreeMap<ChallengeId, Challenge>,
    dependents: BTreeMap<ChallengeId, BTreeSet<ChallengeId>>,
}

impl GraphSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot with no validation at all.
    ///
    /// Only for linting raw storyline definitions: the result may hold
    /// cycles and dangling predecessors, so it must never be published.
    pub fn from_unchecked(challenges: impl IntoIterator<Item = Challenge>) -> Self {
        let mut graph = Self::empty();
        for challenge in challenges {
            graph.insert(challenge);
        }
        graph
    }

    /// Incremented by every applied mutation; rejected mutations leave it alone
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    pub fn contains(&self, id: ChallengeId) -> bool {
        self.challenges.contains_key(&id)
    }

    pub fn get(&self, id: ChallengeId) -> Option<&Challenge> {
        self.challenges.get(&id)
    }

    /// All challenges in id order
    pub fn challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = ChallengeId> + '_ {
        self.challenges.keys().copied()
    }

    pub fn predecessors(&self, id: ChallengeId) -> Option<&BTreeSet<ChallengeId>> {
        self.challenges.get(&id).map(|c| &c.predecessors)
    }

    /// Challenges that list `id` as a direct predecessor
    pub fn dependents(&self, id: ChallengeId) -> BTreeSet<ChallengeId> {
        self.dependents.get(&id).cloned().unwrap_or_default()
    }

    /// Every edge as (predecessor, challenge)
    pub fn edges(&self) -> Vec<(ChallengeId, ChallengeId)> {
        self.challenges
            .values()
            .flat_map(|c| c.predecessors.iter().map(move |p| (*p, c.id)))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.challenges.values().map(|c| c.predecessors.len()).sum()
    }

    /// Challenges without predecessors (always unlocked)
    pub fn roots(&self) -> Vec<ChallengeId> {
        self.challenges
            .values()
            .filter(|c| c.is_root())
            .map(|c| c.id)
            .collect()
    }

    /// Transitive dependents of `id` (not including `id` itself)
    pub fn descendants(&self, id: ChallengeId) -> BTreeSet<ChallengeId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<ChallengeId> = self.dependents(id).into_iter().collect();

        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                if let Some(deps) = self.dependents.get(&next) {
                    queue.extend(deps.iter().copied());
                }
            }
        }

        seen
    }

    /// BFS along predecessor edges from each of `starts`, looking for `target`.
    ///
    /// Returns the start node through which `target` was reached. Visits each
    /// node at most once, so the cost is O(V + E). Traversal stops at `target`,
    /// which means its own current edges are never followed.
    pub fn reaches<I>(&self, starts: I, target: ChallengeId) -> Option<ChallengeId>
    where
        I: IntoIterator<Item = ChallengeId>,
    {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<(ChallengeId, ChallengeId)> =
            starts.into_iter().map(|s| (s, s)).collect();

        while let Some((node, origin)) = queue.pop_front() {
            if node == target {
                return Some(origin);
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(preds) = self.predecessors(node) {
                queue.extend(preds.iter().map(|p| (*p, origin)));
            }
        }

        None
    }

    /// Build a petgraph view with edges pointing predecessor -> challenge
    pub fn to_digraph(&self) -> (DiGraph<ChallengeId, ()>, HashMap<ChallengeId, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.len(), self.edge_count());
        let mut index = HashMap::with_capacity(self.len());

        for id in self.ids() {
            index.insert(id, graph.add_node(id));
        }
        for (pred, id) in self.edges() {
            if let (Some(&from), Some(&to)) = (index.get(&pred), index.get(&id)) {
                graph.add_edge(from, to, ());
            }
        }

        (graph, index)
    }

    /// Ids ordered so every challenge comes after all of its predecessors.
    ///
    /// Returns the id of a node on a cycle if the graph is not a DAG, which
    /// can only happen for graphs that bypassed store validation.
    pub fn topological_order(&self) -> Result<Vec<ChallengeId>, ChallengeId> {
        let (graph, _) = self.to_digraph();
        toposort(&graph, None)
            .map(|order| order.into_iter().map(|idx| graph[idx]).collect())
            .map_err(|cycle| graph[cycle.node_id()])
    }

    /// Strongly connected components that form cycles (Tarjan, O(V + E)).
    ///
    /// Self-loops count as one-node cycles. Empty for any graph that went
    /// through the store.
    pub fn find_cycles(&self) -> Vec<Vec<ChallengeId>> {
        let (graph, _) = self.to_digraph();

        let mut cycles: Vec<Vec<ChallengeId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || (scc.len() == 1 && graph.contains_edge(scc[0], scc[0]))
            })
            .map(|scc| {
                let mut ids: Vec<ChallengeId> = scc.iter().map(|&idx| graph[idx]).collect();
                ids.sort();
                ids
            })
            .collect();

        cycles.sort();
        cycles
    }

    // ==================== Mutation (store-private) ====================
    //
    // Only the store calls these, and only on its private draft copy after
    // validation has passed.

    /// Insert or replace a challenge, keeping the reverse index in step
    pub(crate) fn insert(&mut self, challenge: Challenge) {
        let id = challenge.id;
        if let Some(old) = self.challenges.remove(&id) {
            for pred in &old.predecessors {
                self.unlink(*pred, id);
            }
        }
        for pred in &challenge.predecessors {
            self.dependents.entry(*pred).or_default().insert(id);
        }
        self.challenges.insert(id, challenge);
    }

    /// Remove a challenge and every edge touching it
    pub(crate) fn remove(&mut self, id: ChallengeId) -> Option<Challenge> {
        let removed = self.challenges.remove(&id)?;

        for pred in &removed.predecessors {
            self.unlink(*pred, id);
        }
        if let Some(dependents) = self.dependents.remove(&id) {
            for dep in dependents {
                if let Some(child) = self.challenges.get_mut(&dep) {
                    child.predecessors.remove(&id);
                }
            }
        }

        Some(removed)
    }

    fn unlink(&mut self, pred: ChallengeId, id: ChallengeId) {
        if let Some(set) = self.dependents.get_mut(&pred) {
            set.remove(&id);
            if set.is_empty() {
                self.dependents.remove(&pred);
            }
        }
    }
}
