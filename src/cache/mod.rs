//! Per-player frontier cache
//!
//! Memoizes unlocked sets keyed by (player, graph version, solved-set
//! version). An entry whose versions no longer match is recomputed on the
//! next lookup, so explicit invalidation only reclaims memory early.

pub mod traits;

pub use traits::{CacheCoordinator, CacheLayer};

use crate::graph::GraphSnapshot;
use crate::models::PlayerId;
use crate::unlock::{SolvedSet, UnlockEvaluator};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct CachedFrontier {
    graph_version: u64,
    solved_version: u64,
    unlocked: Arc<SolvedSet>,
}

/// Hit/miss counters, reported by `storyline status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe unlocked-set cache
pub struct FrontierCache {
    entries: DashMap<PlayerId, CachedFrontier>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FrontierCache {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// A disabled cache always recomputes and never stores
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached unlocked set for `player`, computing it on a version mismatch
    pub fn get_or_compute(
        &self,
        player: PlayerId,
        graph: &GraphSnapshot,
        solved_version: u64,
        solved: &SolvedSet,
    ) -> Arc<SolvedSet> {
        if self.enabled {
            if let Some(entry) = self.entries.get(&player) {
                if entry.graph_version == graph.version() && entry.solved_version == solved_version
                {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Arc::clone(&entry.unlocked);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let unlocked = Arc::new(UnlockEvaluator::unlocked_set(solved, graph));

        if self.enabled {
            self.entries.insert(
                player,
                CachedFrontier {
                    graph_version: graph.version(),
                    solved_version,
                    unlocked: Arc::clone(&unlocked),
                },
            );
        }

        unlocked
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for FrontierCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheLayer for FrontierCache {
    fn name(&self) -> &str {
        "frontier"
    }

    fn is_populated(&self) -> bool {
        !self.entries.is_empty()
    }

    fn invalidate_all(&self) {
        self.entries.clear();
    }
}
