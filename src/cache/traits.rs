//! Unified cache trait for coordinated invalidation
//!
//! Every derived-state cache implements this trait so a graph mutation can
//! invalidate all of them through one call.

use std::sync::Arc;

/// Common interface for cache layers
pub trait CacheLayer: Send + Sync {
    /// Name of this cache layer (for logging)
    fn name(&self) -> &str;

    /// Check if this cache has any data
    fn is_populated(&self) -> bool;

    /// Drop everything
    fn invalidate_all(&self);
}

/// Fans invalidation out to every registered layer
pub struct CacheCoordinator {
    layers: Vec<Arc<dyn CacheLayer>>,
}

impl CacheCoordinator {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn register(&mut self, layer: Arc<dyn CacheLayer>) {
        tracing::debug!("Registered cache layer: {}", layer.name());
        self.layers.push(layer);
    }

    /// Called after every applied graph mutation
    pub fn invalidate_all(&self) {
        for layer in &self.layers {
            layer.invalidate_all();
            tracing::debug!("Invalidated all data in cache layer: {}", layer.name());
        }
    }

    pub fn all_populated(&self) -> bool {
        self.layers.iter().all(|l| l.is_populated())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for CacheCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
