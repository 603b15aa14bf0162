//! Snapshot source trait for graph consumers

use super::{GraphSnapshot, GraphStore};
use std::sync::Arc;

/// Anything that can hand out the current graph snapshot.
///
/// The solve processor and query facade depend on this rather than on
/// `GraphStore` directly, so they can run against a fixed snapshot too.
pub trait GraphSource: Send + Sync {
    fn snapshot(&self) -> Arc<GraphSnapshot>;
}

impl GraphSource for GraphStore {
    fn snapshot(&self) -> Arc<GraphSnapshot> {
        GraphStore::snapshot(self)
    }
}

/// A frozen graph, useful for previews and tests
pub struct FixedGraph(pub Arc<GraphSnapshot>);

impl GraphSource for FixedGraph {
    fn snapshot(&self) -> Arc<GraphSnapshot> {
        Arc::clone(&self.0)
    }
}
