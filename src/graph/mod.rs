//! Storyline dependency graph
//!
//! `GraphStore` owns the canonical graph and publishes immutable
//! `GraphSnapshot`s. Everything else holds snapshots or ids.

pub mod snapshot;
pub mod store;
pub mod traits;

pub use snapshot::GraphSnapshot;
pub use store::GraphStore;
pub use traits::{FixedGraph, GraphSource};
