//! Target property graph
//!
//! This module implements the graph side of the migration:
//! - Nodes with one label, keyed by a relational surrogate id
//! - Directed, typed edges, unique per (type, source, target)
//! - In-memory storage with hash-based merge indices
//! - JSON / gzip snapshots for persisting the target between runs

pub mod edge;
pub mod node;
pub mod property;
pub mod snapshot;
pub mod store;
pub mod target;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use snapshot::{GraphSnapshot, SnapshotError, SnapshotResult};
pub use store::{GraphError, GraphResult, GraphStatistics, GraphStore};
pub use target::{
    GraphTarget, NodeMerge, NodeMergeOutcome, RelationshipMerge, RelationshipMergeOutcome,
};
pub use types::{EdgeId, EdgeType, Label, NodeId, NodeKey};
