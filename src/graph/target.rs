//! The write interface the migration pipeline projects into.

use super::property::PropertyMap;
use super::store::GraphResult;
use super::types::{EdgeType, NodeKey};
use serde::{Deserialize, Serialize};

/// Result of merging one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMergeOutcome {
    Created,
    /// Node existed and at least one property changed
    Updated,
    /// Node existed with identical properties
    Unchanged,
}

/// Result of merging one relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipMergeOutcome {
    Created,
    Existing,
    /// The endpoint with this key has not been merged yet; nothing was written
    MissingEndpoint(NodeKey),
}

/// One node merge request
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMerge {
    pub key: NodeKey,
    pub properties: PropertyMap,
}

/// One relationship merge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMerge {
    pub edge_type: EdgeType,
    pub from: NodeKey,
    pub to: NodeKey,
}

/// Graph-oriented store that accepts idempotent merges.
///
/// Implementations must guarantee that replaying any sequence of merges
/// leaves the store unchanged: nodes are unique per key, relationships are
/// unique per (type, from, to).
pub trait GraphTarget {
    /// Create the node if absent, otherwise overwrite the given properties
    fn merge_node(&mut self, key: &NodeKey, properties: PropertyMap)
        -> GraphResult<NodeMergeOutcome>;

    /// Match both endpoints and create the relationship if absent
    fn merge_relationship(
        &mut self,
        edge_type: &EdgeType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> GraphResult<RelationshipMergeOutcome>;

    /// Bulk node merge, one outcome per request in input order.
    ///
    /// A failing request does not stop the rest of the batch.
    fn merge_node_batch(&mut self, batch: Vec<NodeMerge>) -> Vec<GraphResult<NodeMergeOutcome>> {
        batch
            .into_iter()
            .map(|merge| self.merge_node(&merge.key, merge.properties))
            .collect()
    }

    /// Bulk relationship merge, one outcome per request in input order
    fn merge_relationship_batch(
        &mut self,
        batch: &[RelationshipMerge],
    ) -> Vec<GraphResult<RelationshipMergeOutcome>> {
        batch
            .iter()
            .map(|merge| self.merge_relationship(&merge.edge_type, &merge.from, &merge.to))
            .collect()
    }
}

impl<T: GraphTarget + ?Sized> GraphTarget for &mut T {
    fn merge_node(
        &mut self,
        key: &NodeKey,
        properties: PropertyMap,
    ) -> GraphResult<NodeMergeOutcome> {
        (**self).merge_node(key, properties)
    }

    fn merge_relationship(
        &mut self,
        edge_type: &EdgeType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> GraphResult<RelationshipMergeOutcome> {
        (**self).merge_relationship(edge_type, from, to)
    }

    fn merge_node_batch(&mut self, batch: Vec<NodeMerge>) -> Vec<GraphResult<NodeMergeOutcome>> {
        (**self).merge_node_batch(batch)
    }

    fn merge_relationship_batch(
        &mut self,
        batch: &[RelationshipMerge],
    ) -> Vec<GraphResult<RelationshipMergeOutcome>> {
        (**self).merge_relationship_batch(batch)
    }
}
