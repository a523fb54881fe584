//! In-memory graph storage with merge-by-key semantics
//!
//! Nodes are addressed by their [`NodeKey`] (label, key property, relational
//! id), edges by (type, source, target). Both indices make every merge an
//! O(1) lookup followed by either an insert or an in-place update, which is
//! what keeps repeated migrations from producing duplicates.

use super::edge::Edge;
use super::node::Node;
use super::property::PropertyMap;
use super::snapshot::GraphSnapshot;
use super::target::{GraphTarget, NodeMergeOutcome, RelationshipMergeOutcome};
use super::types::{EdgeId, EdgeType, Label, NodeId, NodeKey};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Label must not be empty")]
    EmptyLabel,

    #[error("Relationship type must not be empty")]
    EmptyEdgeType,

    #[error("Label {label} is keyed by '{expected}', merge used '{found}'")]
    KeyPropertyMismatch {
        label: Label,
        expected: String,
        found: String,
    },

    #[error("Snapshot is inconsistent: {0}")]
    InconsistentSnapshot(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Node and edge counts, broken down by label and relationship type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_label: BTreeMap<String, usize>,
    pub edges_by_type: BTreeMap<String, usize>,
}

/// In-memory graph storage
///
/// - nodes: dense arena, `NodeId(n)` lives at index `n - 1`
/// - edges: dense arena, `EdgeId(n)` lives at index `n - 1`
/// - outgoing / incoming: adjacency lists parallel to `nodes`
/// - key_index: NodeKey -> NodeId (merge identity)
/// - edge_index: (type, source, target) -> EdgeId (no parallel duplicates)
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,

    label_index: FxHashMap<Label, Vec<NodeId>>,
    edge_type_index: FxHashMap<EdgeType, Vec<EdgeId>>,

    /// Key property each label was first merged with
    key_properties: FxHashMap<Label, String>,
    key_index: FxHashMap<NodeKey, NodeId>,
    edge_index: FxHashMap<(EdgeType, NodeId, NodeId), EdgeId>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create-if-absent, else overwrite the given properties.
    pub fn merge_node(
        &mut self,
        key: &NodeKey,
        properties: PropertyMap,
    ) -> GraphResult<NodeMergeOutcome> {
        if key.label.as_str().is_empty() {
            return Err(GraphError::EmptyLabel);
        }
        self.check_key_property(key)?;

        if let Some(&id) = self.key_index.get(key) {
            let node = self.node_slot_mut(id)?;
            return Ok(if node.apply_properties(properties) {
                NodeMergeOutcome::Updated
            } else {
                NodeMergeOutcome::Unchanged
            });
        }

        let id = NodeId::new(self.nodes.len() as u64 + 1);
        let mut node = Node::new(id, key);
        node.apply_properties(properties);

        self.key_properties
            .entry(key.label.clone())
            .or_insert_with(|| key.property.clone());
        self.label_index.entry(key.label.clone()).or_default().push(id);
        self.key_index.insert(key.clone(), id);
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());

        debug!(node = %key, "created node");
        Ok(NodeMergeOutcome::Created)
    }

    /// Match both endpoints by key, then create the edge unless an edge of
    /// the same type already joins them. A missing endpoint is not an error.
    pub fn merge_relationship(
        &mut self,
        edge_type: &EdgeType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> GraphResult<RelationshipMergeOutcome> {
        if edge_type.as_str().is_empty() {
            return Err(GraphError::EmptyEdgeType);
        }

        let Some(&source) = self.key_index.get(from) else {
            return Ok(RelationshipMergeOutcome::MissingEndpoint(from.clone()));
        };
        let Some(&target) = self.key_index.get(to) else {
            return Ok(RelationshipMergeOutcome::MissingEndpoint(to.clone()));
        };

        let index_key = (edge_type.clone(), source, target);
        if self.edge_index.contains_key(&index_key) {
            return Ok(RelationshipMergeOutcome::Existing);
        }

        let id = EdgeId::new(self.edges.len() as u64 + 1);
        self.insert_edge(Edge::new(id, source, target, edge_type.clone()));
        Ok(RelationshipMergeOutcome::Created)
    }

    fn check_key_property(&self, key: &NodeKey) -> GraphResult<()> {
        match self.key_properties.get(&key.label) {
            Some(expected) if expected != &key.property => Err(GraphError::KeyPropertyMismatch {
                label: key.label.clone(),
                expected: expected.clone(),
                found: key.property.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn node_slot_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        let idx = (id.as_u64() as usize)
            .checked_sub(1)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.nodes.get_mut(idx).ok_or(GraphError::NodeNotFound(id))
    }

    fn insert_edge(&mut self, edge: Edge) {
        let id = edge.id;
        let source_idx = edge.source.as_u64() as usize - 1;
        let target_idx = edge.target.as_u64() as usize - 1;

        self.outgoing[source_idx].push(id);
        self.incoming[target_idx].push(id);
        self.edge_type_index
            .entry(edge.edge_type.clone())
            .or_default()
            .push(id);
        self.edge_index
            .insert((edge.edge_type.clone(), edge.source, edge.target), id);
        self.edges.push(edge);
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        let idx = (id.as_u64() as usize).checked_sub(1)?;
        self.nodes.get(idx)
    }

    /// Look a node up by its merge key
    pub fn find_node(&self, key: &NodeKey) -> Option<&Node> {
        self.key_index.get(key).and_then(|&id| self.get_node(id))
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        let idx = (id.as_u64() as usize).checked_sub(1)?;
        self.edges.get(idx)
    }

    /// True if an edge of `edge_type` runs from `from` to `to`
    pub fn has_relationship(&self, edge_type: &EdgeType, from: &NodeKey, to: &NodeKey) -> bool {
        match (self.key_index.get(from), self.key_index.get(to)) {
            (Some(&source), Some(&target)) => self
                .edge_index
                .contains_key(&(edge_type.clone(), source, target)),
            _ => false,
        }
    }

    /// Get all outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacent(&self.outgoing, node_id)
    }

    /// Get all incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacent(&self.incoming, node_id)
    }

    fn adjacent<'a>(&'a self, lists: &'a [Vec<EdgeId>], node_id: NodeId) -> Vec<&'a Edge> {
        (node_id.as_u64() as usize)
            .checked_sub(1)
            .and_then(|idx| lists.get(idx))
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all nodes with a specific label
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Get all edges of a specific type
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            nodes_by_label: self
                .label_index
                .iter()
                .map(|(label, ids)| (label.as_str().to_string(), ids.len()))
                .collect(),
            edges_by_type: self
                .edge_type_index
                .iter()
                .map(|(edge_type, ids)| (edge_type.as_str().to_string(), ids.len()))
                .collect(),
        }
    }

    /// Clear all data from the graph
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Copy the graph into a serializable snapshot
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(self.nodes.clone(), self.edges.clone())
    }

    /// Rebuild a store, indices included, from a snapshot.
    ///
    /// Ids must be dense and ordered, and every node must still carry its
    /// key property, otherwise later merges could not find it.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let mut store = GraphStore::new();

        for (idx, node) in snapshot.nodes.into_iter().enumerate() {
            if node.id.as_u64() != idx as u64 + 1 {
                return Err(GraphError::InconsistentSnapshot(format!(
                    "expected node id {}, found {}",
                    idx + 1,
                    node.id
                )));
            }
            let key = node.key().ok_or_else(|| {
                GraphError::InconsistentSnapshot(format!(
                    "{} has no integer '{}' property",
                    node.id, node.key_property
                ))
            })?;
            store.check_key_property(&key)?;
            if store.key_index.contains_key(&key) {
                return Err(GraphError::InconsistentSnapshot(format!(
                    "duplicate node key {}",
                    key
                )));
            }
            store
                .key_properties
                .entry(key.label.clone())
                .or_insert_with(|| key.property.clone());
            store.label_index.entry(key.label.clone()).or_default().push(node.id);
            store.key_index.insert(key, node.id);
            store.nodes.push(node);
            store.outgoing.push(Vec::new());
            store.incoming.push(Vec::new());
        }

        for (idx, edge) in snapshot.edges.into_iter().enumerate() {
            if edge.id.as_u64() != idx as u64 + 1 {
                return Err(GraphError::InconsistentSnapshot(format!(
                    "expected edge id {}, found {}",
                    idx + 1,
                    edge.id
                )));
            }
            if store.get_node(edge.source).is_none() {
                return Err(GraphError::NodeNotFound(edge.source));
            }
            if store.get_node(edge.target).is_none() {
                return Err(GraphError::NodeNotFound(edge.target));
            }
            let index_key = (edge.edge_type.clone(), edge.source, edge.target);
            if store.edge_index.contains_key(&index_key) {
                return Err(GraphError::InconsistentSnapshot(format!(
                    "duplicate {} edge between {} and {}",
                    edge.edge_type, edge.source, edge.target
                )));
            }
            store.insert_edge(edge);
        }

        Ok(store)
    }
}

impl GraphTarget for GraphStore {
    fn merge_node(
        &mut self,
        key: &NodeKey,
        properties: PropertyMap,
    ) -> GraphResult<NodeMergeOutcome> {
        GraphStore::merge_node(self, key, properties)
    }

    fn merge_relationship(
        &mut self,
        edge_type: &EdgeType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> GraphResult<RelationshipMergeOutcome> {
        GraphStore::merge_relationship(self, edge_type, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(id: i64) -> NodeKey {
        NodeKey::new("Author", "author_id", id)
    }

    fn book(id: i64) -> NodeKey {
        NodeKey::new("Book", "book_id", id)
    }

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), (*v).into()))
            .collect()
    }

    #[test]
    fn test_merge_node_is_idempotent() {
        let mut store = GraphStore::new();

        let first = store.merge_node(&author(1), props(&[("name", "Jane Doe")])).unwrap();
        let second = store.merge_node(&author(1), props(&[("name", "Jane Doe")])).unwrap();

        assert_eq!(first, NodeMergeOutcome::Created);
        assert_eq!(second, NodeMergeOutcome::Unchanged);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_merge_node_overwrites_properties() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), props(&[("name", "J. Doe")])).unwrap();
        let outcome = store.merge_node(&author(1), props(&[("name", "Jane Doe")])).unwrap();

        assert_eq!(outcome, NodeMergeOutcome::Updated);
        let node = store.find_node(&author(1)).unwrap();
        assert_eq!(node.get_property("name").unwrap().as_string(), Some("Jane Doe"));
        assert_eq!(node.get_property("author_id").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn test_same_id_different_label_are_distinct() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), PropertyMap::new()).unwrap();
        store.merge_node(&book(1), PropertyMap::new()).unwrap();

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.get_nodes_by_label(&Label::new("Author")).len(), 1);
        assert_eq!(store.get_nodes_by_label(&Label::new("Book")).len(), 1);
    }

    #[test]
    fn test_key_property_mismatch() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), PropertyMap::new()).unwrap();

        let err = store
            .merge_node(&NodeKey::new("Author", "id", 2), PropertyMap::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::KeyPropertyMismatch { .. }));
    }

    #[test]
    fn test_merge_relationship_no_parallel_duplicates() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), PropertyMap::new()).unwrap();
        store.merge_node(&book(1), PropertyMap::new()).unwrap();
        let wrote = EdgeType::new("WROTE");

        let first = store.merge_relationship(&wrote, &author(1), &book(1)).unwrap();
        let second = store.merge_relationship(&wrote, &author(1), &book(1)).unwrap();

        assert_eq!(first, RelationshipMergeOutcome::Created);
        assert_eq!(second, RelationshipMergeOutcome::Existing);
        assert_eq!(store.edge_count(), 1);
        assert!(store.has_relationship(&wrote, &author(1), &book(1)));
        assert!(!store.has_relationship(&wrote, &book(1), &author(1)));
    }

    #[test]
    fn test_merge_relationship_missing_endpoint() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), PropertyMap::new()).unwrap();

        let outcome = store
            .merge_relationship(&EdgeType::new("WROTE"), &author(1), &book(9))
            .unwrap();

        assert_eq!(outcome, RelationshipMergeOutcome::MissingEndpoint(book(9)));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_adjacency_and_type_index() {
        let mut store = GraphStore::new();
        for id in 1..=2 {
            store.merge_node(&author(id), PropertyMap::new()).unwrap();
        }
        store.merge_node(&book(1), PropertyMap::new()).unwrap();
        let wrote = EdgeType::new("WROTE");
        store.merge_relationship(&wrote, &author(1), &book(1)).unwrap();
        store.merge_relationship(&wrote, &author(2), &book(1)).unwrap();

        let book_node = store.find_node(&book(1)).unwrap().id;
        let author_node = store.find_node(&author(1)).unwrap().id;
        assert_eq!(store.get_incoming_edges(book_node).len(), 2);
        assert_eq!(store.get_outgoing_edges(author_node).len(), 1);
        assert_eq!(store.get_edges_by_type(&wrote).len(), 2);

        let stats = store.statistics();
        assert_eq!(stats.nodes_by_label.get("Author"), Some(&2));
        assert_eq!(stats.edges_by_type.get("WROTE"), Some(&2));
    }

    #[test]
    fn test_snapshot_rebuilds_indices() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), props(&[("name", "Jane Doe")])).unwrap();
        store.merge_node(&book(1), props(&[("title", "Physics 101")])).unwrap();
        store
            .merge_relationship(&EdgeType::new("WROTE"), &author(1), &book(1))
            .unwrap();

        let mut restored = GraphStore::from_snapshot(store.to_snapshot()).unwrap();
        assert_eq!(restored.statistics(), store.statistics());

        // Merges against the restored store still hit the same nodes
        let outcome = restored.merge_node(&author(1), props(&[("name", "Jane Doe")])).unwrap();
        assert_eq!(outcome, NodeMergeOutcome::Unchanged);
        let edge = restored
            .merge_relationship(&EdgeType::new("WROTE"), &author(1), &book(1))
            .unwrap();
        assert_eq!(edge, RelationshipMergeOutcome::Existing);
    }

    #[test]
    fn test_snapshot_rejects_duplicate_keys() {
        let mut store = GraphStore::new();
        store.merge_node(&author(1), PropertyMap::new()).unwrap();
        let mut snapshot = store.to_snapshot();
        let mut copy = snapshot.nodes[0].clone();
        copy.id = NodeId::new(2);
        snapshot.nodes.push(copy);

        let err = GraphStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, GraphError::InconsistentSnapshot(_)));
    }
}
