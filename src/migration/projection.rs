//! Applies mapped batches to a graph target

use super::mapper::Record;
use crate::graph::{GraphTarget, NodeMerge, NodeMergeOutcome, RelationshipMerge, RelationshipMergeOutcome};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use tracing::{debug, warn};

/// Per-batch (or accumulated per-stage) merge counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub attempted: usize,
    pub succeeded: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Edges whose endpoint has not been migrated; skipped without error
    pub missing_endpoints: usize,
    pub failed: usize,
}

impl AddAssign for BatchCounts {
    fn add_assign(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.missing_endpoints += other.missing_endpoints;
        self.failed += other.failed;
    }
}

/// Issues one bulk node merge and one bulk relationship merge per batch
pub struct ProjectionBuilder<T> {
    target: T,
}

impl<T: GraphTarget> ProjectionBuilder<T> {
    pub fn new(target: T) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Merge every record of `batch`. A failing record is logged and counted;
    /// it never stops the rest of the batch.
    pub fn apply(&mut self, batch: Vec<Record>) -> BatchCounts {
        let mut counts = BatchCounts {
            attempted: batch.len(),
            ..Default::default()
        };

        let (nodes, edges): (Vec<NodeMerge>, Vec<RelationshipMerge>) =
            batch.into_iter().fold((Vec::new(), Vec::new()), |(mut nodes, mut edges), record| {
                match record {
                    Record::Node(merge) => nodes.push(merge),
                    Record::Edge(merge) => edges.push(merge),
                }
                (nodes, edges)
            });

        if !nodes.is_empty() {
            let keys: Vec<_> = nodes.iter().map(|merge| merge.key.clone()).collect();
            for (key, outcome) in keys.iter().zip(self.target.merge_node_batch(nodes)) {
                match outcome {
                    Ok(NodeMergeOutcome::Created) => counts.created += 1,
                    Ok(NodeMergeOutcome::Updated) => counts.updated += 1,
                    Ok(NodeMergeOutcome::Unchanged) => counts.unchanged += 1,
                    Err(e) => {
                        warn!(key = %key, error = %e, "node merge failed, skipping record");
                        counts.failed += 1;
                        continue;
                    }
                }
                counts.succeeded += 1;
            }
        }

        if !edges.is_empty() {
            for (merge, outcome) in edges.iter().zip(self.target.merge_relationship_batch(&edges)) {
                match outcome {
                    Ok(RelationshipMergeOutcome::Created) => counts.created += 1,
                    Ok(RelationshipMergeOutcome::Existing) => counts.unchanged += 1,
                    Ok(RelationshipMergeOutcome::MissingEndpoint(key)) => {
                        debug!(edge_type = %merge.edge_type, missing = %key, "endpoint not migrated");
                        counts.missing_endpoints += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            edge_type = %merge.edge_type,
                            from = %merge.from,
                            to = %merge.to,
                            error = %e,
                            "relationship merge failed, skipping record"
                        );
                        counts.failed += 1;
                        continue;
                    }
                }
                counts.succeeded += 1;
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, GraphStore, NodeKey, PropertyMap};

    fn node(label: &str, key: &str, id: i64) -> Record {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), format!("{} {}", label, id).into());
        Record::Node(NodeMerge {
            key: NodeKey::new(label, key, id),
            properties,
        })
    }

    fn wrote(author: i64, book: i64) -> Record {
        Record::Edge(RelationshipMerge {
            edge_type: EdgeType::new("WROTE"),
            from: NodeKey::new("Author", "author_id", author),
            to: NodeKey::new("Book", "book_id", book),
        })
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut builder = ProjectionBuilder::new(GraphStore::new());
        let batch = || vec![node("Author", "author_id", 1), node("Book", "book_id", 1), wrote(1, 1)];

        let first = builder.apply(batch());
        assert_eq!(first.created, 3);
        assert_eq!(first.succeeded, 3);

        let second = builder.apply(batch());
        assert_eq!(second.created, 0);
        assert_eq!(second.unchanged, 3);
        assert_eq!(builder.target().node_count(), 2);
        assert_eq!(builder.target().edge_count(), 1);
    }

    #[test]
    fn test_missing_endpoint_is_skipped() {
        let mut builder = ProjectionBuilder::new(GraphStore::new());
        builder.apply(vec![node("Author", "author_id", 1)]);

        let counts = builder.apply(vec![wrote(1, 99), wrote(2, 99)]);
        assert_eq!(counts.attempted, 2);
        assert_eq!(counts.missing_endpoints, 2);
        assert_eq!(counts.failed, 0);
        assert_eq!(counts.succeeded, 0);
        assert_eq!(builder.into_target().edge_count(), 0);
    }

    #[test]
    fn test_counts_accumulate() {
        let mut total = BatchCounts::default();
        total += BatchCounts { attempted: 2, succeeded: 2, created: 2, ..Default::default() };
        total += BatchCounts { attempted: 1, failed: 1, ..Default::default() };
        assert_eq!(total.attempted, 3);
        assert_eq!(total.succeeded, 2);
        assert_eq!(total.failed, 1);
    }
}
