//! Edge implementation for the target graph

use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed, typed edge between two migrated nodes.
///
/// Projected relationships carry no properties; the relational join rows
/// they come from hold nothing but the two foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    pub edge_type: EdgeType,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        edge_type: EdgeType,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}
