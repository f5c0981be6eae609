//! Decoded edge

use super::types::{EdgeId, NodeId};
use super::value::{GraphValue, Properties};
use serde::Serialize;
use std::fmt;

/// A directed edge returned by a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Server-assigned identifier
    pub id: EdgeId,

    /// Relationship type name (exactly one per edge)
    pub relationship_type: String,

    /// Source node id
    pub source_id: NodeId,

    /// Destination node id
    pub destination_id: NodeId,

    /// Property values keyed by property name
    pub properties: Properties,
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        relationship_type: impl Into<String>,
        source_id: impl Into<NodeId>,
        destination_id: impl Into<NodeId>,
        properties: Properties,
    ) -> Self {
        Edge {
            id: id.into(),
            relationship_type: relationship_type.into(),
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            properties,
        }
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.properties.get(key)
    }

    /// Whether the edge starts and ends at the same node
    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.destination_id
    }

    /// Whether the edge touches the given node
    pub fn connects(&self, node: NodeId) -> bool {
        self.source_id == node || self.destination_id == node
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}", self.source_id, self.relationship_type)?;
        if !self.properties.is_empty() {
            write!(f, " ")?;
            super::value::write_properties(f, &self.properties)?;
        }
        write!(f, "]->({})", self.destination_id)
    }
}
