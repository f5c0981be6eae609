//! Decoded node

use super::types::NodeId;
use super::value::{GraphValue, Properties};
use serde::Serialize;
use std::fmt;

/// A node returned by a query
///
/// Labels keep the order the server reported them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Server-assigned identifier
    pub id: NodeId,

    /// Label names, one per label id on the wire
    pub labels: Vec<String>,

    /// Property values keyed by property name
    pub properties: Properties,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, labels: Vec<String>, properties: Properties) -> Self {
        Node {
            id: id.into(),
            labels,
            properties,
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.properties.get(key)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for label in &self.labels {
            write!(f, ":{}", label)?;
        }
        if !self.properties.is_empty() {
            if !self.labels.is_empty() {
                write!(f, " ")?;
            }
            super::value::write_properties(f, &self.properties)?;
        }
        write!(f, ")")
    }
}
