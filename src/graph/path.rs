//! Decoded path

use super::edge::Edge;
use super::node::Node;
use serde::Serialize;
use std::fmt;

/// An alternating sequence of nodes and edges
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Path {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Path { nodes, edges }
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_node(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// One edge between each pair of consecutive nodes
    pub fn is_simple(&self) -> bool {
        !self.nodes.is_empty() && self.edges.len() + 1 == self.nodes.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                match self.edges.get(i - 1) {
                    Some(edge) => write!(f, "-[:{}]-", edge.relationship_type)?,
                    None => write!(f, "--")?,
                }
            }
            write!(f, "({})", node.id)?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::value::Properties;

    #[test]
    fn test_path_shape() {
        let a = Node::new(1, vec!["A".into()], Properties::new());
        let b = Node::new(2, vec!["B".into()], Properties::new());
        let path = Path::new(vec![a, b], vec![Edge::new(9, "R", 1, 2, Properties::new())]);

        assert_eq!(path.len(), 1);
        assert!(path.is_simple());
        assert_eq!(path.first_node().unwrap().id.as_i64(), 1);
        assert_eq!(path.last_node().unwrap().id.as_i64(), 2);
        assert_eq!(path.to_string(), "<(1)-[:R]-(2)>");
        assert!(!Path::default().is_simple());
    }
}
