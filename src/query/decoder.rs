//! Raw value decoder
//!
//! Decoding is synchronous against one metadata snapshot. Ids the snapshot
//! does not know are recorded as pending and get an empty placeholder; the
//! caller resolves every pending id in one go and decodes again.

use super::metadata::{GraphMetadata, MetadataCategory, PendingLookup};
use super::raw::{RawEdge, RawNode, RawProperty, RawValue};
use crate::error::{GraphError, GraphResult};
use crate::graph::types::{GraphDuration, Point};
use crate::graph::value::{GraphValue, Properties};
use crate::graph::{Edge, Node, Path};
use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;

/// Decodes raw cells against a metadata snapshot
pub struct Decoder<'a> {
    metadata: &'a GraphMetadata,
    pending: Vec<PendingLookup>,
}

impl<'a> Decoder<'a> {
    pub fn new(metadata: &'a GraphMetadata) -> Self {
        Self {
            metadata,
            pending: Vec::new(),
        }
    }

    /// Whether any lookup missed the snapshot
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &[PendingLookup] {
        &self.pending
    }

    pub fn into_pending(self) -> Vec<PendingLookup> {
        self.pending
    }

    fn name(&mut self, category: MetadataCategory, id: i64) -> Option<String> {
        match self.metadata.get(category, id) {
            Some(name) => Some(name.to_string()),
            None => {
                let lookup = PendingLookup { category, id };
                if !self.pending.contains(&lookup) {
                    self.pending.push(lookup);
                }
                None
            }
        }
    }

    pub fn decode(&mut self, raw: &RawValue) -> GraphResult<GraphValue> {
        Ok(match raw {
            RawValue::Null => GraphValue::Null,
            RawValue::String(s) => GraphValue::String(s.clone()),
            RawValue::Integer(i) => GraphValue::Integer(*i),
            RawValue::Boolean(text) => GraphValue::Boolean(parse_bool(text)?),
            RawValue::Double(text) => GraphValue::Double(parse_f64(text)?),
            RawValue::Array(items) => GraphValue::Array(
                items
                    .iter()
                    .map(|item| self.decode(item))
                    .collect::<GraphResult<_>>()?,
            ),
            RawValue::Edge(edge) => GraphValue::Edge(self.decode_edge(edge)?),
            RawValue::Node(node) => GraphValue::Node(self.decode_node(node)?),
            RawValue::Path { nodes, edges } => GraphValue::Path(Path {
                nodes: nodes
                    .iter()
                    .map(|n| self.decode_node(n))
                    .collect::<GraphResult<_>>()?,
                edges: edges
                    .iter()
                    .map(|e| self.decode_edge(e))
                    .collect::<GraphResult<_>>()?,
            }),
            RawValue::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.decode(value)?);
                }
                GraphValue::Map(map)
            }
            RawValue::Point { latitude, longitude } => GraphValue::Point(Point {
                latitude: parse_f64(latitude)?,
                longitude: parse_f64(longitude)?,
            }),
            RawValue::Vector(values) => GraphValue::Vector(
                values
                    .iter()
                    .map(|v| {
                        v.parse::<f32>()
                            .map_err(|e| GraphError::Protocol(format!("Invalid vector element '{}': {}", v, e)))
                    })
                    .collect::<GraphResult<_>>()?,
            ),
            RawValue::DateTime(secs) => GraphValue::DateTime(timestamp(*secs)?),
            RawValue::Date(secs) => GraphValue::Date(timestamp(*secs)?.date()),
            RawValue::Time(secs) => GraphValue::Time(timestamp(*secs)?.time()),
            RawValue::Duration(secs) => {
                let duration = GraphDuration::between(timestamp(0)?, timestamp(*secs)?)
                    .ok_or_else(|| GraphError::Protocol(format!("Duration out of range: {}", secs)))?;
                GraphValue::Duration(duration)
            }
        })
    }

    fn decode_node(&mut self, raw: &RawNode) -> GraphResult<Node> {
        let labels = raw
            .label_ids
            .iter()
            .map(|id| self.name(MetadataCategory::Labels, *id).unwrap_or_default())
            .collect();
        Ok(Node::new(raw.id, labels, self.decode_properties(&raw.properties)?))
    }

    fn decode_edge(&mut self, raw: &RawEdge) -> GraphResult<Edge> {
        let relationship_type = self
            .name(MetadataCategory::RelationshipTypes, raw.relationship_type_id)
            .unwrap_or_default();
        Ok(Edge::new(
            raw.id,
            relationship_type,
            raw.source_id,
            raw.destination_id,
            self.decode_properties(&raw.properties)?,
        ))
    }

    /// Properties with an unknown key are left out until the key resolves
    fn decode_properties(&mut self, raw: &[RawProperty]) -> GraphResult<Properties> {
        let mut properties = Properties::with_capacity(raw.len());
        for prop in raw {
            let value = self.decode(&prop.value)?;
            if let Some(key) = self.name(MetadataCategory::PropertyKeys, prop.key_id) {
                properties.insert(key, value);
            }
        }
        Ok(properties)
    }
}

fn parse_bool(text: &str) -> GraphResult<bool> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(GraphError::Protocol(format!("Invalid boolean '{}'", other))),
    }
}

fn parse_f64(text: &str) -> GraphResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| GraphError::Protocol(format!("Invalid double '{}': {}", text, e)))
}

/// Wire temporal values are seconds since the Unix epoch, read as UTC
fn timestamp(secs: i64) -> GraphResult<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| GraphError::Protocol(format!("Timestamp out of range: {}", secs)))
}
