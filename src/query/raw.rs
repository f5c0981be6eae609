//! Tagged wire values of a compact result set
//!
//! Every cell arrives as `[type, payload]`. This module only checks the
//! shape; turning ids into names and strings into numbers is the decoder's
//! job.

use crate::error::{GraphError, GraphResult};
use crate::protocol::resp::RespValue;
use std::convert::TryFrom;

/// Value type tags, as numbered by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null = 1,
    String = 2,
    Integer = 3,
    Boolean = 4,
    Double = 5,
    Array = 6,
    Edge = 7,
    Node = 8,
    Path = 9,
    Map = 10,
    Point = 11,
    Vector = 12,
    DateTime = 13,
    Date = 14,
    Time = 15,
    Duration = 16,
}

impl TryFrom<i64> for ValueType {
    type Error = GraphError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        Ok(match tag {
            1 => ValueType::Null,
            2 => ValueType::String,
            3 => ValueType::Integer,
            4 => ValueType::Boolean,
            5 => ValueType::Double,
            6 => ValueType::Array,
            7 => ValueType::Edge,
            8 => ValueType::Node,
            9 => ValueType::Path,
            10 => ValueType::Map,
            11 => ValueType::Point,
            12 => ValueType::Vector,
            13 => ValueType::DateTime,
            14 => ValueType::Date,
            15 => ValueType::Time,
            16 => ValueType::Duration,
            other => return Err(GraphError::Protocol(format!("unknown scalar type: {}", other))),
        })
    }
}

/// A property as sent on the wire: key id plus a tagged value
#[derive(Debug, Clone, PartialEq)]
pub struct RawProperty {
    pub key_id: i64,
    pub value: RawValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: i64,
    pub label_ids: Vec<i64>,
    pub properties: Vec<RawProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEdge {
    pub id: i64,
    pub relationship_type_id: i64,
    pub source_id: i64,
    pub destination_id: i64,
    pub properties: Vec<RawProperty>,
}

/// One undecoded cell
///
/// Booleans, doubles, points and vectors keep their textual wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    String(String),
    Integer(i64),
    Boolean(String),
    Double(String),
    Array(Vec<RawValue>),
    Edge(RawEdge),
    Node(RawNode),
    Path { nodes: Vec<RawNode>, edges: Vec<RawEdge> },
    Map(Vec<(String, RawValue)>),
    Point { latitude: String, longitude: String },
    Vector(Vec<String>),
    DateTime(i64),
    Date(i64),
    Time(i64),
    Duration(i64),
}

fn malformed(what: &str, got: &RespValue) -> GraphError {
    GraphError::Protocol(format!("Malformed {}: unexpected {}", what, got.kind()))
}

fn array<'a>(value: &'a RespValue, what: &str) -> GraphResult<&'a [RespValue]> {
    match value {
        RespValue::Array(items) => Ok(items),
        other => Err(malformed(what, other)),
    }
}

fn integer(value: &RespValue, what: &str) -> GraphResult<i64> {
    match value {
        RespValue::Integer(i) => Ok(*i),
        other => Err(malformed(what, other)),
    }
}

fn text(value: &RespValue, what: &str) -> GraphResult<String> {
    match value {
        RespValue::Boolean(b) => Ok(b.to_string()),
        other => other.as_text().map_err(|_| malformed(what, other)),
    }
}

fn fixed<'a>(value: &'a RespValue, len: usize, what: &str) -> GraphResult<&'a [RespValue]> {
    let items = array(value, what)?;
    if items.len() != len {
        return Err(GraphError::Protocol(format!(
            "Malformed {}: expected {} elements, got {}",
            what,
            len,
            items.len()
        )));
    }
    Ok(items)
}

impl RawValue {
    /// Parse a `[type, payload]` cell
    pub fn from_resp(cell: &RespValue) -> GraphResult<Self> {
        let pair = fixed(cell, 2, "value")?;
        Self::from_tagged(&pair[0], &pair[1])
    }

    /// Parse a payload given its separately sent type tag
    pub fn from_tagged(tag: &RespValue, payload: &RespValue) -> GraphResult<Self> {
        let value_type = ValueType::try_from(integer(tag, "type tag")?)?;
        Ok(match value_type {
            ValueType::Null => RawValue::Null,
            ValueType::String => RawValue::String(text(payload, "string")?),
            ValueType::Integer => RawValue::Integer(integer(payload, "integer")?),
            ValueType::Boolean => RawValue::Boolean(text(payload, "boolean")?),
            ValueType::Double => RawValue::Double(text(payload, "double")?),
            ValueType::Array => RawValue::Array(
                array(payload, "array")?
                    .iter()
                    .map(RawValue::from_resp)
                    .collect::<GraphResult<_>>()?,
            ),
            ValueType::Edge => RawValue::Edge(RawEdge::from_resp(payload)?),
            ValueType::Node => RawValue::Node(RawNode::from_resp(payload)?),
            ValueType::Path => {
                let parts = fixed(payload, 2, "path")?;
                RawValue::Path {
                    nodes: tagged_list(&parts[0], ValueType::Node, "path nodes")?
                        .into_iter()
                        .map(RawNode::from_resp)
                        .collect::<GraphResult<_>>()?,
                    edges: tagged_list(&parts[1], ValueType::Edge, "path edges")?
                        .into_iter()
                        .map(RawEdge::from_resp)
                        .collect::<GraphResult<_>>()?,
                }
            }
            ValueType::Map => {
                let items = array(payload, "map")?;
                if items.len() % 2 != 0 {
                    return Err(GraphError::Protocol("Malformed map: odd element count".to_string()));
                }
                RawValue::Map(
                    items
                        .chunks(2)
                        .map(|kv| -> GraphResult<(String, RawValue)> {
                            Ok((text(&kv[0], "map key")?, RawValue::from_resp(&kv[1])?))
                        })
                        .collect::<GraphResult<_>>()?,
                )
            }
            ValueType::Point => {
                let coords = fixed(payload, 2, "point")?;
                RawValue::Point {
                    latitude: text(&coords[0], "latitude")?,
                    longitude: text(&coords[1], "longitude")?,
                }
            }
            ValueType::Vector => RawValue::Vector(
                array(payload, "vector")?
                    .iter()
                    .map(|v| text(v, "vector element"))
                    .collect::<GraphResult<_>>()?,
            ),
            ValueType::DateTime => RawValue::DateTime(integer(payload, "datetime")?),
            ValueType::Date => RawValue::Date(integer(payload, "date")?),
            ValueType::Time => RawValue::Time(integer(payload, "time")?),
            ValueType::Duration => RawValue::Duration(integer(payload, "duration")?),
        })
    }
}

/// Path members come as `[ARRAY, [[NODE, n], ...]]`; returns the inner payloads
fn tagged_list<'a>(value: &'a RespValue, expected: ValueType, what: &str) -> GraphResult<Vec<&'a RespValue>> {
    let outer = fixed(value, 2, what)?;
    if ValueType::try_from(integer(&outer[0], what)?)? != ValueType::Array {
        return Err(GraphError::Protocol(format!("Malformed {}: expected an array", what)));
    }
    array(&outer[1], what)?
        .iter()
        .map(|member| -> GraphResult<&'a RespValue> {
            let pair = fixed(member, 2, what)?;
            if ValueType::try_from(integer(&pair[0], what)?)? != expected {
                return Err(GraphError::Protocol(format!(
                    "Malformed {}: expected {:?} members",
                    what, expected
                )));
            }
            Ok(&pair[1])
        })
        .collect()
}

fn properties(value: &RespValue) -> GraphResult<Vec<RawProperty>> {
    array(value, "properties")?
        .iter()
        .map(|prop| -> GraphResult<RawProperty> {
            let triple = fixed(prop, 3, "property")?;
            Ok(RawProperty {
                key_id: integer(&triple[0], "property key id")?,
                value: RawValue::from_tagged(&triple[1], &triple[2])?,
            })
        })
        .collect()
}

impl RawNode {
    /// `[id, [label ids], [properties]]`
    pub fn from_resp(payload: &RespValue) -> GraphResult<Self> {
        let parts = fixed(payload, 3, "node")?;
        Ok(RawNode {
            id: integer(&parts[0], "node id")?,
            label_ids: array(&parts[1], "node labels")?
                .iter()
                .map(|l| integer(l, "label id"))
                .collect::<GraphResult<_>>()?,
            properties: properties(&parts[2])?,
        })
    }
}

impl RawEdge {
    /// `[id, type id, source id, destination id, [properties]]`
    pub fn from_resp(payload: &RespValue) -> GraphResult<Self> {
        let parts = fixed(payload, 5, "edge")?;
        Ok(RawEdge {
            id: integer(&parts[0], "edge id")?,
            relationship_type_id: integer(&parts[1], "relationship type id")?,
            source_id: integer(&parts[2], "source id")?,
            destination_id: integer(&parts[3], "destination id")?,
            properties: properties(&parts[4])?,
        })
    }
}
