//! Decoded result values
//!
//! [`GraphValue`] is what every cell of a query reply decodes to.

use super::edge::Edge;
use super::node::Node;
use super::path::Path;
use super::types::{GraphDuration, Point};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Property map of a node or edge, in wire order
pub type Properties = IndexMap<String, GraphValue>;

/// A fully decoded value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphValue {
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    Double(f64),
    Array(Vec<GraphValue>),
    Node(Node),
    Edge(Edge),
    Path(Path),
    Map(IndexMap<String, GraphValue>),
    Point(Point),
    Vector(Vec<f32>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Duration(GraphDuration),
}

impl GraphValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GraphValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GraphValue::Double(d) => Some(*d),
            GraphValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GraphValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[GraphValue]> {
        match self {
            GraphValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, GraphValue>> {
        match self {
            GraphValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            GraphValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            GraphValue::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            GraphValue::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            GraphValue::Null => "Null",
            GraphValue::String(_) => "String",
            GraphValue::Integer(_) => "Integer",
            GraphValue::Boolean(_) => "Boolean",
            GraphValue::Double(_) => "Double",
            GraphValue::Array(_) => "Array",
            GraphValue::Node(_) => "Node",
            GraphValue::Edge(_) => "Edge",
            GraphValue::Path(_) => "Path",
            GraphValue::Map(_) => "Map",
            GraphValue::Point(_) => "Point",
            GraphValue::Vector(_) => "Vector",
            GraphValue::DateTime(_) => "DateTime",
            GraphValue::Date(_) => "Date",
            GraphValue::Time(_) => "Time",
            GraphValue::Duration(_) => "Duration",
        }
    }

    /// JSON view, as serialized
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub(crate) fn write_properties(f: &mut fmt::Formatter<'_>, props: &Properties) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in props.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: ", key)?;
        value.fmt_quoted(f)?;
    }
    write!(f, "}}")
}

impl GraphValue {
    /// Like `Display`, but strings nested in collections are quoted
    fn fmt_quoted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => write!(f, "null"),
            GraphValue::String(s) => write!(f, "{}", s),
            GraphValue::Integer(i) => write!(f, "{}", i),
            GraphValue::Boolean(b) => write!(f, "{}", b),
            GraphValue::Double(d) => write!(f, "{}", d),
            GraphValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_quoted(f)?;
                }
                write!(f, "]")
            }
            GraphValue::Node(node) => write!(f, "{}", node),
            GraphValue::Edge(edge) => write!(f, "{}", edge),
            GraphValue::Path(path) => write!(f, "{}", path),
            GraphValue::Map(map) => write_properties(f, map),
            GraphValue::Point(point) => write!(f, "{}", point),
            GraphValue::Vector(values) => {
                write!(f, "<")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ">")
            }
            GraphValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            GraphValue::Date(d) => write!(f, "{}", d),
            GraphValue::Time(t) => write!(f, "{}", t),
            GraphValue::Duration(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for GraphValue {
    fn from(s: &str) -> Self {
        GraphValue::String(s.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(s: String) -> Self {
        GraphValue::String(s)
    }
}

impl From<i64> for GraphValue {
    fn from(i: i64) -> Self {
        GraphValue::Integer(i)
    }
}

impl From<i32> for GraphValue {
    fn from(i: i32) -> Self {
        GraphValue::Integer(i as i64)
    }
}

impl From<f64> for GraphValue {
    fn from(f: f64) -> Self {
        GraphValue::Double(f)
    }
}

impl From<bool> for GraphValue {
    fn from(b: bool) -> Self {
        GraphValue::Boolean(b)
    }
}

impl From<Node> for GraphValue {
    fn from(node: Node) -> Self {
        GraphValue::Node(node)
    }
}

impl From<Edge> for GraphValue {
    fn from(edge: Edge) -> Self {
        GraphValue::Edge(edge)
    }
}

impl From<Path> for GraphValue {
    fn from(path: Path) -> Self {
        GraphValue::Path(path)
    }
}
