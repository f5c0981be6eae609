//! Typed replies of administrative commands and index DDL text

use crate::error::{GraphError, GraphResult};
use crate::protocol::resp::RespValue;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Loosely shaped key/value reply (memory usage, info, config)
pub type ReplyMap = IndexMap<String, serde_json::Value>;

/// One `GRAPH.SLOWLOG` entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowLogEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub query: String,
    /// Execution time in milliseconds
    pub took: f64,
}

impl SlowLogEntry {
    /// `[timestamp_secs, command, query, took_ms]`, all sent as strings
    pub fn from_resp(row: &RespValue) -> GraphResult<Self> {
        let fields = row.as_array()?;
        if fields.len() != 4 {
            return Err(GraphError::Protocol(format!(
                "Malformed slow log entry: expected 4 fields, got {}",
                fields.len()
            )));
        }
        let timestamp_text = fields[0].as_text()?;
        let seconds = timestamp_text
            .parse::<f64>()
            .map_err(|e| GraphError::Protocol(format!("Invalid slow log timestamp '{}': {}", timestamp_text, e)))?;
        let timestamp = DateTime::from_timestamp(seconds.trunc() as i64, 0)
            .ok_or_else(|| GraphError::Protocol(format!("Slow log timestamp out of range: {}", seconds)))?;
        let took_text = fields[3].as_text()?;
        let took = took_text
            .parse::<f64>()
            .map_err(|e| GraphError::Protocol(format!("Invalid slow log duration '{}': {}", took_text, e)))?;

        Ok(SlowLogEntry {
            timestamp,
            command: fields[1].as_text()?,
            query: fields[2].as_text()?,
            took,
        })
    }
}

pub fn parse_slow_log(reply: &RespValue) -> GraphResult<Vec<SlowLogEntry>> {
    reply.as_array()?.iter().map(SlowLogEntry::from_resp).collect()
}

/// Alternating `key, value, ...` array into an ordered map
pub fn parse_pairs(reply: &RespValue) -> GraphResult<ReplyMap> {
    let items = reply.as_array()?;
    if items.len() % 2 != 0 {
        return Err(GraphError::Protocol(format!(
            "Malformed key/value reply: odd element count {}",
            items.len()
        )));
    }
    items
        .chunks(2)
        .map(|kv| -> GraphResult<(String, serde_json::Value)> {
            Ok((kv[0].as_text()?, kv[1].to_json()))
        })
        .collect()
}

/// `GRAPH.CONFIG GET` answers `[name, value]` for one key and a list of
/// such pairs for `*`
pub fn parse_config(reply: &RespValue) -> GraphResult<ReplyMap> {
    let items = reply.as_array()?;
    match items.first() {
        Some(RespValue::Array(_)) => {
            let mut map = ReplyMap::new();
            for pair in items {
                map.extend(parse_pairs(pair)?);
            }
            Ok(map)
        }
        _ => parse_pairs(reply),
    }
}

/// A loaded UDF library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UdfLibrary {
    pub name: String,
    pub functions: Vec<String>,
    /// Present when listed with `WITHCODE`
    pub code: Option<String>,
}

impl UdfLibrary {
    /// `[name, [functions...]]` or `[name, [functions...], code]`
    pub fn from_resp(entry: &RespValue) -> GraphResult<Self> {
        let fields = entry.as_array()?;
        if !(2..=3).contains(&fields.len()) {
            return Err(GraphError::Protocol(format!(
                "Malformed UDF library entry: {} fields",
                fields.len()
            )));
        }
        Ok(UdfLibrary {
            name: fields[0].as_text()?,
            functions: fields[1]
                .as_array()?
                .iter()
                .map(|f| f.as_text())
                .collect::<Result<_, _>>()?,
            code: fields.get(2).map(|c| c.as_text()).transpose()?,
        })
    }
}

pub fn parse_udf_list(reply: &RespValue) -> GraphResult<Vec<UdfLibrary>> {
    reply.as_array()?.iter().map(UdfLibrary::from_resp).collect()
}

/// Array of strings, e.g. `GRAPH.LIST` or an execution plan
pub fn parse_string_list(reply: &RespValue) -> GraphResult<Vec<String>> {
    Ok(reply
        .as_array()?
        .iter()
        .map(|item| item.as_text())
        .collect::<Result<_, _>>()?)
}

/// Index kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Range,
    Fulltext,
    Vector,
}

impl IndexType {
    /// Keyword placed before `INDEX`; range indexes have none
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            IndexType::Range => None,
            IndexType::Fulltext => Some("FULLTEXT"),
            IndexType::Vector => Some("VECTOR"),
        }
    }
}

/// What an index is built over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEntity {
    Node,
    Edge,
}

impl IndexEntity {
    fn pattern(&self, label: &str) -> String {
        match self {
            IndexEntity::Node => format!("(e:{})", label),
            IndexEntity::Edge => format!("()-[e:{}]->()", label),
        }
    }
}

/// Value of an `OPTIONS {...}` entry
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOptionValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for IndexOptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOptionValue::String(s) => write!(f, "'{}'", s),
            IndexOptionValue::Integer(i) => write!(f, "{}", i),
            IndexOptionValue::Float(v) => write!(f, "{}", v),
            IndexOptionValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for IndexOptionValue {
    fn from(s: &str) -> Self {
        IndexOptionValue::String(s.to_string())
    }
}

impl From<i64> for IndexOptionValue {
    fn from(i: i64) -> Self {
        IndexOptionValue::Integer(i)
    }
}

impl From<u32> for IndexOptionValue {
    fn from(i: u32) -> Self {
        IndexOptionValue::Integer(i as i64)
    }
}

impl From<f64> for IndexOptionValue {
    fn from(v: f64) -> Self {
        IndexOptionValue::Float(v)
    }
}

impl From<bool> for IndexOptionValue {
    fn from(b: bool) -> Self {
        IndexOptionValue::Boolean(b)
    }
}

/// Index options, rendered in insertion order
pub type IndexOptions = IndexMap<String, IndexOptionValue>;

/// Options of a vector index
pub fn vector_index_options(dimension: u32, similarity_function: &str) -> IndexOptions {
    let mut options = IndexOptions::new();
    options.insert("dimension".to_string(), dimension.into());
    options.insert("similarityFunction".to_string(), similarity_function.into());
    options
}

fn type_prefix(index_type: IndexType) -> String {
    index_type
        .keyword()
        .map(|k| format!("{} ", k))
        .unwrap_or_default()
}

/// `CREATE [TYPE ]INDEX FOR <pattern> ON (e.p1, e.p2)[ OPTIONS {k:v, ...}]`
pub fn create_index_query(
    index_type: IndexType,
    entity: IndexEntity,
    label: &str,
    properties: &[&str],
    options: Option<&IndexOptions>,
) -> String {
    let attributes = properties
        .iter()
        .map(|p| format!("e.{}", p))
        .collect::<Vec<_>>()
        .join(", ");
    let mut query = format!(
        "CREATE {}INDEX FOR {} ON ({})",
        type_prefix(index_type),
        entity.pattern(label),
        attributes
    );
    if let Some(options) = options {
        let rendered = options
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        query.push_str(&format!(" OPTIONS {{{}}}", rendered));
    }
    query
}

/// `DROP [TYPE ]INDEX FOR <pattern> ON (e.attribute)`
pub fn drop_index_query(index_type: IndexType, entity: IndexEntity, label: &str, attribute: &str) -> String {
    format!(
        "DROP {}INDEX FOR {} ON (e.{})",
        type_prefix(index_type),
        entity.pattern(label),
        attribute
    )
}
