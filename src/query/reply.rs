//! Query reply assembly
//!
//! A compact reply is either `[stats]` (no result set) or
//! `[headers, rows, stats]`. Every cell is decoded against one metadata
//! snapshot; if any id was unknown, the cache is awaited once for the whole
//! reply and the cells are decoded again.

use super::decoder::Decoder;
use super::metadata::{GraphMetadata, MetadataCache, PendingLookup};
use super::raw::RawValue;
use crate::error::{GraphError, GraphResult};
use crate::graph::value::GraphValue;
use crate::protocol::resp::RespValue;
use indexmap::IndexMap;
use serde::Serialize;

/// One result row, keyed by column name in column order
pub type Row = IndexMap<String, GraphValue>;

/// Decoded reply of a query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryReply {
    /// Column names; `None` when the query returned no result set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    /// Rows; `None` exactly when `headers` is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    /// Server-reported statistics lines
    pub metadata: Vec<String>,
}

impl QueryReply {
    pub fn has_result_set(&self) -> bool {
        self.data.is_some()
    }

    /// Rows, empty when there is no result set
    pub fn rows(&self) -> &[Row] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn statistics(&self) -> QueryStatistics {
        QueryStatistics::parse(&self.metadata)
    }
}

/// Parsed `Key: value [unit]` statistics lines
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStatistics {
    values: IndexMap<String, f64>,
}

impl QueryStatistics {
    /// Lines without a numeric value are skipped
    pub fn parse(lines: &[String]) -> Self {
        let mut values = IndexMap::new();
        for line in lines {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let number = rest.split_whitespace().next().and_then(|v| v.parse::<f64>().ok());
            if let Some(number) = number {
                values.insert(key.trim().to_string(), number);
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn count(&self, key: &str) -> u64 {
        self.get(key).map(|v| v as u64).unwrap_or(0)
    }

    pub fn labels_added(&self) -> u64 {
        self.count("Labels added")
    }

    pub fn labels_removed(&self) -> u64 {
        self.count("Labels removed")
    }

    pub fn nodes_created(&self) -> u64 {
        self.count("Nodes created")
    }

    pub fn nodes_deleted(&self) -> u64 {
        self.count("Nodes deleted")
    }

    pub fn properties_set(&self) -> u64 {
        self.count("Properties set")
    }

    pub fn properties_removed(&self) -> u64 {
        self.count("Properties removed")
    }

    pub fn relationships_created(&self) -> u64 {
        self.count("Relationships created")
    }

    pub fn relationships_deleted(&self) -> u64 {
        self.count("Relationships deleted")
    }

    pub fn indices_created(&self) -> u64 {
        self.count("Indices created")
    }

    pub fn indices_deleted(&self) -> u64 {
        self.count("Indices deleted")
    }

    pub fn cached_execution(&self) -> bool {
        self.count("Cached execution") == 1
    }

    /// `Query internal execution time`, in milliseconds
    pub fn execution_time_ms(&self) -> Option<f64> {
        self.get("Query internal execution time")
    }
}

/// A compact reply whose cells are parsed but not yet decoded
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub headers: Option<Vec<String>>,
    pub rows: Option<Vec<Vec<RawValue>>>,
    pub metadata: Vec<String>,
}

fn text_lines(value: &RespValue, what: &str) -> GraphResult<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|line| {
            line.as_text()
                .map_err(|_| GraphError::Protocol(format!("Malformed {}: unexpected {}", what, line.kind())))
        })
        .collect()
}

/// Compact headers are `[type, name]`; verbose ones are bare names
fn header_name(header: &RespValue) -> GraphResult<String> {
    match header {
        RespValue::Array(pair) if pair.len() == 2 => Ok(pair[1].as_text()?),
        other => other
            .as_text()
            .map_err(|_| GraphError::Protocol(format!("Malformed header: unexpected {}", other.kind()))),
    }
}

impl RawReply {
    pub fn parse(reply: &RespValue) -> GraphResult<Self> {
        let parts = match reply {
            RespValue::Array(parts) => parts,
            other => {
                return Err(GraphError::Protocol(format!(
                    "Malformed reply: expected array, got {}",
                    other.kind()
                )))
            }
        };

        match parts.len() {
            1 => Ok(RawReply {
                headers: None,
                rows: None,
                metadata: text_lines(&parts[0], "statistics")?,
            }),
            3 => {
                let headers = parts[0]
                    .as_array()?
                    .iter()
                    .map(header_name)
                    .collect::<GraphResult<Vec<_>>>()?;
                let rows = parts[1]
                    .as_array()?
                    .iter()
                    .map(|row| {
                        let cells = row.as_array()?;
                        if cells.len() != headers.len() {
                            return Err(GraphError::Protocol(format!(
                                "Malformed row: {} cells for {} columns",
                                cells.len(),
                                headers.len()
                            )));
                        }
                        cells.iter().map(RawValue::from_resp).collect::<GraphResult<Vec<_>>>()
                    })
                    .collect::<GraphResult<Vec<_>>>()?;
                Ok(RawReply {
                    headers: Some(headers),
                    rows: Some(rows),
                    metadata: text_lines(&parts[2], "statistics")?,
                })
            }
            n => Err(GraphError::Protocol(format!(
                "Malformed reply: expected 1 or 3 elements, got {}",
                n
            ))),
        }
    }

    /// Decode every cell against one snapshot, collecting the ids it lacks
    pub fn decode(&self, metadata: &GraphMetadata) -> GraphResult<(QueryReply, Vec<PendingLookup>)> {
        let mut decoder = Decoder::new(metadata);
        let data = match (&self.headers, &self.rows) {
            (Some(headers), Some(rows)) => {
                let mut data = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut decoded = Row::with_capacity(headers.len());
                    for (header, cell) in headers.iter().zip(row) {
                        decoded.insert(header.clone(), decoder.decode(cell)?);
                    }
                    data.push(decoded);
                }
                Some(data)
            }
            _ => None,
        };
        let reply = QueryReply {
            headers: self.headers.clone(),
            data,
            metadata: self.metadata.clone(),
        };
        Ok((reply, decoder.into_pending()))
    }
}

/// Decode a compact reply, resolving unknown ids through the cache
pub async fn assemble(reply: &RespValue, cache: &MetadataCache) -> GraphResult<QueryReply> {
    let raw = RawReply::parse(reply)?;
    let snapshot = cache.snapshot();
    let (decoded, pending) = raw.decode(&snapshot)?;
    if pending.is_empty() {
        return Ok(decoded);
    }

    let fresh = cache.resolve_pending(&pending).await?;
    let (decoded, pending) = raw.decode(&fresh)?;
    match pending.first() {
        Some(missing) => Err(GraphError::MetadataResolution {
            category: missing.category,
            id: missing.id,
        }),
        None => Ok(decoded),
    }
}

/// First column of a verbose (non-compact) reply, as text
pub fn first_column(reply: &RespValue) -> GraphResult<Vec<String>> {
    let parts = reply.as_array()?;
    if parts.len() != 3 {
        return Err(GraphError::Protocol(format!(
            "Malformed reply: expected 3 elements, got {}",
            parts.len()
        )));
    }
    parts[1]
        .as_array()?
        .iter()
        .map(|row| match row.as_array()?.first() {
            Some(cell) => Ok(cell.as_text()?),
            None => Err(GraphError::Protocol("Malformed row: empty".to_string())),
        })
        .collect()
}
