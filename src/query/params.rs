//! Query options and `CYPHER` parameter serialization

use indexmap::IndexMap;
use std::fmt::Write;

/// A parameter value bound into a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<QueryParam>),
    Map(QueryParams),
}

/// Named parameters, serialized in insertion order
pub type QueryParams = IndexMap<String, QueryParam>;

impl From<bool> for QueryParam {
    fn from(b: bool) -> Self {
        QueryParam::Boolean(b)
    }
}

impl From<i64> for QueryParam {
    fn from(i: i64) -> Self {
        QueryParam::Integer(i)
    }
}

impl From<i32> for QueryParam {
    fn from(i: i32) -> Self {
        QueryParam::Integer(i as i64)
    }
}

impl From<f64> for QueryParam {
    fn from(f: f64) -> Self {
        QueryParam::Float(f)
    }
}

impl From<&str> for QueryParam {
    fn from(s: &str) -> Self {
        QueryParam::String(s.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(s: String) -> Self {
        QueryParam::String(s)
    }
}

impl<T: Into<QueryParam>> From<Vec<T>> for QueryParam {
    fn from(items: Vec<T>) -> Self {
        QueryParam::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(QueryParam::Null)
    }
}

impl From<QueryParams> for QueryParam {
    fn from(map: QueryParams) -> Self {
        QueryParam::Map(map)
    }
}

impl QueryParam {
    /// Render the value the way the server's `CYPHER` prefix expects it
    pub fn to_cypher(&self) -> String {
        let mut out = String::new();
        self.write_cypher(&mut out);
        out
    }

    fn write_cypher(&self, out: &mut String) {
        match self {
            QueryParam::Null => out.push_str("null"),
            QueryParam::Boolean(b) => {
                let _ = write!(out, "{}", b);
            }
            QueryParam::Integer(i) => {
                let _ = write!(out, "{}", i);
            }
            QueryParam::Float(f) => {
                let _ = write!(out, "{}", f);
            }
            QueryParam::String(s) => {
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
            QueryParam::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_cypher(out);
                }
                out.push(']');
            }
            QueryParam::Map(map) => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(key);
                    out.push(':');
                    value.write_cypher(out);
                }
                out.push('}');
            }
        }
    }
}

/// `k=v k2=v2` segment of the `CYPHER` prefix
pub fn params_to_string(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value.to_cypher()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query text as sent on the wire: `CYPHER <params> <query>` when
/// parameters are present, the bare query otherwise
pub fn build_query_text(query: &str, params: Option<&QueryParams>) -> String {
    match params {
        Some(params) => format!("CYPHER {} {}", params_to_string(params), query),
        None => query.to_string(),
    }
}

/// Per-call query options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Named parameters
    pub params: Option<QueryParams>,
    /// Server-side timeout in milliseconds
    pub timeout: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.params
            .get_or_insert_with(QueryParams::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}
