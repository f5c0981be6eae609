//! Reply values
//!
//! [`RespValue`] is the reply shape the rest of the crate works with. Frames
//! are read by the `redis` crate and converted at the transport seam, so
//! nothing here touches bytes on the wire.

use thiserror::Error;

/// Errors raised when a reply does not have the expected shape
#[derive(Error, Debug)]
pub enum RespError {
    /// Unexpected reply shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid encoding
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

pub type RespResult<T> = Result<T, RespError>;

/// RESP value types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(String),
    /// Error: -ERR message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $6\r\nfoobar\r\n (or $-1\r\n for null)
    BulkString(Option<Vec<u8>>),
    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Vec<RespValue>),
    /// Null: _\r\n (RESP3), also *-1\r\n
    Null,
    /// Double: ,1.23\r\n (RESP3)
    Double(f64),
    /// Boolean: #t\r\n (RESP3)
    Boolean(bool),
}

impl From<redis::Value> for RespValue {
    fn from(value: redis::Value) -> Self {
        match value {
            redis::Value::Nil => RespValue::Null,
            redis::Value::Int(i) => RespValue::Integer(i),
            redis::Value::BulkString(bytes) => RespValue::BulkString(Some(bytes)),
            redis::Value::Array(items) | redis::Value::Set(items) => {
                RespValue::Array(items.into_iter().map(RespValue::from).collect())
            }
            redis::Value::SimpleString(s) => RespValue::SimpleString(s),
            redis::Value::Okay => RespValue::SimpleString("OK".to_string()),
            // Maps flatten to the RESP2 key/value layout
            redis::Value::Map(pairs) => RespValue::Array(
                pairs
                    .into_iter()
                    .flat_map(|(k, v)| [RespValue::from(k), RespValue::from(v)])
                    .collect(),
            ),
            redis::Value::Double(d) => RespValue::Double(d),
            redis::Value::Boolean(b) => RespValue::Boolean(b),
            redis::Value::VerbatimString { text, .. } => RespValue::BulkString(Some(text.into_bytes())),
            redis::Value::Attribute { data, .. } => RespValue::from(*data),
            other => RespValue::Error(format!("Unsupported reply: {:?}", other)),
        }
    }
}

impl RespValue {
    /// Bulk string from text
    pub fn bulk(s: impl Into<String>) -> Self {
        RespValue::BulkString(Some(s.into().into_bytes()))
    }

    /// Convert to array or error
    pub fn as_array(&self) -> RespResult<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Ok(arr),
            _ => Err(RespError::Protocol("Expected array".to_string())),
        }
    }

    /// Text of a simple or bulk string; integers and doubles are rendered
    pub fn as_text(&self) -> RespResult<String> {
        match self {
            RespValue::SimpleString(s) => Ok(s.clone()),
            RespValue::BulkString(Some(bytes)) => utf8(bytes),
            RespValue::Integer(i) => Ok(i.to_string()),
            RespValue::Double(d) => Ok(d.to_string()),
            _ => Err(RespError::Protocol(format!(
                "Expected string, got {}",
                self.kind()
            ))),
        }
    }

    /// Convert to integer or error
    pub fn as_integer(&self) -> RespResult<i64> {
        match self {
            RespValue::Integer(i) => Ok(*i),
            _ => Err(RespError::Protocol(format!(
                "Expected integer, got {}",
                self.kind()
            ))),
        }
    }

    /// Whether this is a null reply in either protocol version
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null | RespValue::BulkString(None))
    }

    /// Short frame name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk string",
            RespValue::Array(_) => "array",
            RespValue::Null => "null",
            RespValue::Double(_) => "double",
            RespValue::Boolean(_) => "boolean",
        }
    }

    /// Lossless-enough JSON view, used for loosely shaped admin replies
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RespValue::SimpleString(s) | RespValue::Error(s) => serde_json::Value::String(s.clone()),
            RespValue::Integer(i) => serde_json::Value::from(*i),
            RespValue::BulkString(Some(bytes)) => {
                serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            RespValue::BulkString(None) | RespValue::Null => serde_json::Value::Null,
            RespValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(RespValue::to_json).collect())
            }
            RespValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            RespValue::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

fn utf8(bytes: &[u8]) -> RespResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| RespError::InvalidEncoding(e.to_string()))
}
