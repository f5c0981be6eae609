//! Error types for the graph client

use crate::protocol::resp::RespError;
use crate::query::metadata::MetadataCategory;
use thiserror::Error;

/// Errors that can occur when talking to a graph server
#[derive(Error, Debug)]
pub enum GraphError {
    /// Unknown wire type tag or structurally malformed reply
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An identifier was still missing after a metadata refresh
    #[error("Cannot find value from {category}[{id}]")]
    MetadataResolution {
        category: MetadataCategory,
        id: i64,
    },

    /// Unsupported or inconsistent deployment topology
    #[error("Topology error: {0}")]
    Topology(String),

    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error reply sent by the server
    #[error("Server error: {0}")]
    Server(String),

    /// Invalid connection options
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RESP framing error
    #[error(transparent)]
    Resp(#[from] RespError),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GraphError {
    /// Whether the error came from the connection rather than the request
    pub fn is_transport(&self) -> bool {
        matches!(self, GraphError::Transport(_) | GraphError::Io(_))
    }
}

/// Errors are shared between waiters of one metadata refresh, so they
/// must be cloneable. Wrapped foreign errors keep their message only.
impl Clone for GraphError {
    fn clone(&self) -> Self {
        match self {
            GraphError::Protocol(m) => GraphError::Protocol(m.clone()),
            GraphError::MetadataResolution { category, id } => GraphError::MetadataResolution {
                category: *category,
                id: *id,
            },
            GraphError::Topology(m) => GraphError::Topology(m.clone()),
            GraphError::Transport(m) => GraphError::Transport(m.clone()),
            GraphError::Server(m) => GraphError::Server(m.clone()),
            GraphError::Config(m) => GraphError::Config(m.clone()),
            GraphError::Io(e) => GraphError::Io(std::io::Error::new(e.kind(), e.to_string())),
            GraphError::Resp(e) => GraphError::Protocol(e.to_string()),
            GraphError::Yaml(e) => GraphError::Config(e.to_string()),
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
