//! Query result processing
//!
//! - `params`: query options and `CYPHER` parameter text
//! - `raw`: tagged wire cells
//! - `metadata`: per-graph id → name cache
//! - `decoder`: raw cells → [`GraphValue`](crate::graph::GraphValue)
//! - `reply`: whole-reply assembly
//! - `admin`: typed replies of administrative commands

pub mod admin;
pub mod decoder;
pub mod metadata;
pub mod params;
pub mod raw;
pub mod reply;

// Re-export main types
pub use admin::{
    IndexEntity, IndexOptionValue, IndexOptions, IndexType, ReplyMap, SlowLogEntry, UdfLibrary,
};
pub use decoder::Decoder;
pub use metadata::{GraphMetadata, MetadataCache, MetadataCategory, MetadataSource, PendingLookup};
pub use params::{QueryOptions, QueryParam, QueryParams};
pub use raw::{RawValue, ValueType};
pub use reply::{assemble, QueryReply, QueryStatistics, RawReply, Row};
