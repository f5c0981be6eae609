//! Redigraph
//!
//! Typed client for graph databases that speak the Redis protocol
//! (`GRAPH.QUERY` and friends). Replies come back as nodes, edges, paths and
//! scalars instead of raw wire tuples, and one logical connection is kept
//! alive across single-server, Sentinel and cluster deployments.
//!
//! # Layers
//!
//! - `protocol`: reply model, command arrays, direct and cluster transports
//! - `query`: reply parsing, metadata cache, value decoding, parameters
//! - `client`: topology strategies (Direct, Sentinel, Cluster) and events
//! - `graph`: the decoded model and the per-graph [`Graph`] handle
//! - `db`: [`GraphDb`], the entry point
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use redigraph::{GraphDb, QueryOptions};
//!
//! # async fn run() -> redigraph::GraphResult<()> {
//! let db = GraphDb::connect_url("falkor://localhost:6379").await?;
//! let graph = db.select_graph("social");
//!
//! graph.query("CREATE (:Person {name: 'Alice'})-[:KNOWS]->(:Person {name: 'Bob'})").await?;
//!
//! let options = QueryOptions::new().with_param("name", "Alice");
//! let reply = graph
//!     .ro_query_with("MATCH (a:Person {name: $name})-[:KNOWS]->(b) RETURN b", &options)
//!     .await?;
//! for row in reply.rows() {
//!     println!("{}", row["b"]);
//! }
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod protocol;
pub mod query;

// Re-export main types for convenience
pub use client::{ClientEvent, GraphClient, SentinelState, Topology};
pub use config::{ConnectionOptions, ServerAddress};
pub use db::GraphDb;
pub use error::{GraphError, GraphResult};
pub use graph::{Edge, EdgeId, Graph, GraphDuration, GraphValue, Node, NodeId, Path, Point, Properties};
pub use protocol::{Command, ConstraintType, Connector, EntityType, RespValue, Transport};
pub use query::{
    IndexEntity, IndexType, QueryOptions, QueryParam, QueryParams, QueryReply, QueryStatistics, Row,
    SlowLogEntry, UdfLibrary,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
