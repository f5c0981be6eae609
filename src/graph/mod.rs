//! Graph domain model and the per-graph facade
//!
//! - `types`: identifiers, points and durations
//! - `node`, `edge`, `path`: decoded entities
//! - `value`: the decoded cell type
//! - `handle`: [`Graph`], the handle applications query through

pub mod edge;
pub mod handle;
pub mod node;
pub mod path;
pub mod types;
pub mod value;

// Re-export main types
pub use edge::Edge;
pub use handle::Graph;
pub use node::Node;
pub use path::Path;
pub use types::{EdgeId, GraphDuration, NodeId, Point};
pub use value::{GraphValue, Properties};
