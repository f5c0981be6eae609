//! Wire protocol module
//!
//! Client side of RESP, on top of the `redis` crate:
//! - `resp`: the reply model and its conversion from `redis::Value`
//! - `command`: argument arrays for every command the client sends
//! - `transport`: the `Transport`/`Connector` seam and fault reporting
//! - `connection`: a multiplexed connection to one server
//! - `cluster`: a slot-routed connection to a whole cluster

pub mod cluster;
pub mod command;
pub mod connection;
pub mod resp;
pub mod transport;

// Re-export main types
pub use cluster::ClusterTransport;
pub use command::{Command, ConstraintType, EntityType};
pub use connection::{RedisConnection, RedisConnector};
pub use resp::{RespError, RespResult, RespValue};
pub use transport::{
    fault_channel, ConnectionId, Connector, FaultSink, FaultStream, Transport, TransportFault,
};
