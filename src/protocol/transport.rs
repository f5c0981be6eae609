//! Transport abstraction
//!
//! A [`Transport`] executes one command and returns its raw reply. A
//! transport that loses its connection reports it once on the [`FaultSink`]
//! handed to the [`Connector`] that opened it.

use crate::config::{ConnectionOptions, ServerAddress};
use crate::error::{GraphError, GraphResult};
use crate::protocol::command::Command;
use crate::protocol::resp::RespValue;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one opened transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A transport failure, tagged with the connection it came from
#[derive(Debug, Clone)]
pub struct TransportFault {
    pub connection: ConnectionId,
    pub error: Arc<GraphError>,
}

/// Where transports report their faults
pub type FaultSink = mpsc::UnboundedSender<TransportFault>;

/// Receiving end of a [`FaultSink`]
pub type FaultStream = mpsc::UnboundedReceiver<TransportFault>;

pub fn fault_channel() -> (FaultSink, FaultStream) {
    mpsc::unbounded_channel()
}

/// One live connection to one server
#[async_trait]
pub trait Transport: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn address(&self) -> &ServerAddress;

    /// Send one command and wait for its reply.
    ///
    /// Server error replies are returned as `GraphError::Server`.
    async fn execute(&self, cmd: &Command) -> GraphResult<RespValue> {
        server_error(self.execute_raw(cmd).await?)
    }

    /// Send one command and return the reply frame as-is, error frames included
    async fn execute_raw(&self, cmd: &Command) -> GraphResult<RespValue>;

    async fn disconnect(&self);
}

/// Opens transports; swapped for a scripted one in tests
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        address: &ServerAddress,
        options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Arc<dyn Transport>>;

    /// Open a slot-routed connection to a cluster, seeded with `seeds`
    async fn connect_cluster(
        &self,
        seeds: &[ServerAddress],
        options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Arc<dyn Transport>>;
}

/// Turn an error frame into `GraphError::Server`
pub fn server_error(reply: RespValue) -> GraphResult<RespValue> {
    match reply {
        RespValue::Error(message) => Err(GraphError::Server(message)),
        other => Ok(other),
    }
}
