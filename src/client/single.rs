//! Direct strategy: one server, no failover

use super::events::{forward_faults, EventSender};
use super::topology::Topology;
use super::GraphClient;
use crate::error::GraphResult;
use crate::protocol::command::Command;
use crate::protocol::resp::RespValue;
use crate::protocol::transport::{FaultStream, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct SingleClient {
    transport: Arc<dyn Transport>,
    forwarder: JoinHandle<()>,
}

impl SingleClient {
    /// Wrap an open transport; its faults are republished on `events`
    pub fn new(transport: Arc<dyn Transport>, faults: FaultStream, events: EventSender) -> Self {
        Self {
            transport,
            forwarder: forward_faults(faults, events),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

#[async_trait]
impl GraphClient for SingleClient {
    fn topology(&self) -> Topology {
        Topology::Single
    }

    async fn execute(&self, cmd: &Command) -> GraphResult<RespValue> {
        debug!("{} -> {}", cmd.name(), self.transport.address());
        self.transport.execute(cmd).await
    }

    async fn disconnect(&self) {
        self.transport.disconnect().await;
        self.forwarder.abort();
    }
}

impl Drop for SingleClient {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
