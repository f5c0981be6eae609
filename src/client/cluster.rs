//! Cluster strategy
//!
//! Commands go through the slot-routed cluster connection. Only `GRAPH.LIST`
//! needs more: graphs live on different masters, so it is asked of each one
//! over a direct connection.

use super::events::{forward_faults, EventSender};
use super::topology::Topology;
use super::GraphClient;
use crate::config::{ConnectionOptions, ServerAddress};
use crate::error::{GraphError, GraphResult};
use crate::protocol::cluster::parse_cluster_nodes;
use crate::protocol::command::{self, Command};
use crate::protocol::resp::RespValue;
use crate::protocol::transport::{Connector, FaultSink, FaultStream, Transport};
use crate::query::admin::parse_string_list;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct ClusterClient {
    cluster: Arc<dyn Transport>,
    options: ConnectionOptions,
    connector: Arc<dyn Connector>,
    faults: FaultSink,
    /// Direct connections to the current masters
    masters: Mutex<HashMap<ServerAddress, Arc<dyn Transport>>>,
    forwarder: JoinHandle<()>,
}

impl ClusterClient {
    pub fn new(
        cluster: Arc<dyn Transport>,
        options: ConnectionOptions,
        connector: Arc<dyn Connector>,
        faults: FaultSink,
        fault_stream: FaultStream,
        events: EventSender,
    ) -> Self {
        Self {
            cluster,
            options,
            connector,
            faults,
            masters: Mutex::new(HashMap::new()),
            forwarder: forward_faults(fault_stream, events),
        }
    }

    /// Addresses of the current masters, from `CLUSTER NODES`
    pub async fn masters(&self) -> GraphResult<Vec<ServerAddress>> {
        let text = self.cluster.execute(&command::cluster_nodes()).await?.as_text()?;
        let masters = parse_cluster_nodes(&text, self.cluster.address());
        if masters.is_empty() {
            return Err(GraphError::Topology("No masters reported by CLUSTER NODES".to_string()));
        }
        Ok(masters)
    }

    /// Run a command on one master, bypassing slot routing
    pub async fn execute_on(&self, address: &ServerAddress, cmd: &Command) -> GraphResult<RespValue> {
        let node = {
            let mut masters = self.masters.lock().await;
            match masters.get(address) {
                Some(node) => node.clone(),
                None => {
                    debug!("Opening direct connection to master {}", address);
                    let node = self
                        .connector
                        .connect(address, &self.options.with_address(address), self.faults.clone())
                        .await?;
                    masters.insert(address.clone(), node.clone());
                    node
                }
            }
        };

        match node.execute(cmd).await {
            Err(e) if e.is_transport() => {
                if let Some(node) = self.masters.lock().await.remove(address) {
                    node.disconnect().await;
                }
                Err(e)
            }
            other => other,
        }
    }

    /// Close direct connections to nodes that are no longer masters
    async fn release_departed(&self, current: &[ServerAddress]) {
        let departed: Vec<Arc<dyn Transport>> = {
            let mut masters = self.masters.lock().await;
            let gone: Vec<ServerAddress> = masters.keys().filter(|a| !current.contains(a)).cloned().collect();
            gone.iter().filter_map(|a| masters.remove(a)).collect()
        };
        for node in departed {
            debug!("Releasing connection to former master {}", node.address());
            node.disconnect().await;
        }
    }
}

#[async_trait]
impl GraphClient for ClusterClient {
    fn topology(&self) -> Topology {
        Topology::Cluster
    }

    async fn execute(&self, cmd: &Command) -> GraphResult<RespValue> {
        self.cluster.execute(cmd).await
    }

    /// Union of every master's graphs, in first-seen order.
    ///
    /// A master that fails to answer is logged and skipped.
    async fn list(&self) -> GraphResult<Vec<String>> {
        let masters = self.masters().await?;
        self.release_departed(&masters).await;
        debug!("Listing graphs on {} masters", masters.len());

        let mut graphs: Vec<String> = Vec::new();
        for master in &masters {
            let reply = match self.execute_on(master, &command::list()).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("GRAPH.LIST failed on {}: {}", master, e);
                    continue;
                }
            };
            for graph in parse_string_list(&reply)? {
                if !graphs.contains(&graph) {
                    graphs.push(graph);
                }
            }
        }
        Ok(graphs)
    }

    async fn disconnect(&self) {
        self.cluster.disconnect().await;
        let nodes: Vec<Arc<dyn Transport>> = self.masters.lock().await.drain().map(|(_, n)| n).collect();
        for node in nodes {
            node.disconnect().await;
        }
        self.forwarder.abort();
    }
}

impl Drop for ClusterClient {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
