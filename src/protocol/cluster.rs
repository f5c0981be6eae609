//! Cluster connection
//!
//! Slot routing, `MOVED`/`ASK` handling and node discovery belong to the
//! `redis` crate's async cluster client. [`ClusterTransport`] adapts it to
//! [`Transport`]; [`parse_cluster_nodes`] reads the master list that fan-out
//! commands need.

use crate::config::{ConnectionOptions, ServerAddress};
use crate::error::{GraphError, GraphResult};
use crate::protocol::command::Command;
use crate::protocol::connection::{connect_error, connection_info, error_frame, is_connection_error};
use crate::protocol::resp::RespValue;
use crate::protocol::transport::{ConnectionId, FaultSink, Transport, TransportFault};
use async_trait::async_trait;
use redis::aio::ConnectionLike;
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Parse `CLUSTER NODES` output into the addresses of healthy masters
pub fn parse_cluster_nodes(text: &str, seed: &ServerAddress) -> Vec<ServerAddress> {
    let mut masters = Vec::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let flags: Vec<&str> = fields[2].split(',').collect();
        if !flags.contains(&"master") || flags.iter().any(|f| matches!(*f, "fail" | "noaddr" | "handshake")) {
            continue;
        }
        // ip:port@cport[,hostname]
        let endpoint = fields[1].split(',').next().unwrap_or_default();
        let endpoint = endpoint.split('@').next().unwrap_or_default();
        let address = match endpoint.strip_prefix(':') {
            Some(port) => port.parse().ok().map(|port| ServerAddress::new(seed.host.clone(), port)),
            None => ServerAddress::parse(endpoint).ok(),
        };
        if let Some(address) = address {
            if !masters.contains(&address) {
                masters.push(address);
            }
        }
    }
    masters
}

/// Slot-routed connection to a whole cluster.
///
/// Node failures are retried inside the cluster client; errors that still
/// reach a caller are reported as faults, but the connection stays usable
/// since the client rediscovers the topology on its own.
pub struct ClusterTransport {
    id: ConnectionId,
    seed: ServerAddress,
    connection: RwLock<Option<ClusterConnection>>,
    faults: FaultSink,
}

impl ClusterTransport {
    pub async fn connect(
        seeds: &[ServerAddress],
        options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Self> {
        let seed = seeds
            .first()
            .cloned()
            .ok_or_else(|| GraphError::Config("No cluster seed nodes".to_string()))?;

        // Clusters only have database 0
        let nodes: Vec<redis::ConnectionInfo> = seeds
            .iter()
            .map(|address| {
                let mut info = connection_info(address, options);
                info.redis.db = 0;
                info
            })
            .collect();
        let mut builder = ClusterClientBuilder::new(nodes).retries(options.max_redirections as u32);
        if let Some(username) = &options.username {
            builder = builder.username(username.clone());
        }
        if let Some(password) = &options.password {
            builder = builder.password(password.clone());
        }
        let client = builder
            .build()
            .map_err(|e| GraphError::Config(format!("Invalid cluster options: {}", e)))?;

        let connection = match tokio::time::timeout(options.connect_timeout(), client.get_async_connection()).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => return Err(connect_error(&seed, e)),
            Err(_) => {
                return Err(GraphError::Transport(format!(
                    "Timed out connecting to cluster at {} after {}ms",
                    seed, options.connect_timeout_ms
                )))
            }
        };

        let transport = Self {
            id: ConnectionId::next(),
            seed,
            connection: RwLock::new(Some(connection)),
            faults,
        };
        info!("Connected to cluster at {} ({})", transport.seed, transport.id);
        Ok(transport)
    }

    fn report(&self, cause: &redis::RedisError) -> GraphError {
        let message = format!("cluster at {} ({}): {}", self.seed, self.id, cause);
        warn!("Connection failure on {}", message);
        let fault = TransportFault {
            connection: self.id,
            error: Arc::new(GraphError::Transport(message.clone())),
        };
        if self.faults.send(fault).is_err() {
            debug!("No fault listener for {}", self.id);
        }
        GraphError::Transport(message)
    }
}

#[async_trait]
impl Transport for ClusterTransport {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn address(&self) -> &ServerAddress {
        &self.seed
    }

    async fn execute_raw(&self, cmd: &Command) -> GraphResult<RespValue> {
        let mut connection = self.connection.read().await.clone().ok_or_else(|| {
            GraphError::Transport(format!("Cluster connection at {} is closed", self.seed))
        })?;

        debug!("{} -> {}", self.id, cmd.name());
        let request = cmd.to_redis_cmd();
        match connection.req_packed_command(&request).await {
            Ok(value) => Ok(RespValue::from(value)),
            Err(e) if is_connection_error(&e) => Err(self.report(&e)),
            Err(e) => Ok(error_frame(&e)),
        }
    }

    async fn disconnect(&self) {
        if self.connection.write().await.take().is_some() {
            debug!("Disconnected from cluster at {} ({})", self.seed, self.id);
        }
    }
}
