//! Topology detection
//!
//! Decided once per connect from `INFO server`; never re-evaluated.

use super::cluster::ClusterClient;
use super::events::EventSender;
use super::sentinel::SentinelClient;
use super::single::SingleClient;
use super::GraphClient;
use crate::config::ConnectionOptions;
use crate::error::GraphResult;
use crate::protocol::command;
use crate::protocol::transport::{fault_channel, Connector, Transport};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Deployment shape of the server behind the configured address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    Single,
    Sentinel,
    Cluster,
}

impl Topology {
    /// Classify an `INFO server` report by its `redis_mode` marker
    pub fn classify(info: &str) -> Topology {
        if info.contains("redis_mode:sentinel") {
            Topology::Sentinel
        } else if info.contains("redis_mode:cluster") {
            Topology::Cluster
        } else {
            Topology::Single
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topology::Single => "single",
            Topology::Sentinel => "sentinel",
            Topology::Cluster => "cluster",
        };
        f.write_str(name)
    }
}

/// Ask a live connection what it is
pub async fn detect(transport: &dyn Transport) -> GraphResult<Topology> {
    let info = transport.execute(&command::server_info()).await?.as_text()?;
    let topology = Topology::classify(&info);
    debug!("{} reports topology {}", transport.address(), topology);
    Ok(topology)
}

/// Open the configured address, detect its topology, and build the matching strategy
pub async fn connect(
    options: &ConnectionOptions,
    connector: Arc<dyn Connector>,
    events: EventSender,
) -> GraphResult<Arc<dyn GraphClient>> {
    let (faults, fault_stream) = fault_channel();
    let address = options.address();
    let transport = connector.connect(&address, options, faults.clone()).await?;

    let topology = match detect(transport.as_ref()).await {
        Ok(topology) => topology,
        Err(e) => {
            transport.disconnect().await;
            return Err(e);
        }
    };
    info!("Connected to {} ({})", address, topology);

    let client: Arc<dyn GraphClient> = match topology {
        Topology::Single => Arc::new(SingleClient::new(transport, fault_stream, events)),
        Topology::Sentinel => Arc::new(
            SentinelClient::connect(transport, faults, fault_stream, options.clone(), connector, events).await?,
        ),
        Topology::Cluster => {
            // The first link only answered INFO; the cluster client opens its own
            transport.disconnect().await;
            let cluster = connector.connect_cluster(&[address.clone()], options, faults.clone()).await?;
            Arc::new(ClusterClient::new(cluster, options.clone(), connector, faults, fault_stream, events))
        }
    };
    Ok(client)
}
