//! Database handle
//!
//! [`GraphDb`] is the entry point: it connects, picks the topology strategy,
//! hands out [`Graph`] handles and runs server-wide commands.

use crate::client::events::{event_channel, EventReceiver, EventSender};
use crate::client::topology::{self, Topology};
use crate::client::GraphClient;
use crate::config::ConnectionOptions;
use crate::error::GraphResult;
use crate::graph::Graph;
use crate::protocol::command;
use crate::protocol::connection::RedisConnector;
use crate::protocol::transport::Connector;
use crate::query::admin::{parse_config, parse_udf_list, ReplyMap, UdfLibrary};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// A logical connection to a graph server
pub struct GraphDb {
    client: Arc<dyn GraphClient>,
    events: EventSender,
}

impl fmt::Debug for GraphDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDb")
            .field("topology", &self.client.topology())
            .finish()
    }
}

impl GraphDb {
    /// Connect over TCP
    pub async fn connect(options: ConnectionOptions) -> GraphResult<Self> {
        Self::connect_with(options, Arc::new(RedisConnector)).await
    }

    /// Connect to a `falkor://` URL
    pub async fn connect_url(url: &str) -> GraphResult<Self> {
        Self::connect(ConnectionOptions::from_url(url)?).await
    }

    /// Connect through a custom [`Connector`]
    pub async fn connect_with(options: ConnectionOptions, connector: Arc<dyn Connector>) -> GraphResult<Self> {
        let events = event_channel();
        let client = topology::connect(&options, connector, events.clone()).await?;
        Ok(Self { client, events })
    }

    /// Handle for `name`; nothing is sent until it is queried
    pub fn select_graph(&self, name: &str) -> Graph {
        Graph::new(name, self.client.clone())
    }

    pub fn topology(&self) -> Topology {
        self.client.topology()
    }

    /// Background errors and reconnections from now on
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn client(&self) -> &Arc<dyn GraphClient> {
        &self.client
    }

    pub async fn list(&self) -> GraphResult<Vec<String>> {
        self.client.list().await
    }

    /// One setting, or every setting for `*`
    pub async fn config_get(&self, key: &str) -> GraphResult<ReplyMap> {
        parse_config(&self.client.execute(&command::config_get(key)).await?)
    }

    pub async fn config_set(&self, key: &str, value: impl fmt::Display) -> GraphResult<()> {
        self.client
            .execute(&command::config_set(key, &value.to_string()))
            .await?;
        Ok(())
    }

    /// `GRAPH.INFO`, optionally limited to one section
    pub async fn info(&self, section: Option<&str>) -> GraphResult<serde_json::Value> {
        Ok(self.client.execute(&command::info(section)).await?.to_json())
    }

    pub async fn udf_load(&self, name: &str, script: &str, replace: bool) -> GraphResult<()> {
        self.client.execute(&command::udf_load(name, script, replace)).await?;
        Ok(())
    }

    pub async fn udf_list(&self, lib: Option<&str>, with_code: bool) -> GraphResult<Vec<UdfLibrary>> {
        parse_udf_list(&self.client.execute(&command::udf_list(lib, with_code)).await?)
    }

    pub async fn udf_flush(&self) -> GraphResult<()> {
        self.client.execute(&command::udf_flush()).await?;
        Ok(())
    }

    pub async fn udf_delete(&self, lib: &str) -> GraphResult<()> {
        self.client.execute(&command::udf_delete(lib)).await?;
        Ok(())
    }

    /// Close every connection this handle opened
    pub async fn close(&self) {
        self.client.disconnect().await;
        info!("Closed {} connection", self.client.topology());
    }
}
