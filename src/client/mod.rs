//! Connection strategies
//!
//! One [`GraphClient`] per logical connection, chosen once at connect time
//! by asking the server:
//! - [`SingleClient`]: pass-through to one connection
//! - [`SentinelClient`]: master resolved through Sentinel, swapped on failure
//! - [`ClusterClient`]: delegates to the slot-routed cluster transport

pub mod cluster;
pub mod events;
pub mod sentinel;
pub mod single;
pub mod topology;

use crate::error::GraphResult;
use crate::protocol::command::{self, Command};
use crate::protocol::resp::RespValue;
use crate::query::admin::parse_string_list;
use crate::query::params::QueryOptions;
use async_trait::async_trait;

pub use cluster::ClusterClient;
pub use events::{event_channel, ClientEvent, EventReceiver, EventSender};
pub use sentinel::{SentinelClient, SentinelState};
pub use single::SingleClient;
pub use topology::{connect, Topology};

/// What every topology strategy offers
#[async_trait]
pub trait GraphClient: Send + Sync {
    fn topology(&self) -> Topology;

    /// Send one command to the active server; error replies become `Server` errors
    async fn execute(&self, cmd: &Command) -> GraphResult<RespValue>;

    async fn query(
        &self,
        graph: &str,
        query: &str,
        options: &QueryOptions,
        compact: bool,
    ) -> GraphResult<RespValue> {
        self.execute(&command::query(graph, query, options, compact)).await
    }

    async fn ro_query(
        &self,
        graph: &str,
        query: &str,
        options: &QueryOptions,
        compact: bool,
    ) -> GraphResult<RespValue> {
        self.execute(&command::ro_query(graph, query, options, compact)).await
    }

    /// Names of every graph
    async fn list(&self) -> GraphResult<Vec<String>> {
        parse_string_list(&self.execute(&command::list()).await?)
    }

    async fn disconnect(&self);
}
