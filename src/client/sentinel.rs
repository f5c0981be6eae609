//! Sentinel strategy
//!
//! The first connection is kept as the Sentinel link. It is asked for the
//! current master, and a second connection to that master serves every
//! command. A supervisor task consumes transport faults in order: a fault
//! from the active master connection drops it and resolves the master again;
//! a fault from any other connection (one already superseded, or the Sentinel
//! link itself) is ignored.
//!
//! ```text
//! DirectToSentinel ──resolve──▶ ConnectedToServer ──fault──▶ Reconnecting
//!                                      ▲                        │    │
//!                                      └────────────────────────┘    ▼
//!                                                                 Failed
//! ```

use super::events::{emit, ClientEvent, EventSender};
use super::topology::Topology;
use super::GraphClient;
use crate::config::{ConnectionOptions, ServerAddress};
use crate::error::{GraphError, GraphResult};
use crate::protocol::command::{self, Command};
use crate::protocol::resp::RespValue;
use crate::protocol::transport::{Connector, FaultSink, FaultStream, Transport, TransportFault};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where the Sentinel strategy currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentinelState {
    /// Only the Sentinel link is open
    DirectToSentinel,
    /// Commands go to `master`
    ConnectedToServer { master: ServerAddress },
    /// The master connection failed; resolving a new one
    Reconnecting,
    /// The last reconnection failed; the next transport error retries
    Failed,
}

struct Shared {
    options: ConnectionOptions,
    connector: Arc<dyn Connector>,
    faults: FaultSink,
    events: EventSender,
    sentinel: RwLock<Arc<dyn Transport>>,
    active: RwLock<Arc<dyn Transport>>,
    state: watch::Sender<SentinelState>,
}

pub struct SentinelClient {
    shared: Arc<Shared>,
    supervisor: JoinHandle<()>,
}

impl SentinelClient {
    /// Resolve the master through `sentinel` and hand off to it.
    ///
    /// `faults`/`fault_stream` must be the channel `sentinel` reports on;
    /// master connections opened later report there too.
    pub async fn connect(
        sentinel: Arc<dyn Transport>,
        faults: FaultSink,
        fault_stream: FaultStream,
        options: ConnectionOptions,
        connector: Arc<dyn Connector>,
        events: EventSender,
    ) -> GraphResult<Self> {
        let (state, _) = watch::channel(SentinelState::DirectToSentinel);

        let master = match resolve_master(sentinel.as_ref(), &options).await {
            Ok(master) => master,
            Err(e) => {
                sentinel.disconnect().await;
                return Err(e);
            }
        };
        let active = match open_master(connector.as_ref(), &options, &master, faults.clone()).await {
            Ok(active) => active,
            Err(e) => {
                sentinel.disconnect().await;
                return Err(e);
            }
        };
        info!("Sentinel at {} handed off to master {}", sentinel.address(), master);
        state.send_replace(SentinelState::ConnectedToServer { master });

        let shared = Arc::new(Shared {
            options,
            connector,
            faults,
            events,
            sentinel: RwLock::new(sentinel),
            active: RwLock::new(active),
            state,
        });
        let supervisor = tokio::spawn(supervise(shared.clone(), fault_stream));

        Ok(Self { shared, supervisor })
    }

    pub fn state(&self) -> SentinelState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn watch_state(&self) -> watch::Receiver<SentinelState> {
        self.shared.state.subscribe()
    }

    /// Address of the connection currently serving commands
    pub async fn active_address(&self) -> ServerAddress {
        self.shared.active.read().await.address().clone()
    }
}

#[async_trait]
impl GraphClient for SentinelClient {
    fn topology(&self) -> Topology {
        Topology::Sentinel
    }

    async fn execute(&self, cmd: &Command) -> GraphResult<RespValue> {
        let active = self.shared.active.read().await.clone();
        debug!("{} -> {}", cmd.name(), active.address());
        let result = active.execute(cmd).await;

        // A dead connection reports its fault once; after a failed
        // reconnection nothing else would wake the supervisor.
        if let Err(e) = &result {
            if e.is_transport() && self.shared.claim_retry() {
                let fault = TransportFault {
                    connection: active.id(),
                    error: Arc::new(e.clone()),
                };
                if self.shared.faults.send(fault).is_err() {
                    debug!("Sentinel supervisor is gone");
                }
            }
        }
        result
    }

    async fn disconnect(&self) {
        self.supervisor.abort();
        self.shared.active.read().await.disconnect().await;
        self.shared.sentinel.read().await.disconnect().await;
    }
}

impl Drop for SentinelClient {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

async fn supervise(shared: Arc<Shared>, mut faults: FaultStream) {
    while let Some(fault) = faults.recv().await {
        shared.handle_fault(fault).await;
    }
}

impl Shared {
    /// Failed → Reconnecting, so only one caller injects a retry
    fn claim_retry(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SentinelState::Failed {
                *state = SentinelState::Reconnecting;
                true
            } else {
                false
            }
        })
    }

    async fn handle_fault(&self, fault: TransportFault) {
        let failed = self.active.read().await.clone();
        if failed.id() != fault.connection {
            debug!(
                "Ignoring fault from {} (active is {}): {}",
                fault.connection,
                failed.id(),
                fault.error
            );
            return;
        }

        warn!("Master connection {} at {} failed: {}", failed.id(), failed.address(), fault.error);
        failed.disconnect().await;
        self.state.send_replace(SentinelState::Reconnecting);

        match self.reconnect().await {
            Ok(master) => {
                info!("Reconnected to master {}", master);
                self.state.send_replace(SentinelState::ConnectedToServer {
                    master: master.clone(),
                });
                emit(&self.events, ClientEvent::Reconnected { master });
            }
            Err(e) => {
                error!("Reconnection through Sentinel failed: {}", e);
                self.state.send_replace(SentinelState::Failed);
                emit(&self.events, ClientEvent::Error(Arc::new(e)));
            }
        }
    }

    async fn reconnect(&self) -> GraphResult<ServerAddress> {
        let master = self.resolve().await?;
        let transport = open_master(self.connector.as_ref(), &self.options, &master, self.faults.clone()).await?;
        *self.active.write().await = transport;
        Ok(master)
    }

    /// Ask the Sentinel link, reopening it once if it is broken
    async fn resolve(&self) -> GraphResult<ServerAddress> {
        let sentinel = self.sentinel.read().await.clone();
        match resolve_master(sentinel.as_ref(), &self.options).await {
            Err(e) if e.is_transport() => {
                debug!("Sentinel link {} lost ({}), reopening", sentinel.address(), e);
                sentinel.disconnect().await;
                let fresh = self
                    .connector
                    .connect(&self.options.address(), &self.options, self.faults.clone())
                    .await?;
                *self.sentinel.write().await = fresh.clone();
                resolve_master(fresh.as_ref(), &self.options).await
            }
            other => other,
        }
    }
}

async fn open_master(
    connector: &dyn Connector,
    options: &ConnectionOptions,
    master: &ServerAddress,
    faults: FaultSink,
) -> GraphResult<Arc<dyn Transport>> {
    connector.connect(master, &options.with_address(master), faults).await
}

/// Ask Sentinel for the one master it monitors.
///
/// With `sentinel_master_name` set, only that master is asked for.
/// Otherwise every monitored master is listed and more than one is an error.
pub async fn resolve_master(sentinel: &dyn Transport, options: &ConnectionOptions) -> GraphResult<ServerAddress> {
    let masters = match options.sentinel_master_name.as_deref() {
        Some(name) => vec![master_details(&sentinel.execute(&command::sentinel_master(name)).await?)?],
        None => sentinel
            .execute(&command::sentinel_masters())
            .await?
            .as_array()?
            .iter()
            .map(master_details)
            .collect::<GraphResult<Vec<_>>>()?,
    };

    match masters.as_slice() {
        [] => Err(GraphError::Topology("Sentinel reported no masters".to_string())),
        [details] => master_address(details),
        _ => Err(GraphError::Topology("Multiple masters are not supported".to_string())),
    }
}

/// A master entry is a flat `field, value, field, value, ...` array
fn master_details(entry: &RespValue) -> GraphResult<HashMap<String, String>> {
    let fields = entry.as_array()?;
    let mut details = HashMap::with_capacity(fields.len() / 2);
    for pair in fields.chunks_exact(2) {
        details.insert(pair[0].as_text()?, pair[1].as_text()?);
    }
    Ok(details)
}

fn master_address(details: &HashMap<String, String>) -> GraphResult<ServerAddress> {
    let ip = details
        .get("ip")
        .ok_or_else(|| GraphError::Protocol("Sentinel master entry has no ip".to_string()))?;
    let port = details
        .get("port")
        .ok_or_else(|| GraphError::Protocol("Sentinel master entry has no port".to_string()))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| GraphError::Protocol(format!("Invalid Sentinel master port '{}': {}", port, e)))?;
    Ok(ServerAddress::new(ip.clone(), port))
}
