//! Scripted in-memory server for integration tests
//!
//! Every connection opened through [`ScriptedConnector`] answers commands by
//! calling one shared handler with the connection's address.

#![allow(dead_code)]

use async_trait::async_trait;
use redigraph::protocol::transport::{ConnectionId, FaultSink, TransportFault};
use redigraph::{Command, ConnectionOptions, Connector, GraphError, GraphResult, RespValue, ServerAddress, Transport};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub type Handler = Arc<dyn Fn(&ServerAddress, &Command) -> GraphResult<RespValue> + Send + Sync>;

pub struct ScriptedTransport {
    id: ConnectionId,
    address: ServerAddress,
    handler: Handler,
    faults: FaultSink,
    broken: AtomicBool,
    sent: Mutex<Vec<Command>>,
}

impl ScriptedTransport {
    /// Break the connection and report it, as a dropped socket would
    pub fn fail(&self, message: &str) {
        self.broken.store(true, Ordering::SeqCst);
        let _ = self.faults.send(TransportFault {
            connection: self.id,
            error: Arc::new(GraphError::Transport(message.to_string())),
        });
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn address(&self) -> &ServerAddress {
        &self.address
    }

    async fn execute_raw(&self, cmd: &Command) -> GraphResult<RespValue> {
        if self.is_broken() {
            return Err(GraphError::Transport(format!("{} is closed", self.address)));
        }
        self.sent.lock().unwrap().push(cmd.clone());
        (self.handler)(&self.address, cmd)
    }

    async fn disconnect(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

pub struct ScriptedConnector {
    handler: Handler,
    opened: Mutex<Vec<Arc<ScriptedTransport>>>,
    clusters: Mutex<Vec<Arc<ScriptedTransport>>>,
    refused: Mutex<HashSet<ServerAddress>>,
}

impl ScriptedConnector {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ServerAddress, &Command) -> GraphResult<RespValue> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Arc::new(handler),
            opened: Mutex::new(Vec::new()),
            clusters: Mutex::new(Vec::new()),
            refused: Mutex::new(HashSet::new()),
        })
    }

    /// Make connection attempts to `address` fail
    pub fn refuse(&self, address: ServerAddress) {
        self.refused.lock().unwrap().insert(address);
    }

    pub fn accept(&self, address: &ServerAddress) {
        self.refused.lock().unwrap().remove(address);
    }

    pub fn connect_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Addresses in the order they were connected to
    pub fn connected_addresses(&self) -> Vec<ServerAddress> {
        self.opened.lock().unwrap().iter().map(|t| t.address.clone()).collect()
    }

    /// Every connection opened, in order
    pub fn opened(&self) -> Vec<Arc<ScriptedTransport>> {
        self.opened.lock().unwrap().clone()
    }

    /// Slot-routed cluster connections, in the order they were opened
    pub fn cluster_links(&self) -> Vec<Arc<ScriptedTransport>> {
        self.clusters.lock().unwrap().clone()
    }

    /// Most recent connection to `address`
    pub fn last_to(&self, address: &ServerAddress) -> Option<Arc<ScriptedTransport>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|t| &t.address == address)
            .cloned()
    }

    /// Every command sent to `address`, across all its connections
    pub fn sent_to(&self, address: &ServerAddress) -> Vec<Command> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.address == address)
            .flat_map(|t| t.sent())
            .collect()
    }
}

impl ScriptedConnector {
    fn open(&self, address: &ServerAddress, faults: FaultSink) -> GraphResult<Arc<ScriptedTransport>> {
        if self.refused.lock().unwrap().contains(address) {
            return Err(GraphError::Transport(format!("Connection refused by {}", address)));
        }
        let transport = Arc::new(ScriptedTransport {
            id: ConnectionId::next(),
            address: address.clone(),
            handler: self.handler.clone(),
            faults,
            broken: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        });
        self.opened.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        address: &ServerAddress,
        _options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Arc<dyn Transport>> {
        let transport = self.open(address, faults)?;
        Ok(transport)
    }

    /// The cluster link answers as its first seed does
    async fn connect_cluster(
        &self,
        seeds: &[ServerAddress],
        _options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Arc<dyn Transport>> {
        let seed = seeds
            .first()
            .ok_or_else(|| GraphError::Config("No cluster seed nodes".to_string()))?;
        let transport = self.open(seed, faults)?;
        self.clusters.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}

pub fn bulk(s: &str) -> RespValue {
    RespValue::bulk(s)
}

pub fn int(i: i64) -> RespValue {
    RespValue::Integer(i)
}

pub fn arr(items: Vec<RespValue>) -> RespValue {
    RespValue::Array(items)
}

pub fn ok() -> RespValue {
    RespValue::SimpleString("OK".to_string())
}

/// `INFO server` text for the given `redis_mode`
pub fn server_info(mode: &str) -> RespValue {
    bulk(&format!(
        "# Server\r\nredis_version:7.2.4\r\nredis_mode:{}\r\ntcp_port:6379\r\n",
        mode
    ))
}

pub fn stats(lines: &[&str]) -> RespValue {
    arr(lines.iter().map(|l| bulk(l)).collect())
}

/// Reply of a query without a result set: `[[stats...]]`
pub fn stats_reply(lines: &[&str]) -> RespValue {
    arr(vec![stats(lines)])
}

/// Compact reply with `[type, name]` headers
pub fn compact_reply(headers: &[&str], rows: Vec<Vec<RespValue>>) -> RespValue {
    arr(vec![
        arr(headers.iter().map(|h| arr(vec![int(1), bulk(h)])).collect()),
        arr(rows.into_iter().map(arr).collect()),
        stats(&["Cached execution: 0", "Query internal execution time: 0.2 milliseconds"]),
    ])
}

/// Verbose single-column reply, as returned by `CALL db.labels()` and friends
pub fn column_reply(column: &str, values: &[&str]) -> RespValue {
    arr(vec![
        arr(vec![bulk(column)]),
        arr(values.iter().map(|v| arr(vec![bulk(v)])).collect()),
        stats(&["Query internal execution time: 0.1 milliseconds"]),
    ])
}

/// Tagged node cell: `[8, [id, [labels], [[key, tag, value]...]]]`
pub fn node_cell(id: i64, labels: &[i64], props: Vec<(i64, i64, RespValue)>) -> RespValue {
    arr(vec![
        int(8),
        arr(vec![
            int(id),
            arr(labels.iter().map(|l| int(*l)).collect()),
            arr(props.into_iter().map(|(k, tag, v)| arr(vec![int(k), int(tag), v])).collect()),
        ]),
    ])
}

/// Tagged edge cell
pub fn edge_cell(id: i64, rel: i64, src: i64, dst: i64) -> RespValue {
    arr(vec![int(7), arr(vec![int(id), int(rel), int(src), int(dst), arr(vec![])])])
}

pub fn string_cell(s: &str) -> RespValue {
    arr(vec![int(2), bulk(s)])
}

/// Answers to the three schema procedures
pub fn schema_reply(cmd: &Command, labels: &[&str], types: &[&str], keys: &[&str]) -> Option<RespValue> {
    let text = cmd.args().get(2)?;
    match text.as_str() {
        "CALL db.labels()" => Some(column_reply("label", labels)),
        "CALL db.relationshipTypes()" => Some(column_reply("relationshipType", types)),
        "CALL db.propertyKeys()" => Some(column_reply("propertyKey", keys)),
        _ => None,
    }
}

pub fn sentinel_master_entry(name: &str, address: &ServerAddress) -> RespValue {
    arr(vec![
        bulk("name"),
        bulk(name),
        bulk("ip"),
        bulk(&address.host),
        bulk("port"),
        bulk(&address.port.to_string()),
        bulk("flags"),
        bulk("master"),
    ])
}

pub fn unexpected(cmd: &Command) -> GraphResult<RespValue> {
    Ok(RespValue::Error(format!("ERR unexpected command '{}'", cmd)))
}
