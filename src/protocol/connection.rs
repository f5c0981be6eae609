//! Connections opened through the `redis` crate
//!
//! [`RedisConnection`] wraps a multiplexed connection. Its driver task
//! matches each reply to the request that asked for it, so a caller that
//! gives up on a call never shifts the replies seen by later ones.

use crate::config::{ConnectionOptions, ServerAddress};
use crate::error::{GraphError, GraphResult};
use crate::protocol::cluster::ClusterTransport;
use crate::protocol::command::{self, Command};
use crate::protocol::resp::RespValue;
use crate::protocol::transport::{ConnectionId, Connector, FaultSink, Transport, TransportFault};
use async_trait::async_trait;
use redis::aio::{ConnectionLike, MultiplexedConnection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// `redis` connection parameters for one node
pub(crate) fn connection_info(address: &ServerAddress, options: &ConnectionOptions) -> redis::ConnectionInfo {
    redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(address.host.clone(), address.port),
        redis: redis::RedisConnectionInfo {
            db: i64::from(options.db),
            username: options.username.clone(),
            password: options.password.clone(),
            ..Default::default()
        },
    }
}

/// Whether the connection is gone, as opposed to the request being refused
pub(crate) fn is_connection_error(e: &redis::RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// A refusal from the server, as the error frame it arrived as
pub(crate) fn error_frame(e: &redis::RedisError) -> RespValue {
    match (e.code(), e.detail()) {
        (Some(code), Some(detail)) => RespValue::Error(format!("{} {}", code, detail)),
        (Some(code), None) => RespValue::Error(code.to_string()),
        _ => RespValue::Error(e.to_string()),
    }
}

/// Map a failed connection attempt
pub(crate) fn connect_error(address: &ServerAddress, e: redis::RedisError) -> GraphError {
    if is_connection_error(&e) {
        GraphError::Transport(format!("Failed to connect to {}: {}", address, e))
    } else {
        match error_frame(&e) {
            RespValue::Error(message) => GraphError::Server(message),
            _ => GraphError::Server(e.to_string()),
        }
    }
}

/// One multiplexed connection to one server
pub struct RedisConnection {
    id: ConnectionId,
    address: ServerAddress,
    connection: RwLock<Option<MultiplexedConnection>>,
    broken: AtomicBool,
    faults: FaultSink,
}

impl RedisConnection {
    /// Connect, authenticate and select the database, then name the client
    pub async fn connect(
        address: &ServerAddress,
        options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Self> {
        let client = redis::Client::open(connection_info(address, options))
            .map_err(|e| GraphError::Config(format!("Invalid address {}: {}", address, e)))?;

        let connection =
            match tokio::time::timeout(options.connect_timeout(), client.get_multiplexed_async_connection()).await {
                Ok(Ok(connection)) => connection,
                Ok(Err(e)) => return Err(connect_error(address, e)),
                Err(_) => {
                    return Err(GraphError::Transport(format!(
                        "Timed out connecting to {} after {}ms",
                        address, options.connect_timeout_ms
                    )))
                }
            };

        let connection = Self {
            id: ConnectionId::next(),
            address: address.clone(),
            connection: RwLock::new(Some(connection)),
            broken: AtomicBool::new(false),
            faults,
        };

        if let Some(name) = options.client_name.as_deref() {
            connection.execute(&command::client_setname(name)).await?;
        }

        info!("Connected to {} ({})", connection.address, connection.id);
        Ok(connection)
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    /// Mark broken and report the fault once
    fn fail(&self, cause: &redis::RedisError) -> GraphError {
        let message = format!("{} ({}): {}", self.address, self.id, cause);
        if !self.broken.swap(true, Ordering::SeqCst) {
            warn!("Connection failure on {}", message);
            let fault = TransportFault {
                connection: self.id,
                error: Arc::new(GraphError::Transport(message.clone())),
            };
            if self.faults.send(fault).is_err() {
                debug!("No fault listener for {}", self.id);
            }
        }
        GraphError::Transport(message)
    }
}

#[async_trait]
impl Transport for RedisConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn address(&self) -> &ServerAddress {
        &self.address
    }

    async fn execute_raw(&self, cmd: &Command) -> GraphResult<RespValue> {
        let mut connection = self.connection.read().await.clone().ok_or_else(|| {
            GraphError::Transport(format!("Connection to {} is closed", self.address))
        })?;

        debug!("{} -> {}", self.id, cmd.name());
        let request = cmd.to_redis_cmd();
        match connection.req_packed_command(&request).await {
            Ok(value) => Ok(RespValue::from(value)),
            Err(e) if is_connection_error(&e) => {
                self.connection.write().await.take();
                Err(self.fail(&e))
            }
            Err(e) => Ok(error_frame(&e)),
        }
    }

    async fn disconnect(&self) {
        // A deliberate close is not a fault
        self.broken.store(true, Ordering::SeqCst);
        if self.connection.write().await.take().is_some() {
            debug!("Disconnected from {} ({})", self.address, self.id);
        }
    }
}

/// Opens connections with the `redis` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl Connector for RedisConnector {
    async fn connect(
        &self,
        address: &ServerAddress,
        options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Arc<dyn Transport>> {
        let connection = RedisConnection::connect(address, options, faults).await?;
        Ok(Arc::new(connection))
    }

    async fn connect_cluster(
        &self,
        seeds: &[ServerAddress],
        options: &ConnectionOptions,
        faults: FaultSink,
    ) -> GraphResult<Arc<dyn Transport>> {
        let cluster = ClusterTransport::connect(seeds, options, faults).await?;
        Ok(Arc::new(cluster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::transport::fault_channel;
    use std::io::{BufReader, Write};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Serve one client from a thread. `reply` maps each request to the raw
    /// bytes to answer with, or `None` to hang up.
    fn serve<F>(reply: F) -> ServerAddress
    where
        F: Fn(&[String]) -> Option<Vec<u8>> + Send + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(socket.try_clone().unwrap());
            let mut parser = redis::Parser::new();
            while let Ok(request) = parser.parse_value(&mut reader) {
                let args: Vec<String> = match request {
                    redis::Value::Array(items) => items
                        .iter()
                        .map(|v| redis::from_redis_value::<String>(v).unwrap_or_default())
                        .collect(),
                    _ => continue,
                };
                match reply(&args) {
                    Some(bytes) => {
                        if socket.write_all(&bytes).is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });
        ServerAddress::new("127.0.0.1", port)
    }

    fn bulk_bytes(s: &str) -> Vec<u8> {
        format!("${}\r\n{}\r\n", s.len(), s).into_bytes()
    }

    #[tokio::test]
    async fn test_round_trip_then_fault_on_close() {
        let pings = AtomicUsize::new(0);
        let address = serve(move |args| match args[0].as_str() {
            "PING" if pings.fetch_add(1, Ordering::SeqCst) == 0 => Some(b"+PONG\r\n".to_vec()),
            "PING" => None,
            _ => Some(b"+OK\r\n".to_vec()),
        });
        let (sink, mut faults) = fault_channel();
        let conn = RedisConnection::connect(&address, &ConnectionOptions::default(), sink)
            .await
            .unwrap();

        let reply = conn.execute(&command::ping()).await.unwrap();
        assert_eq!(reply, RespValue::SimpleString("PONG".into()));

        let err = conn.execute(&command::ping()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(conn.is_broken());

        let fault = faults.recv().await.unwrap();
        assert_eq!(fault.connection, conn.id());

        // Further calls fail without a second fault
        assert!(conn.execute(&command::ping()).await.is_err());
        assert!(faults.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_error_reply_is_not_a_fault() {
        let address = serve(|args| match args[0].as_str() {
            "PING" => Some(b"-ERR unknown command\r\n".to_vec()),
            _ => Some(b"+OK\r\n".to_vec()),
        });
        let (sink, mut faults) = fault_channel();
        let conn = RedisConnection::connect(&address, &ConnectionOptions::default(), sink)
            .await
            .unwrap();

        let err = conn.execute(&command::ping()).await.unwrap_err();
        assert!(matches!(err, GraphError::Server(ref m) if m == "ERR unknown command"));
        assert!(!conn.is_broken());
        assert!(faults.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_abandoned_call_does_not_shift_replies() {
        let address = serve(|args| match (args[0].as_str(), args.get(1).map(String::as_str)) {
            ("ECHO", Some(text)) => {
                if text == "slow" {
                    std::thread::sleep(Duration::from_millis(300));
                }
                Some(bulk_bytes(text))
            }
            _ => Some(b"+OK\r\n".to_vec()),
        });
        let (sink, _faults) = fault_channel();
        let conn = RedisConnection::connect(&address, &ConnectionOptions::default(), sink)
            .await
            .unwrap();

        let slow = Command::new("ECHO").arg("slow");
        let abandoned = tokio::time::timeout(Duration::from_millis(50), conn.execute(&slow)).await;
        assert!(abandoned.is_err());

        let reply = conn.execute(&Command::new("ECHO").arg("fast")).await.unwrap();
        assert_eq!(reply, RespValue::bulk("fast"));
        assert!(!conn.is_broken());
    }

    #[tokio::test]
    async fn test_reply_shorter_than_its_header_is_a_fault() {
        let address = serve(|args| match args[0].as_str() {
            // Announces 1000 elements, sends one, then hangs up
            "GRAPH.LIST" => {
                let mut bytes = b"*1000\r\n".to_vec();
                bytes.extend(bulk_bytes("only"));
                Some(bytes)
            }
            "PING" => None,
            _ => Some(b"+OK\r\n".to_vec()),
        });
        let (sink, mut faults) = fault_channel();
        let conn = RedisConnection::connect(&address, &ConnectionOptions::default(), sink)
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), conn.execute(&command::list())).await;
        // The frame is still incomplete, so the call waits instead of guessing
        assert!(first.is_err());

        let err = tokio::time::timeout(Duration::from_secs(5), conn.execute(&command::ping()))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(faults.recv().await.unwrap().connection, conn.id());
    }

    #[tokio::test]
    async fn test_client_name_is_sent() {
        let named = Arc::new(std::sync::Mutex::new(None));
        let seen = named.clone();
        let address = serve(move |args| {
            if args.len() == 3 && args[0] == "CLIENT" && args[1] == "SETNAME" {
                *seen.lock().unwrap() = Some(args[2].clone());
            }
            Some(b"+OK\r\n".to_vec())
        });
        let options = ConnectionOptions {
            client_name: Some("reporting".to_string()),
            ..ConnectionOptions::default()
        };
        let (sink, _faults) = fault_channel();
        RedisConnection::connect(&address, &options, sink).await.unwrap();
        assert_eq!(named.lock().unwrap().as_deref(), Some("reporting"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (sink, _faults) = fault_channel();
        let result = RedisConnector
            .connect(&ServerAddress::new("127.0.0.1", port), &ConnectionOptions::default(), sink)
            .await;
        assert!(matches!(result, Err(GraphError::Transport(_))));
    }

    #[test]
    fn test_connection_info() {
        let options = ConnectionOptions {
            username: Some("alice".to_string()),
            password: Some("secret".to_string()),
            db: 2,
            ..ConnectionOptions::default()
        };
        let info = connection_info(&ServerAddress::new("db.local", 6380), &options);
        assert_eq!(info.addr, redis::ConnectionAddr::Tcp("db.local".to_string(), 6380));
        assert_eq!(info.redis.db, 2);
        assert_eq!(info.redis.username.as_deref(), Some("alice"));
        assert_eq!(info.redis.password.as_deref(), Some("secret"));
    }
}
