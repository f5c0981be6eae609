//! Connection configuration
//!
//! Options can be built in code, parsed from a `falkor://` URL, or loaded
//! from YAML.

use crate::error::{GraphError, GraphResult};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted by [`ConnectionOptions::from_env`]
pub const URL_ENV_VAR: &str = "FALKORDB_URL";

/// A `host:port` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`; IPv6 hosts may be bracketed
    pub fn parse(s: &str) -> GraphResult<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| GraphError::Config(format!("Missing port in address '{}'", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| GraphError::Config(format!("Invalid port in address '{}': {}", s, e)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(GraphError::Config(format!("Missing host in address '{}'", s)));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Connection options shared by every topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Server (or Sentinel) host
    pub host: String,
    /// Server (or Sentinel) port
    pub port: u16,
    /// ACL username
    pub username: Option<String>,
    /// ACL password or the legacy `requirepass` password
    pub password: Option<String>,
    /// Sent with `CLIENT SETNAME`
    pub client_name: Option<String>,
    /// Logical database selected after connecting
    pub db: u16,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Restrict Sentinel master resolution to this master name
    pub sentinel_master_name: Option<String>,
    /// Retries the cluster client makes for one command, redirects included
    pub max_redirections: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            client_name: None,
            db: 0,
            connect_timeout_ms: 5_000,
            sentinel_master_name: None,
            max_redirections: 16,
        }
    }
}

impl ConnectionOptions {
    /// Parse `falkor://[[username][:password]@][host][:port][/db-number]`.
    ///
    /// `redis://` is accepted as an alias. TLS schemes are rejected.
    pub fn from_url(url: &str) -> GraphResult<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| GraphError::Config(format!("Invalid URL '{}'", url)))?;
        match scheme {
            "falkor" | "falkordb" | "redis" => {}
            "falkors" | "rediss" => {
                return Err(GraphError::Config(format!(
                    "TLS scheme '{}' is not supported",
                    scheme
                )))
            }
            other => {
                return Err(GraphError::Config(format!(
                    "Unsupported URL scheme '{}'",
                    other
                )))
            }
        }

        let mut options = Self::default();

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (rest, None),
        };

        let host_port = match authority.rsplit_once('@') {
            Some((user_info, host_port)) => {
                let (user, pass) = match user_info.split_once(':') {
                    Some((user, pass)) => (user, Some(pass)),
                    None => (user_info, None),
                };
                if !user.is_empty() {
                    options.username = Some(decode_component(user)?);
                }
                if let Some(pass) = pass {
                    options.password = Some(decode_component(pass)?);
                }
                host_port
            }
            None => authority,
        };

        if !host_port.is_empty() {
            if host_port.ends_with(']') || !host_port.contains(':') {
                options.host = host_port
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .to_string();
            } else {
                let address = ServerAddress::parse(host_port)?;
                options.host = address.host;
                options.port = address.port;
            }
        }

        if let Some(path) = path.filter(|p| !p.is_empty()) {
            options.db = path
                .parse::<u16>()
                .map_err(|e| GraphError::Config(format!("Invalid database number '{}': {}", path, e)))?;
        }

        Ok(options)
    }

    /// Parse options from a YAML document
    pub fn from_yaml_str(yaml: &str) -> GraphResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load options from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> GraphResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Options from `FALKORDB_URL`, or defaults when it is unset
    pub fn from_env() -> GraphResult<Self> {
        match std::env::var(URL_ENV_VAR) {
            Ok(url) => Self::from_url(&url),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn address(&self) -> ServerAddress {
        ServerAddress::new(self.host.clone(), self.port)
    }

    /// Same credentials and settings, different endpoint
    pub fn with_address(&self, address: &ServerAddress) -> Self {
        Self {
            host: address.host.clone(),
            port: address.port,
            ..self.clone()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn decode_component(s: &str) -> GraphResult<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|e| GraphError::Config(format!("Invalid URL encoding: {}", e)))
}
