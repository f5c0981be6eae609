//! Command argument arrays for GRAPH.* and supporting admin commands
//!
//! Every builder returns a [`Command`]; none of them talk to the network.

use crate::query::params::{build_query_text, QueryOptions};
use std::fmt;

/// A command ready to be sent: name plus arguments, all bulk strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
    /// Index of the key argument
    key_index: Option<usize>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            args: vec![name.into()],
            key_index: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Push an argument and remember it as the command's key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key_index = Some(self.args.len());
        self.args.push(key.into());
        self
    }

    pub fn args_from<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.args[0]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn key_arg(&self) -> Option<&str> {
        self.key_index.map(|i| self.args[i].as_str())
    }

    /// The same arguments as a `redis` command
    pub fn to_redis_cmd(&self) -> redis::Cmd {
        let mut cmd = redis::cmd(self.name());
        for arg in &self.args[1..] {
            cmd.arg(arg.as_str());
        }
        cmd
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Constraint kind for `GRAPH.CONSTRAINT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    Mandatory,
    Unique,
}

impl ConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::Mandatory => "MANDATORY",
            ConstraintType::Unique => "UNIQUE",
        }
    }
}

/// Entity kind a constraint applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Node,
    Relationship,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Node => "NODE",
            EntityType::Relationship => "RELATIONSHIP",
        }
    }
}

/// `GRAPH.QUERY` / `GRAPH.RO_QUERY` argument layout shared by both commands:
/// `<cmd> graph <text> [TIMEOUT ms] [--compact]`
fn query_command(name: &str, graph: &str, query: &str, options: &QueryOptions, compact: bool) -> Command {
    let mut cmd = Command::new(name)
        .key(graph)
        .arg(build_query_text(query, options.params.as_ref()));
    if let Some(timeout) = options.timeout {
        cmd = cmd.arg("TIMEOUT").arg(timeout.to_string());
    }
    if compact {
        cmd = cmd.arg("--compact");
    }
    cmd
}

pub fn query(graph: &str, query: &str, options: &QueryOptions, compact: bool) -> Command {
    query_command("GRAPH.QUERY", graph, query, options, compact)
}

pub fn ro_query(graph: &str, query: &str, options: &QueryOptions, compact: bool) -> Command {
    query_command("GRAPH.RO_QUERY", graph, query, options, compact)
}

pub fn delete(graph: &str) -> Command {
    Command::new("GRAPH.DELETE").key(graph)
}

pub fn list() -> Command {
    Command::new("GRAPH.LIST")
}

pub fn explain(graph: &str, query: &str) -> Command {
    Command::new("GRAPH.EXPLAIN").key(graph).arg(query)
}

pub fn profile(graph: &str, query: &str) -> Command {
    Command::new("GRAPH.PROFILE").key(graph).arg(query)
}

pub fn copy(src_graph: &str, dest_graph: &str) -> Command {
    Command::new("GRAPH.COPY").key(src_graph).arg(dest_graph)
}

pub fn slow_log(graph: &str) -> Command {
    Command::new("GRAPH.SLOWLOG").key(graph)
}

pub fn memory_usage(graph: &str, samples: Option<u32>) -> Command {
    let cmd = Command::new("GRAPH.MEMORY").arg("USAGE").key(graph);
    match samples {
        Some(samples) if samples > 0 => cmd.arg(samples.to_string()),
        _ => cmd,
    }
}

pub fn config_get(key: &str) -> Command {
    Command::new("GRAPH.CONFIG").arg("GET").arg(key)
}

pub fn config_set(key: &str, value: &str) -> Command {
    Command::new("GRAPH.CONFIG").arg("SET").arg(key).arg(value)
}

pub fn info(section: Option<&str>) -> Command {
    let cmd = Command::new("GRAPH.INFO");
    match section {
        Some(section) if !section.is_empty() => cmd.arg(section),
        _ => cmd,
    }
}

/// `GRAPH.CONSTRAINT CREATE|DROP key type entity label PROPERTIES n p...`
fn constraint(
    action: &str,
    graph: &str,
    constraint_type: ConstraintType,
    entity_type: EntityType,
    label: &str,
    properties: &[&str],
) -> Command {
    Command::new("GRAPH.CONSTRAINT")
        .arg(action)
        .key(graph)
        .arg(constraint_type.as_str())
        .arg(entity_type.as_str())
        .arg(label)
        .arg("PROPERTIES")
        .arg(properties.len().to_string())
        .args_from(properties.iter().copied())
}

pub fn constraint_create(
    graph: &str,
    constraint_type: ConstraintType,
    entity_type: EntityType,
    label: &str,
    properties: &[&str],
) -> Command {
    constraint("CREATE", graph, constraint_type, entity_type, label, properties)
}

pub fn constraint_drop(
    graph: &str,
    constraint_type: ConstraintType,
    entity_type: EntityType,
    label: &str,
    properties: &[&str],
) -> Command {
    constraint("DROP", graph, constraint_type, entity_type, label, properties)
}

pub fn udf_load(name: &str, script: &str, replace: bool) -> Command {
    let mut cmd = Command::new("GRAPH.UDF").arg("LOAD");
    if replace {
        cmd = cmd.arg("REPLACE");
    }
    cmd.arg(name).arg(script)
}

pub fn udf_list(lib: Option<&str>, with_code: bool) -> Command {
    let mut cmd = Command::new("GRAPH.UDF").arg("LIST");
    if let Some(lib) = lib {
        cmd = cmd.arg(lib);
    }
    if with_code {
        cmd = cmd.arg("WITHCODE");
    }
    cmd
}

pub fn udf_flush() -> Command {
    Command::new("GRAPH.UDF").arg("FLUSH")
}

pub fn udf_delete(lib: &str) -> Command {
    Command::new("GRAPH.UDF").arg("DELETE").arg(lib)
}

pub fn sentinel_masters() -> Command {
    Command::new("SENTINEL").arg("MASTERS")
}

pub fn sentinel_master(name: &str) -> Command {
    Command::new("SENTINEL").arg("MASTER").arg(name)
}

/// Server self-report used for topology detection
pub fn server_info() -> Command {
    Command::new("INFO").arg("server")
}

pub fn cluster_nodes() -> Command {
    Command::new("CLUSTER").arg("NODES")
}

pub fn client_setname(name: &str) -> Command {
    Command::new("CLIENT").arg("SETNAME").arg(name)
}

pub fn ping() -> Command {
    Command::new("PING")
}
