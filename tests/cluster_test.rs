mod common;

use common::*;
use redigraph::{ClientEvent, ConnectionOptions, GraphDb, ServerAddress, Topology, Transport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

fn node(port: u16) -> ServerAddress {
    ServerAddress::new("127.0.0.1", port)
}

const CLUSTER_NODES: &str = "\
e7d1eecc 127.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-5460
67ed2db8 127.0.0.1:7001@17001 master - 0 1426238316232 2 connected 5461-10922
292f8b36 127.0.0.1:7003@17003 master - 0 1426238318243 3 connected 10923-16383
07c37dfe 127.0.0.1:7004@17004 slave e7d1eecc 0 1426238317239 4 connected
";

fn options() -> ConnectionOptions {
    ConnectionOptions {
        port: 7000,
        ..ConnectionOptions::default()
    }
}

/// Seed on 7000 owning graph `a`, 7001 owning `b`; both hold `shared`.
/// `nodes` is what `CLUSTER NODES` currently reports.
fn cluster(nodes: Arc<Mutex<String>>) -> Arc<ScriptedConnector> {
    ScriptedConnector::new(move |address, cmd| match (address.port, cmd.name()) {
        (_, "INFO") => Ok(server_info("cluster")),
        (7000, "CLUSTER") => Ok(bulk(&nodes.lock().unwrap())),
        (7000, "GRAPH.LIST") => Ok(arr(vec![bulk("a"), bulk("shared")])),
        (7001, "GRAPH.LIST") => Ok(arr(vec![bulk("b"), bulk("shared")])),
        (_, "GRAPH.QUERY") => Ok(stats_reply(&[&format!("served by: {}", address)])),
        _ => unexpected(cmd),
    })
}

async fn connect() -> (GraphDb, Arc<ScriptedConnector>, Arc<Mutex<String>>) {
    let nodes = Arc::new(Mutex::new(CLUSTER_NODES.to_string()));
    let connector = cluster(nodes.clone());
    connector.refuse(node(7003));
    let db = GraphDb::connect_with(options(), connector.clone()).await.unwrap();
    (db, connector, nodes)
}

#[tokio::test]
async fn test_cluster_mode_opens_one_cluster_link() {
    let (db, connector, _) = connect().await;
    assert_eq!(db.topology(), Topology::Cluster);

    let links = connector.cluster_links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].address(), &node(7000));

    // The link that answered INFO is released
    let first = &connector.opened()[0];
    assert_ne!(first.id(), links[0].id());
    assert!(first.is_broken());
    assert!(!links[0].is_broken());
}

#[tokio::test]
async fn test_queries_go_through_the_cluster_link() {
    let (db, connector, _) = connect().await;
    let graph = db.select_graph("social");

    let reply = graph.query("RETURN 1").await.unwrap();
    assert_eq!(reply.metadata, vec!["served by: 127.0.0.1:7000"]);

    let link = &connector.cluster_links()[0];
    let queries: Vec<_> = link
        .sent()
        .into_iter()
        .filter(|cmd| cmd.name() == "GRAPH.QUERY")
        .collect();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].key_arg(), Some("social"));
}

#[tokio::test]
async fn test_list_fans_out_over_masters() {
    let (db, connector, _) = connect().await;

    // 7003 refuses connections and is skipped; the replica is never asked
    assert_eq!(db.list().await.unwrap(), vec!["a", "shared", "b"]);
    assert!(connector.last_to(&node(7004)).is_none());

    // Master connections are reused across listings
    let opened = connector.connect_count();
    db.list().await.unwrap();
    assert_eq!(connector.connect_count(), opened);
}

#[tokio::test]
async fn test_departed_masters_are_released() {
    let (db, connector, nodes) = connect().await;
    db.list().await.unwrap();
    let former = connector.last_to(&node(7001)).unwrap();
    assert!(!former.is_broken());

    *nodes.lock().unwrap() = CLUSTER_NODES
        .lines()
        .filter(|line| !line.contains(":7001@"))
        .map(|line| format!("{}\n", line))
        .collect();

    assert_eq!(db.list().await.unwrap(), vec!["a", "shared"]);
    assert!(former.is_broken());
}

#[tokio::test]
async fn test_cluster_link_fault_is_forwarded() {
    let (db, connector, _) = connect().await;
    let mut events = db.subscribe();

    connector.cluster_links()[0].fail("cluster down");

    let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    assert!(matches!(event, ClientEvent::Error(e) if e.to_string().contains("cluster down")));
}
