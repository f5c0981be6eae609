mod common;

use common::*;
use futures::future::join_all;
use redigraph::query::MetadataCategory;
use redigraph::{GraphDb, GraphError, GraphValue, NodeId, RespValue, ServerAddress};
use std::sync::Arc;

const LABELS: &[&str] = &["Company", "Team", "City", "Person"];
const TYPES: &[&str] = &["KNOWS", "WORKS_AT"];
const KEYS: &[&str] = &["name", "age"];

/// A standalone server whose queries all answer `reply`
async fn db_answering(reply: RespValue) -> (GraphDb, Arc<ScriptedConnector>) {
    let connector = ScriptedConnector::new(move |_, cmd| match cmd.name() {
        "INFO" => Ok(server_info("standalone")),
        "GRAPH.RO_QUERY" | "GRAPH.QUERY" => Ok(schema_reply(cmd, LABELS, TYPES, KEYS).unwrap_or_else(|| reply.clone())),
        _ => unexpected(cmd),
    });
    let db = GraphDb::connect_with(Default::default(), connector.clone()).await.unwrap();
    (db, connector)
}

fn schema_fetches(connector: &ScriptedConnector) -> usize {
    connector
        .sent_to(&ServerAddress::new("127.0.0.1", 6379))
        .iter()
        .filter(|cmd| cmd.args().get(2).map(|q| q.as_str()) == Some("CALL db.labels()"))
        .count()
}

#[tokio::test]
async fn test_string_cell() {
    let (db, _) = db_answering(compact_reply(&["name"], vec![vec![string_cell("Alice")]])).await;
    let reply = db.select_graph("social").query("RETURN 'Alice' AS name").await.unwrap();

    assert_eq!(reply.headers, Some(vec!["name".to_string()]));
    assert_eq!(reply.rows()[0]["name"], GraphValue::from("Alice"));
}

#[tokio::test]
async fn test_node_resolves_labels_and_keys() {
    let node = node_cell(7, &[3], vec![(0, 2, bulk("Bob"))]);
    let (db, connector) = db_answering(compact_reply(&["n"], vec![vec![node]])).await;
    let graph = db.select_graph("social");

    let reply = graph.ro_query("MATCH (n:Person) RETURN n").await.unwrap();
    let node = reply.rows()[0]["n"].as_node().unwrap();
    assert_eq!(node.id, NodeId::new(7));
    assert_eq!(node.labels, vec!["Person".to_string()]);
    assert_eq!(node.get("name"), Some(&GraphValue::from("Bob")));

    // Schema procedures are read-only and verbose
    let fetch = connector
        .sent_to(&ServerAddress::new("127.0.0.1", 6379))
        .into_iter()
        .find(|cmd| cmd.args().get(2).map(|q| q.as_str()) == Some("CALL db.labels()"))
        .unwrap();
    assert_eq!(fetch.name(), "GRAPH.RO_QUERY");
    assert!(!fetch.args().iter().any(|a| a == "--compact"));
}

#[tokio::test]
async fn test_metadata_only_reply() {
    let (db, connector) = db_answering(stats_reply(&["Nodes created: 1", "Properties set: 1"])).await;
    let reply = db.select_graph("social").query("CREATE (:Person {name: 'Eve'})").await.unwrap();

    assert_eq!(reply.headers, None);
    assert_eq!(reply.data, None);
    assert_eq!(reply.metadata, vec!["Nodes created: 1", "Properties set: 1"]);
    assert_eq!(reply.statistics().nodes_created(), 1);
    assert_eq!(schema_fetches(&connector), 0);
}

#[tokio::test]
async fn test_multi_row_reply_refreshes_once() {
    let rows = (0..20)
        .map(|i| vec![node_cell(i, &[i % 4], vec![(1, 3, int(i))]), edge_cell(i, 1, i, i + 1)])
        .collect();
    let (db, connector) = db_answering(compact_reply(&["n", "r"], rows)).await;
    let graph = db.select_graph("social");

    let reply = graph.query("MATCH (n)-[r]->() RETURN n, r").await.unwrap();
    assert_eq!(reply.rows().len(), 20);
    assert_eq!(reply.rows()[5]["r"].as_edge().unwrap().relationship_type, "WORKS_AT");
    assert_eq!(reply.rows()[3]["n"].as_node().unwrap().labels, vec!["Person".to_string()]);
    assert_eq!(graph.metadata().refresh_count(), 1);
    assert_eq!(schema_fetches(&connector), 1);
}

#[tokio::test]
async fn test_concurrent_queries_share_refresh() {
    let node = node_cell(1, &[0, 2], vec![(0, 2, bulk("Acme"))]);
    let (db, connector) = db_answering(compact_reply(&["n"], vec![vec![node]])).await;
    let graph = db.select_graph("social");

    let queries = (0..10).map(|_| graph.query("MATCH (n) RETURN n"));
    for reply in join_all(queries).await {
        let reply = reply.unwrap();
        assert_eq!(reply.rows()[0]["n"].as_node().unwrap().labels, vec!["Company", "City"]);
    }
    assert_eq!(graph.metadata().refresh_count(), 1);
    assert_eq!(schema_fetches(&connector), 1);
}

#[tokio::test]
async fn test_separate_handles_keep_separate_caches() {
    let node = node_cell(1, &[3], vec![]);
    let (db, connector) = db_answering(compact_reply(&["n"], vec![vec![node]])).await;

    db.select_graph("social").query("MATCH (n) RETURN n").await.unwrap();
    db.select_graph("social").query("MATCH (n) RETURN n").await.unwrap();
    assert_eq!(schema_fetches(&connector), 2);
}

#[tokio::test]
async fn test_unknown_id_after_refresh_fails() {
    let node = node_cell(1, &[9], vec![]);
    let (db, _) = db_answering(compact_reply(&["n"], vec![vec![node]])).await;

    let err = db.select_graph("social").query("MATCH (n) RETURN n").await.unwrap_err();
    assert!(matches!(err, GraphError::MetadataResolution { id: 9, .. }));
    assert_eq!(err.to_string(), "Cannot find value from labels[9]");
}

#[tokio::test]
async fn test_unknown_tag_is_protocol_error() {
    let cell = arr(vec![int(42), bulk("?")]);
    let (db, _) = db_answering(compact_reply(&["x"], vec![vec![cell]])).await;

    let err = db.select_graph("social").query("RETURN x").await.unwrap_err();
    assert!(matches!(&err, GraphError::Protocol(m) if m.contains("42")));
}

#[tokio::test]
async fn test_server_error_rejects_only_that_query() {
    let connector = ScriptedConnector::new(|_, cmd| match cmd.name() {
        "INFO" => Ok(server_info("standalone")),
        "GRAPH.QUERY" if cmd.args()[2].contains("bad") => Ok(RespValue::Error("ERR Invalid input".into())),
        "GRAPH.QUERY" => Ok(stats_reply(&["Nodes created: 0"])),
        _ => unexpected(cmd),
    });
    let db = GraphDb::connect_with(Default::default(), connector).await.unwrap();
    let graph = db.select_graph("g");

    assert!(matches!(graph.query("bad").await, Err(GraphError::Server(m)) if m == "ERR Invalid input"));
    assert!(graph.query("RETURN 1").await.is_ok());
}

#[tokio::test]
async fn test_decoded_path_names_map_back_to_wire_ids() {
    let alice = node_cell(1, &[3, 1], vec![(0, 2, bulk("Alice"))]);
    let acme = node_cell(2, &[0], vec![]);
    let berlin = node_cell(3, &[2], vec![]);
    let member = |cell: RespValue| cell.as_array().unwrap()[1].clone();
    let path = arr(vec![
        int(9),
        arr(vec![
            arr(vec![
                int(6),
                arr(vec![
                    arr(vec![int(8), member(alice)]),
                    arr(vec![int(8), member(acme)]),
                    arr(vec![int(8), member(berlin)]),
                ]),
            ]),
            arr(vec![
                int(6),
                arr(vec![
                    arr(vec![int(7), member(edge_cell(10, 1, 1, 2))]),
                    arr(vec![int(7), member(edge_cell(11, 0, 2, 3))]),
                ]),
            ]),
        ]),
    ]);
    let (db, _) = db_answering(compact_reply(&["p"], vec![vec![path]])).await;
    let graph = db.select_graph("social");

    let reply = graph.query("MATCH p = (:Person)-->()-->() RETURN p").await.unwrap();
    let path = reply.rows()[0]["p"].as_path().unwrap();
    let snapshot = graph.metadata().snapshot();

    let label_ids: Vec<Vec<i64>> = path
        .nodes
        .iter()
        .map(|node| {
            node.labels
                .iter()
                .map(|l| snapshot.id_of(MetadataCategory::Labels, l).unwrap())
                .collect()
        })
        .collect();
    assert_eq!(label_ids, vec![vec![3, 1], vec![0], vec![2]]);

    let type_ids: Vec<i64> = path
        .edges
        .iter()
        .map(|edge| {
            snapshot
                .id_of(MetadataCategory::RelationshipTypes, &edge.relationship_type)
                .unwrap()
        })
        .collect();
    assert_eq!(type_ids, vec![1, 0]);
    assert_eq!(path.nodes[0].labels, vec!["Person".to_string(), "Team".to_string()]);
    assert_eq!(
        snapshot.id_of(MetadataCategory::PropertyKeys, "name"),
        Some(0)
    );
}
