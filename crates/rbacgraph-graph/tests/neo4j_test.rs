//! Store contract against a live Neo4j.
//! Run with: cargo test -p rbacgraph-graph --test neo4j_test -- --ignored

use rbacgraph_core::{Edge, Node};
use rbacgraph_graph::{
    Endpoint, GraphClient, GraphConfig, GraphStore, Neo4jStore, NodeUpsert, StoreError, schema,
};

async fn store() -> Neo4jStore {
    let config = GraphConfig {
        uri: std::env::var("NEO4J_URI").expect("NEO4J_URI required"),
        user: std::env::var("NEO4J_USER").expect("NEO4J_USER required"),
        password: std::env::var("NEO4J_PASSWORD").expect("NEO4J_PASSWORD required"),
        ..GraphConfig::default()
    };
    let client = GraphClient::connect(&config).await.expect("Failed to connect");
    schema::initialize_schema(&client).await.expect("Failed to initialize schema");
    Neo4jStore::new(client)
}

#[tokio::test]
#[ignore] // requires live Neo4j credentials
async fn upserts_are_idempotent() {
    let store = store().await;
    store.clear().await.unwrap();

    let principal = Node::new("p1", "a1", "ServicePrincipal", Some("westeurope".to_string()));
    let group = Node::new("/subscriptions/s1/resourceGroups/rg", "rg", "Microsoft.Resources/resourceGroups", None);

    assert_eq!(store.upsert_node(&principal).await.unwrap(), NodeUpsert::Created);
    assert_eq!(store.upsert_node(&principal).await.unwrap(), NodeUpsert::AlreadyPresent);
    store.upsert_node(&group).await.unwrap();

    let edge = Edge::has_role("p1", &group.id, "/roles/reader");
    store.upsert_edge(&edge).await.unwrap();
    store.upsert_edge(&edge).await.unwrap();

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.nodes, 2);
    assert_eq!(counts.relationships, 1);

    let err = store.upsert_edge(&Edge::assigned_to("p1", "missing")).await.unwrap_err();
    assert!(matches!(err, StoreError::DanglingReference { endpoint: Endpoint::Target, .. }));

    store.clear().await.unwrap();
    assert!(!store.node_exists("p1").await.unwrap());
}
