//! Neo4j-backed graph store.
//!
//! Nodes carry the `NODE` label and the properties `id`, `name`, `type` and
//! `location`. Edges use the relationship kind as their type and are merged on
//! `(source, target, kind[, role_definition_id])`.

use async_trait::async_trait;
use neo4rs::{Query, Txn};
use tracing::debug;

use rbacgraph_core::{Edge, EdgeProperties, Node};

use crate::client::{GraphClient, GraphCounts};
use crate::error::{Endpoint, StoreError, StoreResult};
use crate::store::{GraphStore, NodeUpsert};

const DELETE_EDGES: &str = "MATCH ()-[r]->() DELETE r";
const DELETE_NODES: &str = "MATCH (n) DELETE n";
const NODE_EXISTS: &str = "MATCH (n:NODE {id: $id}) RETURN n.id AS id LIMIT 1";

/// [`GraphStore`] over a Neo4j database.
#[derive(Clone)]
pub struct Neo4jStore {
    client: GraphClient,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn begin(&self) -> StoreResult<Txn> {
        Ok(self.client.inner().start_txn().await?)
    }
}

/// Look a node up inside an open transaction.
async fn node_visible(txn: &mut Txn, id: &str) -> StoreResult<bool> {
    let mut rows = txn
        .execute(Query::new(NODE_EXISTS.to_string()).param("id", id))
        .await?;
    Ok(rows.next(txn.handle()).await?.is_some())
}

fn create_node_query(node: &Node) -> Query {
    let mut cypher = "CREATE (n:NODE {id: $id, name: $name, type: $type})".to_string();
    if node.location.is_some() {
        cypher.push_str(" SET n.location = $location");
    }

    let mut query = Query::new(cypher)
        .param("id", node.id.as_str())
        .param("name", node.name.as_str())
        .param("type", node.node_type.as_str());
    if let Some(location) = &node.location {
        query = query.param("location", location.as_str());
    }
    query
}

/// Cypher for merging `edge`; extras are only written when the edge is new.
fn merge_edge_cypher(edge: &Edge) -> String {
    let pattern = match &edge.properties {
        EdgeProperties::AssignedTo => "MERGE (nf)-[r:ASSIGNED_TO]->(nt)",
        EdgeProperties::HasRole { .. } => {
            "MERGE (nf)-[r:HAS_ROLE {role_definition_id: $role_definition_id}]->(nt)"
        }
    };

    let mut cypher = format!(
        "MATCH (nf:NODE {{id: $source}})
         MATCH (nt:NODE {{id: $target}})
         {pattern}"
    );

    // Extra keys were validated as identifiers when the edge was built.
    let assignments: Vec<String> = edge
        .extra
        .keys()
        .enumerate()
        .map(|(i, key)| format!("r.{key} = $extra_{i}"))
        .collect();
    if !assignments.is_empty() {
        cypher.push_str(&format!(" ON CREATE SET {}", assignments.join(", ")));
    }
    cypher
}

fn merge_edge_query(edge: &Edge) -> Query {
    let mut query = Query::new(merge_edge_cypher(edge))
        .param("source", edge.source.as_str())
        .param("target", edge.target.as_str());
    if let Some(role) = edge.properties.role_definition_id() {
        query = query.param("role_definition_id", role);
    }
    for (i, value) in edge.extra.values().enumerate() {
        query = query.param(&format!("extra_{i}"), value.as_str());
    }
    query
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn clear(&self) -> StoreResult<()> {
        let mut txn = self.begin().await?;
        txn.run(Query::new(DELETE_EDGES.to_string())).await?;
        txn.run(Query::new(DELETE_NODES.to_string())).await?;
        txn.commit().await?;
        debug!("Cleared graph");
        Ok(())
    }

    async fn node_exists(&self, id: &str) -> StoreResult<bool> {
        let mut txn = self.begin().await?;
        let found = node_visible(&mut txn, id).await?;
        txn.commit().await?;
        Ok(found)
    }

    async fn upsert_node(&self, node: &Node) -> StoreResult<NodeUpsert> {
        if self.node_exists(&node.id).await? {
            debug!(id = %node.id, name = %node.name, "Node exists");
            return Ok(NodeUpsert::AlreadyPresent);
        }

        let mut txn = self.begin().await?;
        txn.run(create_node_query(node)).await?;
        if !node_visible(&mut txn, &node.id).await? {
            txn.rollback().await?;
            return Err(StoreError::WriteNotVisible(node.id.clone()));
        }
        txn.commit().await?;

        debug!(id = %node.id, name = %node.name, "Created node");
        Ok(NodeUpsert::Created)
    }

    async fn upsert_edge(&self, edge: &Edge) -> StoreResult<()> {
        let mut txn = self.begin().await?;

        for (endpoint, id) in [(Endpoint::Source, &edge.source), (Endpoint::Target, &edge.target)] {
            if !node_visible(&mut txn, id).await? {
                txn.rollback().await?;
                return Err(StoreError::DanglingReference { endpoint, id: id.clone() });
            }
        }

        txn.run(merge_edge_query(edge)).await?;
        txn.commit().await?;

        debug!(source = %edge.source, target = %edge.target, kind = %edge.kind(), "Merged edge");
        Ok(())
    }

    async fn counts(&self) -> StoreResult<GraphCounts> {
        self.client.get_counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use rbacgraph_core::RelationshipKind;

    #[test]
    fn test_node_query_without_location() {
        let query = create_node_query(&Node::new("p1", "a1", "ServicePrincipal", None));
        assert!(!query.has_param_key("location"));
        assert!(query.has_param_key("type"));
    }

    #[test]
    fn test_node_query_with_location() {
        let query = create_node_query(&Node::new("p1", "a1", "ServicePrincipal", Some("westeurope".into())));
        assert!(query.has_param_key("location"));
    }

    #[test]
    fn test_has_role_query_binds_role() {
        let query = merge_edge_query(&Edge::has_role("p1", "/g", "/roles/reader"));
        assert!(query.has_param_key("role_definition_id"));
        assert!(query.has_param_key("source"));
        assert!(query.has_param_key("target"));
    }

    #[test]
    fn test_assigned_to_query_binds_extras() {
        let props = BTreeMap::from([("origin".to_string(), "snapshot".to_string())]);
        let edge = Edge::from_parts("p1", "r1", RelationshipKind::AssignedTo, props).unwrap();
        let query = merge_edge_query(&edge);
        assert!(query.has_param_key("extra_0"));
        assert!(!query.has_param_key("role_definition_id"));
    }

    #[test]
    fn test_extras_are_only_set_on_create() {
        let props = BTreeMap::from([
            ("assignment".to_string(), "a1".to_string()),
            ("origin".to_string(), "snapshot".to_string()),
        ]);
        let edge = Edge::from_parts("p1", "r1", RelationshipKind::AssignedTo, props).unwrap();
        let cypher = merge_edge_cypher(&edge);

        assert!(cypher.contains("MERGE (nf)-[r:ASSIGNED_TO]->(nt)"));
        assert!(cypher.ends_with(" ON CREATE SET r.assignment = $extra_0, r.origin = $extra_1"));
        assert_eq!(cypher.matches(" SET ").count(), 1);
        assert!(!cypher.contains("ON MATCH"));
    }

    #[test]
    fn test_edge_without_extras_has_no_set_clause() {
        let cypher = merge_edge_cypher(&Edge::has_role("p1", "/g", "/roles/reader"));
        assert!(cypher.contains("MERGE (nf)-[r:HAS_ROLE {role_definition_id: $role_definition_id}]->(nt)"));
        assert!(!cypher.contains("SET"));
    }
}
