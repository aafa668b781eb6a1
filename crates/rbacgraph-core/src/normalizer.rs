//! Turns raw discovery records into graph nodes and candidate edges.
//!
//! Produces these patterns per resource:
//! - the resource itself as a node
//! - system-assigned identity: for each role assignment of its principal in the
//!   resource group, a principal node, `(principal)-[:ASSIGNED_TO]->(resource)`
//!   and `(principal)-[:HAS_ROLE {role_definition_id}]->(scope)`
//! - user-assigned identities: `(identity)-[:ASSIGNED_TO]->(resource)`
//! - the resource is itself a user-assigned identity: for each role assignment
//!   at its scope, a scope node and `(scope)-[:ASSIGNED_TO]->(resource)`
//!
//! Nodes are not deduplicated here. The store's upsert is keyed on `id`, so a
//! principal that shows up twice collapses there.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::discovery::{DiscoverySource, RawAssignment, RawResource, ResourceGroupScope};
use crate::ids::canonical_key;
use crate::model::{Edge, Node};

/// Node type given to scope nodes found through a user-assigned identity.
pub const SCOPE_NODE_TYPE: &str = "Microsoft.Management/managementGroups";

/// Nodes and edges ready to be loaded into the store, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Discover the resource group and normalize the results.
///
/// Any discovery failure is returned as-is; nothing is partially produced.
pub async fn normalize(
    source: &dyn DiscoverySource,
    scope: &ResourceGroupScope,
) -> Result<NormalizedGraph> {
    let resources = source
        .list_resources(scope)
        .await
        .with_context(|| format!("Failed to list resources in {}", scope.path()))?;

    info!(resources = resources.len(), scope = %scope.path(), "Discovered resources");

    let mut graph = NormalizedGraph {
        nodes: resources.iter().map(resource_node).collect(),
        edges: Vec::new(),
    };

    let group_scope = scope.path();
    for resource in &resources {
        let resource_id = canonical_key(&resource.id);

        if let Some(principal_id) = resource
            .identity
            .as_ref()
            .and_then(|identity| identity.principal_id.as_deref())
        {
            let assignments = source
                .list_role_assignments(&group_scope, Some(principal_id))
                .await
                .with_context(|| format!("Failed to list role assignments for principal {principal_id}"))?;

            for assignment in &assignments {
                add_system_assignment(&mut graph, resource, &resource_id, assignment);
            }
        }

        if let Some(identity) = &resource.identity {
            for identity_id in identity.user_assigned_identities.keys() {
                graph
                    .edges
                    .push(Edge::assigned_to(canonical_key(identity_id), resource_id.clone()));
            }
        }

        // Independent of the identity block above.
        if resource.is_user_assigned_identity() {
            let assignments = source
                .list_role_assignments(&resource.id, None)
                .await
                .with_context(|| format!("Failed to list role assignments at {}", resource.id))?;

            for assignment in &assignments {
                let scope_id = canonical_key(&assignment.scope);
                graph.nodes.push(Node::new(
                    scope_id.clone(),
                    assignment.name.clone(),
                    SCOPE_NODE_TYPE,
                    resource.location.clone(),
                ));
                graph.edges.push(Edge::assigned_to(scope_id, resource_id.clone()));
            }
        }

        debug!(resource = %resource_id, "Normalized resource");
    }

    info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "Normalized discovery results");
    Ok(graph)
}

fn resource_node(resource: &RawResource) -> Node {
    Node::new(
        canonical_key(&resource.id),
        resource.name.clone(),
        resource.resource_type.clone(),
        resource.location.clone(),
    )
}

fn add_system_assignment(
    graph: &mut NormalizedGraph,
    resource: &RawResource,
    resource_id: &str,
    assignment: &RawAssignment,
) {
    let principal_id = canonical_key(&assignment.principal_id);

    graph.nodes.push(Node::new(
        principal_id.clone(),
        assignment.name.clone(),
        assignment.principal_type.clone(),
        resource.location.clone(),
    ));
    graph
        .edges
        .push(Edge::assigned_to(principal_id.clone(), resource_id.to_string()));
    graph.edges.push(Edge::has_role(
        principal_id,
        canonical_key(&assignment.scope),
        assignment.role_definition_id.clone(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{RawIdentity, SnapshotSource};
    use crate::model::RelationshipKind;
    use std::collections::BTreeMap;

    const RG: &str = "/subscriptions/s1/resourceGroups/rg";

    fn resource(name: &str, resource_type: &str, identity: Option<RawIdentity>) -> RawResource {
        RawResource {
            id: format!("{RG}/providers/{resource_type}/{name}"),
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            location: Some("westeurope".to_string()),
            identity,
        }
    }

    #[tokio::test]
    async fn test_resource_without_identity_yields_only_its_node() {
        let source = SnapshotSource {
            resources: vec![resource("vault", "Microsoft.KeyVault/vaults", None)],
            role_assignments: vec![],
        };
        let graph = normalize(&source, &ResourceGroupScope::new("s1", "rg")).await.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn test_system_assigned_identity() {
        let app = resource(
            "app",
            "Microsoft.Web/sites",
            Some(RawIdentity { principal_id: Some("p1".to_string()), ..Default::default() }),
        );
        let source = SnapshotSource {
            resources: vec![app.clone()],
            role_assignments: vec![RawAssignment {
                principal_id: "p1".to_string(),
                principal_type: "ServicePrincipal".to_string(),
                name: "a1".to_string(),
                scope: "/subscriptions/s1/resourcegroups/rg".to_string(),
                role_definition_id: "/roles/reader".to_string(),
            }],
        };
        let graph = normalize(&source, &ResourceGroupScope::new("s1", "rg")).await.unwrap();

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![app.id.as_str(), "p1"]);
        assert_eq!(graph.nodes[1].location.as_deref(), Some("westeurope"));
        assert_eq!(graph.nodes[1].node_type, "ServicePrincipal");
        assert_eq!(
            graph.edges,
            vec![Edge::assigned_to("p1", app.id.clone()), Edge::has_role("p1", RG, "/roles/reader")]
        );
    }

    #[tokio::test]
    async fn test_user_assigned_identity_key_is_canonicalized() {
        let uami = resource("uami", "Microsoft.ManagedIdentity/userAssignedIdentities", None);
        let lowercased = uami.id.replace("resourceGroups", "resourcegroups");
        let app = resource(
            "app",
            "Microsoft.Web/sites",
            Some(RawIdentity {
                principal_id: None,
                user_assigned_identities: BTreeMap::from([(lowercased, serde_json::json!({}))]),
            }),
        );
        let source = SnapshotSource { resources: vec![uami.clone(), app.clone()], role_assignments: vec![] };
        let graph = normalize(&source, &ResourceGroupScope::new("s1", "rg")).await.unwrap();

        assert_eq!(graph.edges, vec![Edge::assigned_to(uami.id.clone(), app.id.clone())]);
        assert!(graph.nodes.iter().any(|n| n.id == graph.edges[0].source));
    }

    #[tokio::test]
    async fn test_user_assigned_identity_resource_scans_its_scope() {
        let uami = resource("uami", "Microsoft.ManagedIdentity/userAssignedIdentities", None);
        let source = SnapshotSource {
            resources: vec![uami.clone()],
            role_assignments: vec![RawAssignment {
                principal_id: "u1".to_string(),
                principal_type: "ServicePrincipal".to_string(),
                name: "a2".to_string(),
                scope: uami.id.clone(),
                role_definition_id: "/roles/contributor".to_string(),
            }],
        };
        let graph = normalize(&source, &ResourceGroupScope::new("s1", "rg")).await.unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].node_type, SCOPE_NODE_TYPE);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind(), RelationshipKind::AssignedTo);
        assert_eq!(graph.edges[0].target, uami.id);
    }

    #[tokio::test]
    async fn test_duplicate_principal_nodes_are_kept() {
        let identity = || Some(RawIdentity { principal_id: Some("p1".to_string()), ..Default::default() });
        let a = resource("a", "Microsoft.Web/sites", identity());
        let b = resource("b", "Microsoft.Web/sites", identity());
        let source = SnapshotSource {
            resources: vec![a, b],
            role_assignments: vec![RawAssignment {
                principal_id: "p1".to_string(),
                principal_type: "ServicePrincipal".to_string(),
                name: "a1".to_string(),
                scope: RG.to_string(),
                role_definition_id: "/roles/reader".to_string(),
            }],
        };
        let graph = normalize(&source, &ResourceGroupScope::new("s1", "rg")).await.unwrap();
        assert_eq!(graph.nodes.iter().filter(|n| n.id == "p1").count(), 2);
    }
}
