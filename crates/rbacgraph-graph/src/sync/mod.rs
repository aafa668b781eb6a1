//! Discovery to graph synchronization pipeline.
//!
//! A run moves strictly forward through `Init -> Cleared -> NodesLoaded ->
//! Done`. Clearing and node loading are fatal on error. Edge loading records
//! each failure and moves on, so one missing reference never aborts the run.

mod report;

use tracing::{debug, info, warn};

use rbacgraph_core::{DiscoverySource, NormalizedGraph, ResourceGroupScope, normalize};

use crate::error::SyncError;
use crate::store::{GraphStore, NodeUpsert};

pub use report::{EdgeFailure, SyncReport, SyncStage};

/// Discover, normalize and load a resource group into the store.
///
/// Discovery runs to completion before the store is touched, so a discovery
/// failure leaves the existing graph intact.
pub async fn run_sync<S>(
    store: &S,
    source: &dyn DiscoverySource,
    scope: &ResourceGroupScope,
) -> Result<SyncReport, SyncError>
where
    S: GraphStore + ?Sized,
{
    info!(scope = %scope.path(), "Starting graph sync");

    let graph = normalize(source, scope).await.map_err(SyncError::Discovery)?;
    load_graph(store, &graph).await
}

/// Clear the store and load a normalized graph into it.
pub async fn load_graph<S>(store: &S, graph: &NormalizedGraph) -> Result<SyncReport, SyncError>
where
    S: GraphStore + ?Sized,
{
    let mut report = SyncReport::default();

    store.clear().await.map_err(SyncError::Clear)?;
    report.stage = SyncStage::Cleared;
    info!("Graph cleared");

    for node in &graph.nodes {
        match store.upsert_node(node).await {
            Ok(NodeUpsert::Created) => report.nodes_created += 1,
            Ok(NodeUpsert::AlreadyPresent) => {
                debug!(id = %node.id, "Node already present");
                report.nodes_existing += 1;
            }
            Err(source) => {
                return Err(SyncError::Node {
                    id: node.id.clone(),
                    stage: report.stage,
                    source,
                });
            }
        }
    }
    report.stage = SyncStage::NodesLoaded;
    info!(created = report.nodes_created, existing = report.nodes_existing, "Nodes loaded");

    for edge in &graph.edges {
        match store.upsert_edge(edge).await {
            Ok(()) => report.edges_merged += 1,
            Err(reason) => {
                warn!(edge = %edge, error = %reason, "Skipping edge");
                report.edge_failures.push(EdgeFailure {
                    edge: edge.clone(),
                    reason,
                });
            }
        }
    }
    report.stage = SyncStage::Done;

    info!(
        nodes_created = report.nodes_created,
        edges_merged = report.edges_merged,
        edges_failed = report.edge_failures.len(),
        "Graph sync complete"
    );

    Ok(report)
}
