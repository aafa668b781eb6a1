//! In-memory graph store.
//!
//! Same contract as the Neo4j store. Backs `--dry-run` and the test suites.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use rbacgraph_core::{Edge, EdgeKey, Node};

use crate::client::GraphCounts;
use crate::error::{Endpoint, StoreError, StoreResult};
use crate::store::{GraphStore, NodeUpsert};

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
    /// Ids for which writes are dropped, simulating an invisible write.
    #[cfg(test)]
    lost_writes: std::collections::HashSet<String>,
}

impl MemoryState {
    #[cfg(test)]
    fn write_lost(&self, id: &str) -> bool {
        self.lost_writes.contains(id)
    }

    #[cfg(not(test))]
    fn write_lost(&self, _id: &str) -> bool {
        false
    }
}

/// [`GraphStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    state: Mutex<MemoryState>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn nodes(&self) -> Vec<Node> {
        self.state.lock().await.nodes.values().cloned().collect()
    }

    pub async fn edges(&self) -> Vec<Edge> {
        self.state.lock().await.edges.values().cloned().collect()
    }

    pub async fn node(&self, id: &str) -> Option<Node> {
        self.state.lock().await.nodes.get(id).cloned()
    }

    /// Make every future insert of `id` vanish before it can be read back.
    #[cfg(test)]
    pub(crate) async fn drop_writes_for(&self, id: impl Into<String>) {
        self.state.lock().await.lost_writes.insert(id.into());
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn clear(&self) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.edges.clear();
        state.nodes.clear();
        Ok(())
    }

    async fn node_exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.state.lock().await.nodes.contains_key(id))
    }

    async fn upsert_node(&self, node: &Node) -> StoreResult<NodeUpsert> {
        let mut state = self.state.lock().await;
        if state.nodes.contains_key(&node.id) {
            return Ok(NodeUpsert::AlreadyPresent);
        }

        if !state.write_lost(&node.id) {
            state.nodes.insert(node.id.clone(), node.clone());
        }
        if !state.nodes.contains_key(&node.id) {
            return Err(StoreError::WriteNotVisible(node.id.clone()));
        }
        Ok(NodeUpsert::Created)
    }

    async fn upsert_edge(&self, edge: &Edge) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        for (endpoint, id) in [(Endpoint::Source, &edge.source), (Endpoint::Target, &edge.target)] {
            if !state.nodes.contains_key(id) {
                return Err(StoreError::DanglingReference { endpoint, id: id.clone() });
            }
        }

        // Existing edges keep their properties, as with MERGE ... ON CREATE SET.
        state.edges.entry(edge.merge_key()).or_insert_with(|| edge.clone());
        Ok(())
    }

    async fn counts(&self) -> StoreResult<GraphCounts> {
        let state = self.state.lock().await;
        Ok(GraphCounts {
            nodes: state.nodes.len(),
            relationships: state.edges.len(),
        })
    }
}
