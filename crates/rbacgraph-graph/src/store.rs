//! Graph store contract used by the synchronization driver.

use async_trait::async_trait;

use rbacgraph_core::{Edge, Node};

use crate::client::GraphCounts;
use crate::error::StoreResult;

/// Outcome of a node upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeUpsert {
    Created,
    AlreadyPresent,
}

/// Transactional node/edge store keyed on node `id`.
///
/// Every method runs in its own transaction.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Delete every edge, then every node.
    async fn clear(&self) -> StoreResult<()>;

    /// Point lookup by node id.
    async fn node_exists(&self, id: &str) -> StoreResult<bool>;

    /// Insert the node unless a node with the same id exists.
    ///
    /// A created node is read back before returning; if it is not visible the
    /// call fails with `StoreError::WriteNotVisible`.
    async fn upsert_node(&self, node: &Node) -> StoreResult<NodeUpsert>;

    /// Merge the edge on its semantic identity.
    ///
    /// Both endpoints must already exist, otherwise the store is left
    /// untouched and `StoreError::DanglingReference` names the missing end.
    async fn upsert_edge(&self, edge: &Edge) -> StoreResult<()>;

    /// Node and relationship counts.
    async fn counts(&self) -> StoreResult<GraphCounts>;
}
