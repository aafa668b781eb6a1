//! Synchronization stages and run report.

use std::fmt;

use rbacgraph_core::Edge;

use crate::error::StoreError;

/// Stages of a synchronization run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncStage {
    Init,
    Cleared,
    NodesLoaded,
    Done,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Init => "init",
            SyncStage::Cleared => "cleared",
            SyncStage::NodesLoaded => "nodes_loaded",
            SyncStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// An edge that could not be merged, and why.
#[derive(Debug)]
pub struct EdgeFailure {
    pub edge: Edge,
    pub reason: StoreError,
}

/// Result of a synchronization run.
#[derive(Debug)]
pub struct SyncReport {
    pub stage: SyncStage,
    pub nodes_created: usize,
    pub nodes_existing: usize,
    pub edges_merged: usize,
    pub edge_failures: Vec<EdgeFailure>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            stage: SyncStage::Init,
            nodes_created: 0,
            nodes_existing: 0,
            edges_merged: 0,
            edge_failures: Vec::new(),
        }
    }
}

impl SyncReport {
    /// Number of edges attempted.
    pub fn edges_attempted(&self) -> usize {
        self.edges_merged + self.edge_failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.edge_failures.is_empty()
    }
}
