//! Store and synchronization errors.

use std::fmt;

use thiserror::Error;

use crate::sync::SyncStage;

/// Which end of an edge a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

/// Errors raised by a graph store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph store unreachable: {0}")]
    Connection(String),

    #[error("Graph store query failed: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Unexpected graph store result: {0}")]
    Decode(String),

    #[error("Write not visible after commit: node {0}")]
    WriteNotVisible(String),

    #[error("Edge {endpoint} node {id} does not exist")]
    DanglingReference { endpoint: Endpoint, id: String },
}

/// Result type for graph store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Fatal errors that abort a synchronization run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("Failed to clear graph: {0}")]
    Clear(#[source] StoreError),

    #[error("Failed to load node {id} (after stage {stage}): {source}")]
    Node {
        id: String,
        stage: SyncStage,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    /// The last stage that completed before the failure.
    pub fn stage(&self) -> SyncStage {
        match self {
            SyncError::Discovery(_) | SyncError::Clear(_) => SyncStage::Init,
            SyncError::Node { stage, .. } => *stage,
        }
    }
}
