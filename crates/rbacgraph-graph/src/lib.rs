//! # rbacgraph Graph
//!
//! Neo4j graph store adapter and synchronization driver.
//!
//! Loads normalized discovery results into a graph store with idempotent
//! upserts, refusing edges whose endpoints are missing.

pub mod client;
pub mod error;
pub mod memory;
pub mod neo4j;
pub mod schema;
pub mod store;
pub mod sync;

pub use client::{GraphClient, GraphConfig, GraphCounts};
pub use error::{Endpoint, StoreError, StoreResult, SyncError};
pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jStore;
pub use store::{GraphStore, NodeUpsert};
pub use sync::{EdgeFailure, SyncReport, SyncStage, load_graph, run_sync};
