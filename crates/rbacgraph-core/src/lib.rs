//! rbacgraph Core Library
//!
//! Shared vocabulary for the access graph (nodes, edges, relationship kinds),
//! the discovery interface, and the normalizer that turns raw discovery
//! records into graph entities.

pub mod discovery;
pub mod error;
pub mod ids;
pub mod model;
pub mod normalizer;

pub use discovery::{DiscoverySource, RawAssignment, RawIdentity, RawResource, ResourceGroupScope, SnapshotSource};
pub use error::{ModelError, ModelResult};
pub use model::{Edge, EdgeKey, EdgeProperties, Node, RelationshipKind};
pub use normalizer::{NormalizedGraph, normalize};
