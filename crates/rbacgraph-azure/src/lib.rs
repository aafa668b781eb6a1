//! # rbacgraph Azure
//!
//! Discovery source backed by the Azure Resource Manager REST API.

pub mod arm;
pub mod auth;
pub mod error;

pub use arm::{ArmDiscovery, DEFAULT_ARM_ENDPOINT};
pub use auth::{AzureCredential, DEFAULT_AUTHORITY};
pub use error::{AzureError, AzureResult};
