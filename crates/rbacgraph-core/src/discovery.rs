//! Discovery source interface and raw records.
//!
//! A discovery source enumerates the resources of a resource group and the
//! role assignments that apply at a scope. Credentials and transport belong
//! to the implementation.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::scopes_related;

/// ARM type of a user-assigned managed identity resource.
pub const USER_ASSIGNED_IDENTITY_TYPE: &str = "Microsoft.ManagedIdentity/userAssignedIdentities";

/// A subscription + resource group pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupScope {
    pub subscription_id: String,
    pub resource_group: String,
}

impl ResourceGroupScope {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }

    /// ARM scope path of the resource group.
    pub fn path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )
    }
}

/// Identity block of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIdentity {
    /// Principal of the system-assigned identity, if any.
    #[serde(default)]
    pub principal_id: Option<String>,
    /// User-assigned identity id -> descriptor.
    #[serde(default)]
    pub user_assigned_identities: BTreeMap<String, serde_json::Value>,
}

/// A discovered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub identity: Option<RawIdentity>,
}

impl RawResource {
    pub fn is_user_assigned_identity(&self) -> bool {
        self.resource_type.eq_ignore_ascii_case(USER_ASSIGNED_IDENTITY_TYPE)
    }
}

/// A role assignment: a principal bound to a role definition at a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignment {
    pub principal_id: String,
    pub principal_type: String,
    /// Assignment name (a GUID).
    pub name: String,
    pub scope: String,
    pub role_definition_id: String,
}

/// Source of raw discovery records.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// List every resource in the resource group.
    async fn list_resources(&self, scope: &ResourceGroupScope) -> Result<Vec<RawResource>>;

    /// List role assignments that apply at `scope`, optionally restricted to
    /// assignments of a single principal.
    async fn list_role_assignments(
        &self,
        scope: &str,
        principal_filter: Option<&str>,
    ) -> Result<Vec<RawAssignment>>;
}

/// Discovery results captured as a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSource {
    #[serde(default)]
    pub resources: Vec<RawResource>,
    #[serde(default)]
    pub role_assignments: Vec<RawAssignment>,
}

impl SnapshotSource {
    /// Load a snapshot from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }
}

#[async_trait]
impl DiscoverySource for SnapshotSource {
    async fn list_resources(&self, _scope: &ResourceGroupScope) -> Result<Vec<RawResource>> {
        Ok(self.resources.clone())
    }

    async fn list_role_assignments(
        &self,
        scope: &str,
        principal_filter: Option<&str>,
    ) -> Result<Vec<RawAssignment>> {
        Ok(self
            .role_assignments
            .iter()
            .filter(|a| scopes_related(&a.scope, scope))
            .filter(|a| principal_filter.map_or(true, |p| a.principal_id.eq_ignore_ascii_case(p)))
            .cloned()
            .collect())
    }
}
