//! Azure Resource Manager discovery source.
//!
//! Lists resources of a resource group and role assignments for a scope over
//! the ARM REST API, following `nextLink` pagination. Failures are returned
//! to the caller without retrying.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use rbacgraph_core::{DiscoverySource, RawAssignment, RawIdentity, RawResource, ResourceGroupScope};

use crate::auth::AzureCredential;
use crate::error::{AzureError, AzureResult};

/// Default ARM endpoint (public cloud).
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

const RESOURCES_API_VERSION: &str = "2021-04-01";
const ROLE_ASSIGNMENTS_API_VERSION: &str = "2022-04-01";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: DeserializeOwned"))]
struct Page<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct ArmResource {
    id: String,
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    identity: Option<ArmIdentity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmIdentity {
    #[serde(default)]
    principal_id: Option<String>,
    #[serde(default)]
    user_assigned_identities: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct ArmRoleAssignment {
    name: String,
    properties: ArmRoleAssignmentProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmRoleAssignmentProperties {
    principal_id: String,
    #[serde(default)]
    principal_type: Option<String>,
    scope: String,
    role_definition_id: String,
}

impl From<ArmResource> for RawResource {
    fn from(resource: ArmResource) -> Self {
        Self {
            id: resource.id,
            name: resource.name,
            resource_type: resource.resource_type,
            location: resource.location,
            identity: resource.identity.map(|identity| RawIdentity {
                principal_id: identity.principal_id,
                user_assigned_identities: identity.user_assigned_identities.unwrap_or_default(),
            }),
        }
    }
}

impl From<ArmRoleAssignment> for RawAssignment {
    fn from(assignment: ArmRoleAssignment) -> Self {
        let p = assignment.properties;
        Self {
            principal_id: p.principal_id,
            principal_type: p.principal_type.unwrap_or_else(|| "Unknown".to_string()),
            name: assignment.name,
            scope: p.scope,
            role_definition_id: p.role_definition_id,
        }
    }
}

/// [`DiscoverySource`] over the ARM REST API.
pub struct ArmDiscovery {
    endpoint: String,
    credential: AzureCredential,
    client: reqwest::Client,
}

impl ArmDiscovery {
    pub fn new(credential: AzureCredential) -> AzureResult<Self> {
        Self::with_endpoint(DEFAULT_ARM_ENDPOINT, credential)
    }

    pub fn with_endpoint(endpoint: &str, credential: AzureCredential) -> AzureResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credential,
            client,
        })
    }

    fn resources_url(&self, scope: &ResourceGroupScope) -> AzureResult<Url> {
        build_url(
            &format!("{}{}/resources", self.endpoint, scope.path()),
            &[("api-version", RESOURCES_API_VERSION)],
        )
    }

    fn role_assignments_url(&self, scope: &str, principal_filter: Option<&str>) -> AzureResult<Url> {
        let scope = scope.trim_matches('/');
        let base = if scope.is_empty() {
            format!("{}/providers/Microsoft.Authorization/roleAssignments", self.endpoint)
        } else {
            format!("{}/{scope}/providers/Microsoft.Authorization/roleAssignments", self.endpoint)
        };
        match principal_filter {
            Some(principal) => {
                let filter = format!("assignedTo('{principal}')");
                build_url(
                    &base,
                    &[("api-version", ROLE_ASSIGNMENTS_API_VERSION), ("$filter", filter.as_str())],
                )
            }
            None => build_url(&base, &[("api-version", ROLE_ASSIGNMENTS_API_VERSION)]),
        }
    }

    /// GET every page starting at `url`.
    async fn get_all<T: DeserializeOwned>(&self, url: Url) -> AzureResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            let token = self.credential.token(&self.client).await?;
            let response = self.client.get(url.clone()).bearer_auth(token).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AzureError::Api {
                    status,
                    url: url.to_string(),
                    body,
                });
            }

            let page: Page<T> = parse_page(&response.bytes().await?)?;
            debug!(url = %url, items = page.value.len(), "Fetched ARM page");
            items.extend(page.value);

            next = page
                .next_link
                .map(|link| Url::parse(&link).map_err(|e| AzureError::Config(format!("invalid nextLink {link}: {e}"))))
                .transpose()?;
        }

        Ok(items)
    }
}

fn parse_page<T: DeserializeOwned>(body: &[u8]) -> AzureResult<Page<T>> {
    serde_json::from_slice(body).map_err(|e| AzureError::Decode(e.to_string()))
}

fn build_url(base: &str, params: &[(&str, &str)]) -> AzureResult<Url> {
    Url::parse_with_params(base, params).map_err(|e| AzureError::Config(format!("invalid URL {base}: {e}")))
}

#[async_trait]
impl DiscoverySource for ArmDiscovery {
    async fn list_resources(&self, scope: &ResourceGroupScope) -> Result<Vec<RawResource>> {
        let resources: Vec<ArmResource> = self.get_all(self.resources_url(scope)?).await?;
        Ok(resources.into_iter().map(RawResource::from).collect())
    }

    async fn list_role_assignments(
        &self,
        scope: &str,
        principal_filter: Option<&str>,
    ) -> Result<Vec<RawAssignment>> {
        let url = self.role_assignments_url(scope, principal_filter)?;
        let assignments: Vec<ArmRoleAssignment> = self.get_all(url).await?;
        Ok(assignments.into_iter().map(RawAssignment::from).collect())
    }
}
