//! Bearer token acquisition for Azure Resource Manager.
//!
//! Supports a pre-acquired token or the OAuth2 client-credentials flow.
//! Client-credential tokens are cached until shortly before they expire.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AzureError, AzureResult};

/// Default Microsoft Entra authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// OAuth2 scope for the ARM API.
const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
enum CredentialKind {
    Static(String),
    ClientSecret {
        authority: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Credential used to authorize ARM requests.
#[derive(Debug)]
pub struct AzureCredential {
    kind: CredentialKind,
    cache: Mutex<Option<CachedToken>>,
}

impl AzureCredential {
    /// Use a bearer token obtained elsewhere.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(CredentialKind::Static(token.into()))
    }

    /// Use the client-credentials flow of a service principal.
    pub fn client_secret(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::new(CredentialKind::ClientSecret {
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Override the authority host (sovereign clouds, tests).
    pub fn with_authority(mut self, authority: &str) -> Self {
        if let CredentialKind::ClientSecret { authority: current, .. } = &mut self.kind {
            *current = authority.trim_end_matches('/').to_string();
        }
        self
    }

    /// Build a credential from `AZURE_ACCESS_TOKEN`, or from
    /// `AZURE_TENANT_ID` + `AZURE_CLIENT_ID` + `AZURE_CLIENT_SECRET`.
    pub fn from_env() -> AzureResult<Self> {
        if let Ok(token) = std::env::var("AZURE_ACCESS_TOKEN") {
            return Ok(Self::from_token(token));
        }

        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                AzureError::Config(format!(
                    "{name} is not set (set AZURE_ACCESS_TOKEN or AZURE_TENANT_ID/AZURE_CLIENT_ID/AZURE_CLIENT_SECRET)"
                ))
            })
        };
        Ok(Self::client_secret(
            var("AZURE_TENANT_ID")?,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_CLIENT_SECRET")?,
        ))
    }

    fn new(kind: CredentialKind) -> Self {
        Self {
            kind,
            cache: Mutex::new(None),
        }
    }

    /// Return a bearer token valid for ARM.
    pub async fn token(&self, http: &reqwest::Client) -> AzureResult<String> {
        let (authority, tenant_id, client_id, client_secret) = match &self.kind {
            CredentialKind::Static(token) => return Ok(token.clone()),
            CredentialKind::ClientSecret {
                authority,
                tenant_id,
                client_id,
                client_secret,
            } => (authority, tenant_id, client_id, client_secret),
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.token.clone());
            }
        }

        let url = format!("{authority}/{tenant_id}/oauth2/v2.0/token");
        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", ARM_SCOPE),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AzureError::Token { status, body });
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Acquired ARM access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cache = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_is_returned_as_is() {
        let credential = AzureCredential::from_token("abc");
        let token = credential.token(&reqwest::Client::new()).await.unwrap();
        assert_eq!(token, "abc");
    }

    #[test]
    fn test_with_authority_trims_slash() {
        let credential = AzureCredential::client_secret("t", "c", "s").with_authority("https://login.example/");
        match credential.kind {
            CredentialKind::ClientSecret { authority, .. } => assert_eq!(authority, "https://login.example"),
            CredentialKind::Static(_) => panic!("expected client secret credential"),
        }
    }

    #[test]
    fn test_token_response_parses() {
        let json = r#"{"token_type":"Bearer","expires_in":3599,"ext_expires_in":3599,"access_token":"eyJ0"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "eyJ0");
        assert_eq!(token.expires_in, 3599);
    }
}
