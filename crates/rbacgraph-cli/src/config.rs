//! Configuration file loading.
//!
//! A TOML file supplies defaults; command-line flags and environment
//! variables override it.
//!
//! ```toml
//! [graph]
//! uri = "bolt://localhost:7687"
//! user = "neo4j"
//! password = "secret"
//! database = "neo4j"
//!
//! [azure]
//! subscription_id = "00000000-0000-0000-0000-000000000000"
//! resource_group = "rg-prod"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use rbacgraph_graph::GraphConfig;

/// Contents of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub graph: GraphConfig,
    pub azure: AzureSettings,
}

/// Azure discovery settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub arm_endpoint: Option<String>,
    pub authority: Option<String>,
}

impl FileConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Graph connection overrides from flags or environment.
#[derive(Debug, Clone, Default)]
pub struct GraphOverrides {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl GraphOverrides {
    pub fn apply(self, mut config: GraphConfig) -> GraphConfig {
        if let Some(uri) = self.uri {
            config.uri = uri;
        }
        if let Some(user) = self.user {
            config.user = user;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config.graph.uri, "bolt://localhost:7687");
        assert_eq!(config.graph.database, "neo4j");
        assert!(config.azure.subscription_id.is_none());
    }

    #[test]
    fn test_partial_graph_table() {
        let config = FileConfig::parse("[graph]\nuri = \"bolt://graph:7687\"\n[azure]\nresource_group = \"rg\"\n").unwrap();
        assert_eq!(config.graph.uri, "bolt://graph:7687");
        assert_eq!(config.graph.user, "neo4j");
        assert_eq!(config.azure.resource_group.as_deref(), Some("rg"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[graph]\npassword = \"pw\"").unwrap();
        let config = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.graph.password, "pw");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(FileConfig::parse("[graph\n").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = GraphOverrides {
            uri: Some("bolt://other:7687".to_string()),
            password: Some("env-pw".to_string()),
            ..Default::default()
        };
        let config = overrides.apply(GraphConfig::default());
        assert_eq!(config.uri, "bolt://other:7687");
        assert_eq!(config.password, "env-pw");
        assert_eq!(config.user, "neo4j");
    }
}
