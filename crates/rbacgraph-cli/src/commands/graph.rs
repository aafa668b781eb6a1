//! Graph maintenance commands.

use anyhow::Result;
use colored::Colorize;

use rbacgraph_graph::{GraphConfig, GraphStore, Neo4jStore};

use super::connect;

/// Delete all nodes and relationships.
pub async fn cmd_clear(config: &GraphConfig) -> Result<()> {
    let store = Neo4jStore::new(connect(config).await?);
    store.clear().await?;
    println!("{}", "Graph cleared.".green());
    Ok(())
}

/// Show node and relationship counts.
pub async fn cmd_status(config: &GraphConfig) -> Result<()> {
    let store = Neo4jStore::new(connect(config).await?);
    let counts = store.counts().await?;

    println!("{}", "Access Graph Status".bold());
    println!("{}", "─".repeat(40));
    println!("  Endpoint:      {}", config.uri.dimmed());
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    println!("{}", "─".repeat(40));

    Ok(())
}
