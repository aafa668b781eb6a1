//! CLI command definitions and handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use rbacgraph_graph::{GraphClient, GraphConfig};

use crate::config::{FileConfig, GraphOverrides};

pub mod graph;
pub mod sync;

/// Azure access graph synchronization
#[derive(Parser)]
#[command(name = "rbacgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "RBACGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub graph: GraphArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Neo4j connection flags.
#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Bolt URI of the graph database
    #[arg(long, global = true, env = "GRAPHDB_URL")]
    pub graph_url: Option<String>,

    /// Graph database user
    #[arg(long, global = true, env = "GRAPHDB_USERNAME")]
    pub graph_user: Option<String>,

    /// Graph database password
    #[arg(long, global = true, env = "GRAPHDB_PASSWORD", hide_env_values = true)]
    pub graph_password: Option<String>,

    /// Graph database name
    #[arg(long, global = true, env = "GRAPHDB_DATABASE")]
    pub graph_database: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover a resource group and rebuild the graph from it
    Sync(sync::SyncArgs),

    /// Delete every node and relationship from the graph
    Clear,

    /// Show node and relationship counts
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let file = FileConfig::load(self.config.as_deref())?;
        let graph_config = GraphOverrides {
            uri: self.graph.graph_url,
            user: self.graph.graph_user,
            password: self.graph.graph_password,
            database: self.graph.graph_database,
        }
        .apply(file.graph.clone());

        match self.command {
            Commands::Sync(args) => sync::execute(args, &file, &graph_config).await,
            Commands::Clear => graph::cmd_clear(&graph_config).await,
            Commands::Status => graph::cmd_status(&graph_config).await,
        }
    }
}

/// Connect to Neo4j, failing fast when it is unreachable.
pub async fn connect(config: &GraphConfig) -> Result<GraphClient> {
    GraphClient::connect(config)
        .await
        .with_context(|| format!("Cannot connect to graph database at {}", config.uri))
}
