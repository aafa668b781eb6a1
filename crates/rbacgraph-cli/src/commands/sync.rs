//! `rbacgraph sync`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use rbacgraph_azure::{ArmDiscovery, AzureCredential};
use rbacgraph_core::{DiscoverySource, ResourceGroupScope, SnapshotSource};
use rbacgraph_graph::{GraphConfig, GraphStore, MemoryGraphStore, Neo4jStore, SyncReport, run_sync, schema};

use super::connect;
use crate::config::FileConfig;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Subscription containing the resource group
    #[arg(long, env = "SUBSCRIPTION_ID")]
    pub subscription: Option<String>,

    /// Resource group to discover
    #[arg(long, env = "RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Read discovery results from a JSON snapshot instead of Azure
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Load into an in-memory graph and report, without touching Neo4j
    #[arg(long)]
    pub dry_run: bool,

    /// Azure Resource Manager endpoint
    #[arg(long, env = "AZURE_ARM_ENDPOINT")]
    pub arm_endpoint: Option<String>,
}

pub async fn execute(args: SyncArgs, file: &FileConfig, graph_config: &GraphConfig) -> Result<()> {
    let scope = resolve_scope(&args, file)?;
    let source = build_source(&args, file).await?;

    println!("{} {}", "Syncing".bold(), scope.path().cyan());

    let report = if args.dry_run {
        let store = MemoryGraphStore::new();
        let report = run(&store, source.as_ref(), &scope).await?;
        let counts = store.counts().await?;
        println!(
            "  {} {} nodes, {} relationships (dry run)",
            "Graph:".dimmed(),
            counts.nodes,
            counts.relationships
        );
        report
    } else {
        let client = connect(graph_config).await?;
        schema::initialize_schema(&client).await?;
        run(&Neo4jStore::new(client), source.as_ref(), &scope).await?
    };

    print_report(&report);
    Ok(())
}

async fn run<S: GraphStore>(store: &S, source: &dyn DiscoverySource, scope: &ResourceGroupScope) -> Result<SyncReport> {
    run_sync(store, source, scope)
        .await
        .with_context(|| format!("Sync aborted for {}", scope.path()))
}

fn resolve_scope(args: &SyncArgs, file: &FileConfig) -> Result<ResourceGroupScope> {
    let subscription = args
        .subscription
        .clone()
        .or_else(|| file.azure.subscription_id.clone())
        .context("No subscription given (--subscription, SUBSCRIPTION_ID or [azure].subscription_id)")?;
    let resource_group = args
        .resource_group
        .clone()
        .or_else(|| file.azure.resource_group.clone())
        .context("No resource group given (--resource-group, RESOURCE_GROUP or [azure].resource_group)")?;

    Ok(ResourceGroupScope::new(subscription, resource_group))
}

async fn build_source(args: &SyncArgs, file: &FileConfig) -> Result<Box<dyn DiscoverySource>> {
    if let Some(path) = &args.snapshot {
        return Ok(Box::new(SnapshotSource::load(path).await?));
    }

    let mut credential = AzureCredential::from_env()?;
    if let Some(authority) = &file.azure.authority {
        credential = credential.with_authority(authority);
    }

    let endpoint = args.arm_endpoint.as_deref().or(file.azure.arm_endpoint.as_deref());
    let discovery = match endpoint {
        Some(endpoint) => ArmDiscovery::with_endpoint(endpoint, credential)?,
        None => ArmDiscovery::new(credential)?,
    };
    Ok(Box::new(discovery))
}

fn print_report(report: &SyncReport) {
    println!("\n{}", "Sync complete:".green().bold());
    println!("  Nodes created:       {}", report.nodes_created);
    println!("  Nodes already there: {}", report.nodes_existing);
    println!("  Edges merged:        {}", report.edges_merged);

    if report.is_clean() {
        println!("  Edges skipped:       {}", "0".green());
        return;
    }

    println!(
        "  Edges skipped:       {}",
        report.edge_failures.len().to_string().yellow()
    );
    for failure in &report.edge_failures {
        println!("    {} {} {}", "→".dimmed(), failure.edge, failure.reason.to_string().yellow());
    }
}
