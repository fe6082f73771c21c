//! gridalloc: command-line front end for the allocator.
//!
//! Loads a cluster description and either prints it or runs one
//! allocation against it, printing the resulting node set as JSON.
//!
//! # Usage
//!
//! ```text
//! gridalloc --config cluster.toml show
//! gridalloc --config cluster.toml allocate --nodes 3 --strategy single-host-exclusive
//! gridalloc --config cluster.toml allocate --nodes 4 --strategy threshold-proximity:20 --pivot rack-a
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use gridalloc_allocator::{AllocationRequest, Allocator};
use gridalloc_core::ClusterConfig;
use gridalloc_placement::{MatchTable, TopologyDescriptor};
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "gridalloc", about = "Topology-aware node allocation")]
struct Cli {
    /// Cluster description (hosts, nodes, distances).
    #[arg(long, short, default_value = "gridalloc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the loaded topology.
    Show,

    /// Run a single allocation and print the node set.
    Allocate {
        /// Maximum number of nodes to hand out.
        #[arg(long, allow_negative_numbers = true)]
        nodes: i64,

        /// Placement strategy, e.g. `best-proximity` or `threshold-proximity:20`.
        #[arg(long, default_value = "arbitrary")]
        strategy: String,

        /// Node that must never be selected. Repeatable.
        #[arg(long)]
        exclude: Vec<String>,

        /// Restrict eligibility to these nodes. Repeatable.
        #[arg(long)]
        only: Vec<String>,

        /// Pivot host for proximity strategies. Repeatable.
        #[arg(long)]
        pivot: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gridalloc=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = run(cli)?;
    println!("{output}");
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let config = ClusterConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let allocator = Allocator::from_config(&config)?;
    info!(
        path = %cli.config.display(),
        hosts = config.hosts.len(),
        nodes = config.node_count(),
        "cluster loaded"
    );

    let value = match cli.command {
        Command::Show => serde_json::to_value(allocator.topology())?,
        Command::Allocate {
            nodes,
            strategy,
            exclude,
            only,
            pivot,
        } => {
            let mut request = AllocationRequest::parse(nodes, &strategy)?.with_excluded(exclude);
            if !only.is_empty() {
                request = request.with_predicate(MatchTable::matching(only));
            }
            if !pivot.is_empty() {
                set_pivot(&mut request.descriptor, pivot)?;
            }

            let node_set = allocator.allocate(&request)?;
            json!({
                "strategy": request.descriptor.to_string(),
                "requested": request.max_nodes,
                "node_set": node_set,
                "free_after": allocator.free_nodes().len(),
            })
        }
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

fn set_pivot(descriptor: &mut TopologyDescriptor, hosts: Vec<String>) -> anyhow::Result<()> {
    match descriptor {
        TopologyDescriptor::BestProximity { pivot }
        | TopologyDescriptor::ThresholdProximity { pivot, .. } => {
            *pivot = Some(hosts);
            Ok(())
        }
        other => bail!("strategy `{}` does not take a pivot", other.name()),
    }
}
