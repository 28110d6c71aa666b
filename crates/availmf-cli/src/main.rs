//! availmf unified CLI.
//!
//! ```bash
//! # Write a default cluster topology.
//! availmf init ./cluster --nodes 3
//!
//! # Run one node of it.
//! availmf start ./cluster --node 1
//!
//! # Inspect the topology without starting anything.
//! availmf status ./cluster --node 1
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "availmf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a new cluster topology file.
    Init {
        /// Path to the directory to create.
        path: String,

        /// Cluster name.
        #[arg(long, default_value = "availmf-cluster")]
        name: String,

        /// Number of nodes to generate.
        #[arg(long, default_value = "2")]
        nodes: u16,

        /// Base totem port; node N binds to `base_port + N`.
        #[arg(long, default_value = "6000")]
        base_port: u16,
    },

    /// Run one node's event loop.
    Start {
        /// Path to the directory holding `cluster.toml`.
        path: String,

        /// This node's numeric id, matching an entry in the topology.
        #[arg(long)]
        node: u16,
    },

    /// Print the topology and this node's place in it, without starting it.
    Status {
        /// Path to the directory holding `cluster.toml`.
        path: String,

        /// This node's numeric id, matching an entry in the topology.
        #[arg(long)]
        node: u16,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path, name, nodes, base_port } => commands::init::run(&path, &name, nodes, base_port),
        Commands::Start { path, node } => {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(commands::start::run(&path, node))
        }
        Commands::Status { path, node } => commands::status::run(&path, node),
    }
}
