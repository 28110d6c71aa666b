//! `init`: writes a fresh cluster topology file. Grounded on
//! `kimberlite-cli`'s `init` command shape (create the directory, bail
//! if already initialized, report what was written).

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use availmf_config::ClusterConfig;

use super::TOPOLOGY_FILE;

pub fn run(path: &str, name: &str, nodes: u16, base_port: u16) -> Result<()> {
    let dir = Path::new(path);
    let config_path = dir.join(TOPOLOGY_FILE);

    if config_path.exists() {
        bail!("{} already has a {TOPOLOGY_FILE}", dir.display());
    }

    fs::create_dir_all(dir).context("failed to create cluster directory")?;

    let config = ClusterConfig::new(name.to_string(), nodes, base_port);
    config.save(&config_path).context("failed to write cluster.toml")?;

    println!("Wrote {} node(s) to {}", config.nodes.len(), config_path.display());
    for node in &config.nodes {
        println!("  node {}: {} ({}:{})", node.id, node.name, node.bind_address, node.port);
    }
    println!();
    println!("Add applications, service groups and components to the `catalog` table before running `availmf start`.");

    Ok(())
}
