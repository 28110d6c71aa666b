//! `status`: reports a node's place in the topology without starting
//! it. Grounded on `kimberlite-cli`'s `info` command (a read-only
//! report built straight from local state, no server round-trip).
//!
//! Full executive status (oper/presence state of every component) only
//! exists inside a running node's `AmfGraph`; querying a live node over
//! IPC is out of scope here along with the rest of the registry/IPC
//! wiring (see `availmf-node`'s module doc comment), so this reports
//! the static catalog instead.

use std::path::Path;

use anyhow::{Context, Result};
use availmf_config::ClusterConfig;

use super::TOPOLOGY_FILE;

pub fn run(path: &str, node: u16) -> Result<()> {
    let dir = Path::new(path);
    let config_path = dir.join(TOPOLOGY_FILE);
    let config = ClusterConfig::load(&config_path).context("failed to load cluster.toml")?;

    let node_spec = config.get_node(node).with_context(|| format!("no node {node} in {}", config_path.display()))?;

    println!("cluster: {}", config.cluster_name);
    println!("node {}: {} at {}:{}", node_spec.id, node_spec.name, node_spec.bind_address, node_spec.port);
    println!("peers: {}", if node_spec.peers.is_empty() { "none".to_string() } else { node_spec.peers.join(", ") });
    println!();

    let sus_on_node: Vec<_> = config.catalog.sus.iter().filter(|su| su.node == node_spec.name).collect();
    println!("service units on this node: {}", sus_on_node.len());
    for su in &sus_on_node {
        let comp_count = config.catalog.comps.iter().filter(|c| c.su == su.name).count();
        println!("  {} (sg {}, rank {}): {comp_count} component(s)", su.name, su.sg, su.rank);
    }

    Ok(())
}
