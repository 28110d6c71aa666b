//! `start`: runs one node's event loop. Grounded on `kimberlite-cli`'s
//! `start` command (load config, open the runtime, hand off to the
//! server's run loop, report shutdown), generalized to `availmf-node`'s
//! `NodeEngine`/`run`.
//!
//! The real totem ring transport is an external black box the rest of
//! this workspace is built against (`availmf-totem::port::GroupPort`)
//! but never implements over a real socket; the only `GroupPort` this
//! codebase provides is the deterministic in-process `SimGroup`. Until
//! a real transport adapter exists, `start` runs the node against a
//! single-member simulated bus: a faithful single-node demonstration of
//! the event loop, not a real multi-node deployment.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use availmf_config::ClusterConfig;
use availmf_node::NodeEngine;
use availmf_totem::sim::{SimBus, SimGroup};
use availmf_types::NodeId;
use tokio::sync::mpsc;

use super::TOPOLOGY_FILE;

pub async fn run(path: &str, node: u16) -> Result<()> {
    let dir = Path::new(path);
    let config_path = dir.join(TOPOLOGY_FILE);
    let config = ClusterConfig::load(&config_path).context("failed to load cluster.toml")?;

    let node_spec = config.get_node(node).with_context(|| format!("no node {node} in {}", config_path.display()))?;

    println!("Starting {} (node {node}, {}:{})", config.cluster_name, node_spec.bind_address, node_spec.port);

    let local_node = NodeId::new(node as u32);
    let engine = NodeEngine::from_catalog(&config.catalog, local_node).context("failed to build AMF graph from catalog")?;

    let bus = SimBus::new(config.nodes.len().max(1));
    let port = SimGroup::new(local_node, bus);
    let (_confchg_tx, confchg_rx) = mpsc::channel(16);

    println!("Node running. Press Ctrl+C to stop.");
    availmf_node::run(engine, port, confchg_rx, Duration::from_millis(100)).await;
    println!("Node stopped.");

    Ok(())
}
