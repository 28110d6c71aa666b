//! Cluster topology and tunables (spec 4.O), loaded once at startup.
//!
//! Grounded on `kimberlite-cluster::config::ClusterConfig`'s
//! new/load/save shape; unlike the teacher, there is no `data_dir` tree
//! to create, since this system keeps no state on stable storage
//! (synchronization rebuilds everything from peers on restart), and no
//! `directories`-style default-path resolution, since the config file
//! path is always given explicitly by the CLI.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::AmfCatalog;
use crate::error::ConfigError;

/// One node's address and peer list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: u16,
    pub name: String,
    pub bind_address: String,
    pub port: u16,
    #[serde(default)]
    pub peers: Vec<String>,
}

/// Checkpoint service defaults applied when a checkpoint's creation
/// attributes don't override them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckpointDefaults {
    pub max_sections: u32,
    pub max_section_size: u32,
    pub retention_duration_ns: u64,
}

impl Default for CheckpointDefaults {
    fn default() -> Self {
        Self { max_sections: 1, max_section_size: 64 * 1024, retention_duration_ns: 0 }
    }
}

/// Cluster-wide timer tunables not tied to any one component's
/// configured healthcheck.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimerTunables {
    pub healthcheck_default_period_ns: u64,
    pub healthcheck_default_max_duration_ns: u64,
    pub retention_poll_interval_ns: u64,
}

impl Default for TimerTunables {
    fn default() -> Self {
        Self {
            healthcheck_default_period_ns: 1_000_000_000,
            healthcheck_default_max_duration_ns: 5_000_000_000,
            retention_poll_interval_ns: 1_000_000_000,
        }
    }
}

/// The whole cluster topology: this node's peers, the AMF catalog
/// every node instantiates identically, and the runtime defaults the
/// checkpoint and timer services fall back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster_name: String,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub catalog: AmfCatalog,
    #[serde(default)]
    pub checkpoint_defaults: CheckpointDefaults,
    #[serde(default)]
    pub timer_tunables: TimerTunables,
}

impl ClusterConfig {
    /// Builds a config for `node_count` nodes on consecutive ports
    /// starting at `base_port`, each peered with every other node.
    pub fn new(cluster_name: impl Into<String>, node_count: u16, base_port: u16) -> Self {
        let nodes = (0..node_count)
            .map(|id| {
                let port = base_port + id;
                let peers = (0..node_count)
                    .filter(|&peer| peer != id)
                    .map(|peer| format!("127.0.0.1:{}", base_port + peer))
                    .collect();
                NodeSpec { id, name: format!("node-{id}"), bind_address: "127.0.0.1".to_string(), port, peers }
            })
            .collect();

        Self {
            cluster_name: cluster_name.into(),
            nodes,
            catalog: AmfCatalog::default(),
            checkpoint_defaults: CheckpointDefaults::default(),
            timer_tunables: TimerTunables::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get_node(&self, id: u16) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Cross-checks every name reference in the catalog resolves to a
    /// declared entity, and that every service unit names a declared
    /// node. Run automatically by `load`/`save`; callers building a
    /// config programmatically should call it before handing the
    /// config to a node.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let node_names: std::collections::HashSet<_> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        let app_names: std::collections::HashSet<_> = self.catalog.apps.iter().map(|a| a.name.as_str()).collect();
        let sg_names: std::collections::HashSet<_> = self.catalog.sgs.iter().map(|s| s.name.as_str()).collect();
        let su_names: std::collections::HashSet<_> = self.catalog.sus.iter().map(|s| s.name.as_str()).collect();
        let si_names: std::collections::HashSet<_> = self.catalog.sis.iter().map(|s| s.name.as_str()).collect();

        for sg in &self.catalog.sgs {
            if !app_names.contains(sg.app.as_str()) {
                return Err(ConfigError::Validation(format!("service group {} references unknown application {}", sg.name, sg.app)));
            }
        }
        for su in &self.catalog.sus {
            if !sg_names.contains(su.sg.as_str()) {
                return Err(ConfigError::Validation(format!("service unit {} references unknown service group {}", su.name, su.sg)));
            }
            if !node_names.contains(su.node.as_str()) {
                return Err(ConfigError::Validation(format!("service unit {} references unknown node {}", su.name, su.node)));
            }
        }
        for comp in &self.catalog.comps {
            if !su_names.contains(comp.su.as_str()) {
                return Err(ConfigError::Validation(format!("component {} references unknown service unit {}", comp.name, comp.su)));
            }
        }
        for si in &self.catalog.sis {
            if !sg_names.contains(si.sg.as_str()) {
                return Err(ConfigError::Validation(format!("service instance {} references unknown service group {}", si.name, si.sg)));
            }
        }
        for csi in &self.catalog.csis {
            if !si_names.contains(csi.si.as_str()) {
                return Err(ConfigError::Validation(format!("CSI {} references unknown service instance {}", csi.name, csi.si)));
            }
        }
        Ok(())
    }
}
