//! gridalloc.toml cluster configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{HostId, NodeId, SubsetFallback};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub allocator: AllocatorConfig,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub distances: Vec<DistanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Host the allocator runs on; default pivot for proximity strategies.
    pub local_host: Option<HostId>,
    /// When false, only the arbitrary strategy is accepted.
    #[serde(default = "default_true")]
    pub topology_enabled: bool,
    #[serde(default)]
    pub multi_host_fallback: SubsetFallback,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            local_host: None,
            topology_enabled: true,
            multi_host_fallback: SubsetFallback::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: HostId,
    /// Nodes in registration order.
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    /// Nodes registered in the DOWN state.
    #[serde(default)]
    pub down: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceConfig {
    pub from: HostId,
    pub to: HostId,
    pub value: u64,
}

impl ClusterConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: ClusterConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Total number of nodes declared across all hosts.
    pub fn node_count(&self) -> usize {
        self.hosts.iter().map(|h| h.nodes.len()).sum()
    }
}
