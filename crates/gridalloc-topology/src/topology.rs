//! Topology: hosts, their node pools, and inter-host distances.
//!
//! The topology is a plain value: it performs no locking of its own. The
//! allocator owns it behind a mutex and funnels every mutation through
//! that lock.

use std::collections::{BTreeMap, HashMap};

use gridalloc_core::{ClusterConfig, HostId, NodeId, NodeState};
use tracing::{debug, info};

use crate::error::{TopologyError, TopologyResult};
use crate::snapshot::{DistanceSnapshot, HostSnapshot, NodeSnapshot, TopologySnapshot};

/// A machine hosting zero or more nodes.
#[derive(Debug, Clone)]
pub struct Host {
    id: HostId,
    /// Node ids in registration order.
    nodes: Vec<NodeId>,
}

impl Host {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node ids in registration order, whatever their state.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// An allocatable execution unit owned by exactly one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    host: HostId,
    state: NodeState,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_free(&self) -> bool {
        self.state == NodeState::Free
    }
}

/// The full cluster inventory.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Hosts in registration order.
    hosts: Vec<Host>,
    /// host id → position in `hosts`.
    host_index: HashMap<HostId, usize>,
    nodes: HashMap<NodeId, Node>,
    /// Keyed by the lexicographically ordered host pair.
    distances: BTreeMap<(HostId, HostId), u64>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a topology from the `[[hosts]]` and `[[distances]]` sections
    /// of a cluster configuration.
    pub fn from_config(config: &ClusterConfig) -> TopologyResult<Self> {
        let mut topology = Self::new();
        for host in &config.hosts {
            topology.register_host(&host.name)?;
            for node in &host.nodes {
                topology.register_node(node, &host.name)?;
            }
            for node in &host.down {
                if topology.host_of(node) != Some(host.name.as_str()) {
                    return Err(TopologyError::UnknownNode(node.clone()));
                }
                topology.set_state(node, NodeState::Down)?;
            }
        }
        for d in &config.distances {
            topology.set_distance(&d.from, &d.to, d.value)?;
        }
        info!(
            hosts = topology.hosts.len(),
            nodes = topology.nodes.len(),
            distances = topology.distances.len(),
            "topology loaded from config"
        );
        Ok(topology)
    }

    // ── Registration ───────────────────────────────────────────────

    pub fn register_host(&mut self, id: &str) -> TopologyResult<()> {
        if self.host_index.contains_key(id) {
            return Err(TopologyError::DuplicateHost(id.to_string()));
        }
        self.host_index.insert(id.to_string(), self.hosts.len());
        self.hosts.push(Host {
            id: id.to_string(),
            nodes: Vec::new(),
        });
        debug!(host = id, "host registered");
        Ok(())
    }

    /// Register a FREE node on an already registered host.
    pub fn register_node(&mut self, id: &str, host: &str) -> TopologyResult<()> {
        if self.nodes.contains_key(id) {
            return Err(TopologyError::DuplicateNode(id.to_string()));
        }
        let pos = *self
            .host_index
            .get(host)
            .ok_or_else(|| TopologyError::UnknownHost(host.to_string()))?;
        self.hosts[pos].nodes.push(id.to_string());
        self.nodes.insert(
            id.to_string(),
            Node {
                id: id.to_string(),
                host: host.to_string(),
                state: NodeState::Free,
            },
        );
        debug!(node = id, host, "node registered");
        Ok(())
    }

    /// Remove a node, returning its last known record.
    pub fn deregister_node(&mut self, id: &str) -> TopologyResult<Node> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.to_string()))?;
        if let Some(&pos) = self.host_index.get(&node.host) {
            self.hosts[pos].nodes.retain(|n| n != id);
        }
        debug!(node = id, host = %node.host, state = %node.state, "node deregistered");
        Ok(node)
    }

    /// Record the distance between two hosts. Symmetric; a host's distance
    /// to itself is always zero and is not stored.
    pub fn set_distance(&mut self, a: &str, b: &str, value: u64) -> TopologyResult<()> {
        for host in [a, b] {
            if !self.host_index.contains_key(host) {
                return Err(TopologyError::UnknownHost(host.to_string()));
            }
        }
        if a == b {
            return Ok(());
        }
        self.distances.insert(pair_key(a, b), value);
        Ok(())
    }

    /// Overwrite a node's state, returning the previous one.
    pub fn set_state(&mut self, id: &str, state: NodeState) -> TopologyResult<NodeState> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.to_string()))?;
        Ok(std::mem::replace(&mut node.state, state))
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Hosts in registration order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn host(&self, id: &str) -> Option<&Host> {
        self.host_index.get(id).map(|&pos| &self.hosts[pos])
    }

    /// Registration position of a host; the tie-break key for strategies.
    pub fn host_position(&self, id: &str) -> Option<usize> {
        self.host_index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_state(&self, id: &str) -> Option<NodeState> {
        self.nodes.get(id).map(|n| n.state)
    }

    pub fn host_of(&self, node: &str) -> Option<&str> {
        self.nodes.get(node).map(|n| n.host.as_str())
    }

    /// Distance between two hosts, `None` when unmeasured or either host
    /// is unknown.
    pub fn distance(&self, a: &str, b: &str) -> Option<u64> {
        if a == b {
            return self.host_index.contains_key(a).then_some(0);
        }
        self.distances.get(&pair_key(a, b)).copied()
    }

    /// All nodes of a host in registration order, whatever their state.
    pub fn nodes_of<'a>(&'a self, host: &'a Host) -> impl Iterator<Item = &'a Node> + 'a {
        host.nodes.iter().filter_map(|id| self.nodes.get(id))
    }

    /// FREE nodes of a host in node registration order.
    pub fn free_nodes(&self, host: &str) -> Vec<&Node> {
        match self.host(host) {
            Some(h) => self.nodes_of(h).filter(|n| n.is_free()).collect(),
            None => Vec::new(),
        }
    }

    /// FREE nodes across all hosts: host registration order, then node
    /// registration order.
    pub fn all_free_nodes(&self) -> Vec<&Node> {
        self.hosts
            .iter()
            .flat_map(|h| self.nodes_of(h))
            .filter(|n| n.is_free())
            .collect()
    }

    /// Number of FREE nodes on a host; zero for unknown hosts.
    pub fn free_count(&self, host: &str) -> usize {
        self.host(host)
            .map(|h| self.nodes_of(h).filter(|n| n.is_free()).count())
            .unwrap_or(0)
    }

    /// Read-only copy of the whole topology for diagnostics.
    pub fn snapshot(&self) -> TopologySnapshot {
        let hosts = self
            .hosts
            .iter()
            .map(|h| HostSnapshot {
                id: h.id.clone(),
                free_count: self.free_count(&h.id),
                nodes: self
                    .nodes_of(h)
                    .map(|n| NodeSnapshot {
                        id: n.id.clone(),
                        state: n.state,
                    })
                    .collect(),
            })
            .collect();
        let distances = self
            .distances
            .iter()
            .map(|((from, to), &value)| DistanceSnapshot {
                from: from.clone(),
                to: to.clone(),
                value,
            })
            .collect();
        TopologySnapshot { hosts, distances }
    }
}

fn pair_key(a: &str, b: &str) -> (HostId, HostId) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_hosts() -> Topology {
        let mut t = Topology::new();
        t.register_host("alpha").unwrap();
        t.register_host("beta").unwrap();
        t.register_node("alpha/0", "alpha").unwrap();
        t.register_node("alpha/1", "alpha").unwrap();
        t.register_node("beta/0", "beta").unwrap();
        t
    }

    #[test]
    fn rejects_duplicate_host() {
        let mut t = two_hosts();
        assert_eq!(
            t.register_host("alpha"),
            Err(TopologyError::DuplicateHost("alpha".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_node_and_unknown_host() {
        let mut t = two_hosts();
        assert_eq!(
            t.register_node("alpha/0", "beta"),
            Err(TopologyError::DuplicateNode("alpha/0".to_string()))
        );
        assert_eq!(
            t.register_node("gamma/0", "gamma"),
            Err(TopologyError::UnknownHost("gamma".to_string()))
        );
    }

    #[test]
    fn all_free_nodes_follow_registration_order() {
        let t = two_hosts();
        let ids: Vec<&str> = t.all_free_nodes().iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["alpha/0", "alpha/1", "beta/0"]);
    }

    #[test]
    fn free_count_excludes_busy_and_down() {
        let mut t = two_hosts();
        assert_eq!(t.free_count("alpha"), 2);

        t.set_state("alpha/0", NodeState::Busy).unwrap();
        assert_eq!(t.free_count("alpha"), 1);

        t.set_state("alpha/1", NodeState::Down).unwrap();
        assert_eq!(t.free_count("alpha"), 0);
        assert!(t.free_nodes("alpha").is_empty());
        assert_eq!(t.free_count("nowhere"), 0);
    }

    #[test]
    fn set_state_returns_previous() {
        let mut t = two_hosts();
        assert_eq!(t.set_state("beta/0", NodeState::Busy), Ok(NodeState::Free));
        assert_eq!(t.set_state("beta/0", NodeState::Free), Ok(NodeState::Busy));
        assert!(t.set_state("ghost", NodeState::Free).is_err());
    }

    #[test]
    fn distance_is_symmetric() {
        let mut t = two_hosts();
        t.set_distance("beta", "alpha", 7).unwrap();
        assert_eq!(t.distance("alpha", "beta"), Some(7));
        assert_eq!(t.distance("beta", "alpha"), Some(7));
    }

    #[test]
    fn self_distance_is_zero_and_unknown_is_none() {
        let mut t = two_hosts();
        assert_eq!(t.distance("alpha", "alpha"), Some(0));
        assert_eq!(t.distance("alpha", "beta"), None);
        assert_eq!(t.distance("ghost", "ghost"), None);

        t.set_distance("alpha", "alpha", 99).unwrap();
        assert_eq!(t.distance("alpha", "alpha"), Some(0));
        assert!(t.set_distance("alpha", "ghost", 1).is_err());
    }

    #[test]
    fn deregister_preserves_remaining_order() {
        let mut t = two_hosts();
        t.register_node("alpha/2", "alpha").unwrap();

        let removed = t.deregister_node("alpha/1").unwrap();
        assert_eq!(removed.host(), "alpha");

        let ids: Vec<&str> = t.free_nodes("alpha").iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["alpha/0", "alpha/2"]);
        assert!(t.node("alpha/1").is_none());
        assert!(t.deregister_node("alpha/1").is_err());
    }

    #[test]
    fn from_config_registers_everything() {
        let config = ClusterConfig::parse(
            r#"
[[hosts]]
name = "a"
nodes = ["a/0", "a/1"]
down = ["a/1"]

[[hosts]]
name = "b"
nodes = ["b/0"]

[[distances]]
from = "a"
to = "b"
value = 3
"#,
        )
        .unwrap();

        let t = Topology::from_config(&config).unwrap();
        assert_eq!(t.host_count(), 2);
        assert_eq!(t.node_count(), 3);
        assert_eq!(t.node_state("a/1"), Some(NodeState::Down));
        assert_eq!(t.free_count("a"), 1);
        assert_eq!(t.distance("b", "a"), Some(3));
    }

    #[test]
    fn from_config_rejects_down_node_of_other_host() {
        let config = ClusterConfig::parse(
            r#"
[[hosts]]
name = "a"
nodes = ["a/0"]
down = ["b/0"]
"#,
        )
        .unwrap();

        assert_eq!(
            Topology::from_config(&config).unwrap_err(),
            TopologyError::UnknownNode("b/0".to_string())
        );
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut t = two_hosts();
        t.set_state("alpha/0", NodeState::Busy).unwrap();
        t.set_distance("alpha", "beta", 4).unwrap();

        let snap = t.snapshot();
        assert_eq!(snap.hosts.len(), 2);
        assert_eq!(snap.hosts[0].free_count, 1);
        assert_eq!(snap.hosts[0].nodes[0].state, NodeState::Busy);
        assert_eq!(snap.distance("beta", "alpha"), Some(4));
    }
}
