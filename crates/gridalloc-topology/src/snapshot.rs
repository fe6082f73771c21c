//! Serializable read-only views of a topology.
//!
//! Handed out to diagnostics and tests; detached from the live topology so
//! holding one never blocks the allocator.

use gridalloc_core::{HostId, NodeId, NodeState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Hosts in registration order.
    pub hosts: Vec<HostSnapshot>,
    /// Known distances, one entry per unordered host pair.
    pub distances: Vec<DistanceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub id: HostId,
    pub free_count: usize,
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub state: NodeState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceSnapshot {
    pub from: HostId,
    pub to: HostId,
    pub value: u64,
}

impl TopologySnapshot {
    pub fn host_ids(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|h| h.id.as_str())
    }

    pub fn host(&self, id: &str) -> Option<&HostSnapshot> {
        self.hosts.iter().find(|h| h.id == id)
    }

    /// Same contract as `Topology::distance`.
    pub fn distance(&self, a: &str, b: &str) -> Option<u64> {
        if a == b {
            return self.host(a).map(|_| 0);
        }
        self.distances
            .iter()
            .find(|d| (d.from == a && d.to == b) || (d.from == b && d.to == a))
            .map(|d| d.value)
    }
}
