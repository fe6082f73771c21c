//! Proximity-clustered placement.
//!
//! Hosts are visited nearest-first from the pivot and drained in node
//! order until the request is met. A host whose distance to the pivot is
//! unknown is never visited unless it is itself a pivot.

use gridalloc_core::HostId;
use gridalloc_topology::Topology;
use tracing::{debug, warn};

use crate::filter::NodeFilter;
use crate::strategy::{PlacementStrategy, Selection, eligible_hosts};

#[derive(Debug, Clone)]
pub struct ProximityStrategy {
    /// Unregistered hosts are ignored; none left means "first eligible
    /// host".
    pivots: Vec<HostId>,
    /// Upper bound on the pivot distance of visited hosts.
    max_distance: Option<u64>,
}

impl ProximityStrategy {
    pub fn best(pivots: Vec<HostId>) -> Self {
        Self {
            pivots,
            max_distance: None,
        }
    }

    pub fn threshold(pivots: Vec<HostId>, max_distance: u64) -> Self {
        Self {
            pivots,
            max_distance: Some(max_distance),
        }
    }

    /// Distance from the pivot set: zero for a pivot, otherwise the largest
    /// distance to any pivot, unknown if any of them is unknown.
    fn pivot_distance(&self, topology: &Topology, pivots: &[&str], host: &str) -> Option<u64> {
        if pivots.contains(&host) {
            return Some(0);
        }
        pivots
            .iter()
            .map(|p| topology.distance(p, host))
            .try_fold(0, |acc, d| d.map(|d| acc.max(d)))
    }
}

impl PlacementStrategy for ProximityStrategy {
    fn name(&self) -> &'static str {
        match self.max_distance {
            Some(_) => "threshold-proximity",
            None => "best-proximity",
        }
    }

    fn select(&self, topology: &Topology, filter: &NodeFilter<'_>, k: usize) -> Selection {
        let hosts = eligible_hosts(topology, filter);

        let mut pivots: Vec<&str> = self
            .pivots
            .iter()
            .map(String::as_str)
            .filter(|p| topology.host(p).is_some())
            .collect();
        if pivots.len() < self.pivots.len() {
            warn!(pivots = ?self.pivots, "ignoring unregistered pivot hosts");
        }
        if pivots.is_empty() {
            pivots.extend(hosts.first().map(|h| h.id()));
        }

        let mut ranked: Vec<(u64, usize, &_)> = hosts
            .iter()
            .filter_map(|h| {
                let d = self.pivot_distance(topology, &pivots, h.id())?;
                let within = self.max_distance.is_none_or(|max| d <= max);
                within.then_some((d, h.position, h))
            })
            .collect();
        ranked.sort_by_key(|&(d, position, _)| (d, position));

        let mut chosen: Vec<String> = Vec::new();
        for (d, _, host) in ranked {
            let remaining = k - chosen.len();
            if remaining == 0 {
                break;
            }
            let before = chosen.len();
            chosen.extend(host.take_ids(remaining));
            debug!(
                host = host.id(),
                distance = d,
                taken = chosen.len() - before,
                "drained host"
            );
        }

        debug!(
            strategy = self.name(),
            pivots = ?pivots,
            requested = k,
            chosen = chosen.len(),
            "proximity selection"
        );
        Selection {
            chosen,
            extra: Vec::new(),
        }
    }
}
