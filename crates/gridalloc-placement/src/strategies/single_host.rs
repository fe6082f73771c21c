//! Single-host placement, shared or exclusive.
//!
//! Host choice is best fit: the host with the fewest eligible free nodes
//! that still covers the request, or failing that the host with the most.
//! Ties go to the earlier registered host.

use gridalloc_topology::Topology;
use tracing::debug;

use crate::filter::NodeFilter;
use crate::strategy::{HostCandidates, PlacementStrategy, Selection, eligible_hosts};

#[derive(Debug, Clone, Copy)]
pub struct SingleHostStrategy {
    /// Reserve the rest of the chosen host as extra nodes.
    exclusive: bool,
}

impl SingleHostStrategy {
    pub fn shared() -> Self {
        Self { exclusive: false }
    }

    pub fn exclusive() -> Self {
        Self { exclusive: true }
    }
}

/// Best-fit host for `k` nodes.
pub(crate) fn best_fit<'a, 't>(hosts: &'a [HostCandidates<'t>], k: usize) -> Option<&'a HostCandidates<'t>> {
    let tightest = hosts
        .iter()
        .filter(|h| h.free_count() >= k)
        .min_by_key(|h| (h.free_count(), h.position));
    tightest.or_else(|| {
        hosts
            .iter()
            .max_by_key(|h| (h.free_count(), std::cmp::Reverse(h.position)))
    })
}

impl PlacementStrategy for SingleHostStrategy {
    fn name(&self) -> &'static str {
        if self.exclusive {
            "single-host-exclusive"
        } else {
            "single-host"
        }
    }

    fn select(&self, topology: &Topology, filter: &NodeFilter<'_>, k: usize) -> Selection {
        let hosts = eligible_hosts(topology, filter);
        let Some(host) = best_fit(&hosts, k) else {
            debug!(strategy = self.name(), "no eligible host");
            return Selection::default();
        };

        let take = k.min(host.free_count());
        let chosen: Vec<String> = host.take_ids(take).collect();
        let extra: Vec<String> = if self.exclusive {
            host.nodes[take..].iter().map(|n| n.id().to_string()).collect()
        } else {
            Vec::new()
        };

        debug!(
            strategy = self.name(),
            host = host.id(),
            free = host.free_count(),
            chosen = chosen.len(),
            extra = extra.len(),
            "single host selection"
        );
        Selection { chosen, extra }
    }
}
