//! One node per host, each touched host reserved entirely.
//!
//! Hosts with the fewest eligible free nodes go first, which keeps the
//! number of collaterally reserved nodes low.

use gridalloc_topology::Topology;
use tracing::debug;

use crate::filter::NodeFilter;
use crate::strategy::{PlacementStrategy, Selection, eligible_hosts};

#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentHostsExclusiveStrategy;

impl PlacementStrategy for DifferentHostsExclusiveStrategy {
    fn name(&self) -> &'static str {
        "different-hosts-exclusive"
    }

    fn select(&self, topology: &Topology, filter: &NodeFilter<'_>, k: usize) -> Selection {
        let mut hosts = eligible_hosts(topology, filter);
        hosts.sort_by_key(|h| (h.free_count(), h.position));

        let mut selection = Selection::default();
        for host in hosts.iter().take(k) {
            let (first, rest) = host.nodes.split_at(1);
            selection.chosen.extend(first.iter().map(|n| n.id().to_string()));
            selection.extra.extend(rest.iter().map(|n| n.id().to_string()));
            debug!(host = host.id(), extra = rest.len(), "host reserved for one node");
        }
        selection
    }
}
