//! Whole-host exclusive placement across several hosts.
//!
//! Every eligible host is an indivisible bin holding its eligible free
//! nodes. A subset of bins is taken wholesale, so nothing is ever left
//! idle on a touched host and the selection never carries extra nodes.

use gridalloc_core::SubsetFallback;
use gridalloc_topology::Topology;
use tracing::{debug, warn};

use crate::filter::NodeFilter;
use crate::strategy::{PlacementStrategy, Selection, eligible_hosts};
use crate::subset::best_subset;

#[derive(Debug, Clone, Copy, Default)]
pub struct MultipleHostsExclusiveStrategy {
    fallback: SubsetFallback,
}

impl MultipleHostsExclusiveStrategy {
    pub fn new(fallback: SubsetFallback) -> Self {
        Self { fallback }
    }
}

impl PlacementStrategy for MultipleHostsExclusiveStrategy {
    fn name(&self) -> &'static str {
        "multiple-hosts-exclusive"
    }

    fn select(&self, topology: &Topology, filter: &NodeFilter<'_>, k: usize) -> Selection {
        let hosts = eligible_hosts(topology, filter);
        let capacities: Vec<usize> = hosts.iter().map(|h| h.free_count()).collect();
        let picked = best_subset(&capacities, k, self.fallback);

        let mut chosen = Vec::new();
        for &i in &picked {
            let host = &hosts[i];
            chosen.extend(host.take_ids(host.free_count()));
            debug!(host = host.id(), nodes = host.free_count(), "host taken whole");
        }

        if chosen.len() != k {
            warn!(
                requested = k,
                chosen = chosen.len(),
                fallback = %self.fallback,
                "no exact host combination for request"
            );
        }
        Selection {
            chosen,
            extra: Vec::new(),
        }
    }
}
