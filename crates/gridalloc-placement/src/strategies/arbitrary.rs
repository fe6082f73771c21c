use gridalloc_topology::Topology;
use tracing::debug;

use crate::filter::NodeFilter;
use crate::strategy::{PlacementStrategy, Selection};

/// First `k` eligible free nodes in topology order; ignores distances.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitraryStrategy;

impl PlacementStrategy for ArbitraryStrategy {
    fn name(&self) -> &'static str {
        "arbitrary"
    }

    fn select(&self, topology: &Topology, filter: &NodeFilter<'_>, k: usize) -> Selection {
        let chosen: Vec<String> = filter
            .apply(topology.all_free_nodes())
            .into_iter()
            .take(k)
            .map(|n| n.id().to_string())
            .collect();
        debug!(requested = k, chosen = chosen.len(), "arbitrary selection");
        Selection {
            chosen,
            extra: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::strategies::fixtures::three_hosts;

    #[test]
    fn takes_nodes_in_topology_order() {
        let t = three_hosts();
        let excluded = HashSet::new();
        let filter = NodeFilter::new(&[], &excluded);

        let s = ArbitraryStrategy.select(&t, &filter, 2);
        assert_eq!(s.chosen, vec!["node://current/0", "node://current/1"]);
        assert!(s.extra.is_empty());
    }

    #[test]
    fn never_exceeds_eligible_count() {
        let t = three_hosts();
        let excluded: HashSet<String> = ["node://distant/1".to_string()].into();
        let filter = NodeFilter::new(&[], &excluded);

        let s = ArbitraryStrategy.select(&t, &filter, 50);
        assert_eq!(s.chosen.len(), 8);
        assert!(!s.chosen.contains(&"node://distant/1".to_string()));
    }
}
