//! Placement strategy trait and the shared candidate view.

use gridalloc_core::{HostId, NodeId, SubsetFallback};
use gridalloc_topology::{Host, Node, Topology};

use crate::descriptor::TopologyDescriptor;
use crate::filter::NodeFilter;
use crate::strategies::{
    ArbitraryStrategy, DifferentHostsExclusiveStrategy, MultipleHostsExclusiveStrategy,
    ProximityStrategy, SingleHostStrategy,
};

/// Output of a strategy: the caller's nodes and the nodes reserved
/// alongside them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub chosen: Vec<NodeId>,
    /// Reserved as a side effect of an exclusive strategy, never handed out.
    pub extra: Vec<NodeId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty() && self.extra.is_empty()
    }

    /// Every node that must move to BUSY.
    pub fn reserved(&self) -> impl Iterator<Item = &NodeId> {
        self.chosen.iter().chain(self.extra.iter())
    }
}

/// One placement algorithm.
///
/// Implementations are pure: they read the topology and never mutate it.
/// `chosen.len() <= k` must always hold and a shortage yields a smaller
/// selection, never an error.
pub trait PlacementStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn select(&self, topology: &Topology, filter: &NodeFilter<'_>, k: usize) -> Selection;
}

/// A host together with its eligible free nodes, in node order.
#[derive(Debug)]
pub struct HostCandidates<'t> {
    pub host: &'t Host,
    /// Registration position of the host.
    pub position: usize,
    pub nodes: Vec<&'t Node>,
}

impl HostCandidates<'_> {
    /// Eligible free nodes on this host.
    pub fn free_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn id(&self) -> &str {
        self.host.id()
    }

    pub(crate) fn take_ids(&self, n: usize) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().take(n).map(|node| node.id().to_string())
    }
}

/// Hosts with at least one eligible free node, in registration order.
pub fn eligible_hosts<'t>(topology: &'t Topology, filter: &NodeFilter<'_>) -> Vec<HostCandidates<'t>> {
    topology
        .hosts()
        .enumerate()
        .filter_map(|(position, host)| {
            let nodes = filter.apply(topology.nodes_of(host));
            (!nodes.is_empty()).then_some(HostCandidates {
                host,
                position,
                nodes,
            })
        })
        .collect()
}

/// Allocator-wide settings a descriptor falls back on.
#[derive(Debug, Clone, Default)]
pub struct StrategyDefaults {
    /// Pivot for proximity strategies when the descriptor names none.
    pub local_host: Option<HostId>,
    pub multi_host_fallback: SubsetFallback,
}

/// Resolve a descriptor into the strategy that implements it.
pub fn strategy_for(
    descriptor: &TopologyDescriptor,
    defaults: &StrategyDefaults,
) -> Box<dyn PlacementStrategy> {
    let pivots = |pivot: &Option<Vec<HostId>>| match pivot {
        Some(hosts) => hosts.clone(),
        None => defaults.local_host.iter().cloned().collect(),
    };

    match descriptor {
        TopologyDescriptor::Arbitrary => Box::new(ArbitraryStrategy),
        TopologyDescriptor::BestProximity { pivot } => {
            Box::new(ProximityStrategy::best(pivots(pivot)))
        }
        TopologyDescriptor::ThresholdProximity {
            max_distance,
            pivot,
        } => Box::new(ProximityStrategy::threshold(pivots(pivot), *max_distance)),
        TopologyDescriptor::SingleHost => Box::new(SingleHostStrategy::shared()),
        TopologyDescriptor::SingleHostExclusive => Box::new(SingleHostStrategy::exclusive()),
        TopologyDescriptor::MultipleHostsExclusive { fallback } => Box::new(
            MultipleHostsExclusiveStrategy::new(fallback.unwrap_or(defaults.multi_host_fallback)),
        ),
        TopologyDescriptor::DifferentHostsExclusive => Box::new(DifferentHostsExclusiveStrategy),
    }
}
