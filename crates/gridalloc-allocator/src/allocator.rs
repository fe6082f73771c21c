//! Allocator: serializes allocate/release over the shared topology.
//!
//! All mutation happens under one mutex. A request is validated before the
//! lock is taken; once inside, the strategy reads the topology, and the
//! resulting nodes are moved to BUSY before the lock is dropped, so two
//! concurrent allocations never see the same FREE node.
//!
//! Every BUSY node records the allocation holding it. A release only frees
//! nodes still held by its own allocation, so a late or repeated release
//! cannot hand back nodes that were given to someone else in between.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gridalloc_core::{ClusterConfig, HostId, NodeId, NodeState, SubsetFallback};
use gridalloc_placement::{NodeFilter, StrategyDefaults, TopologyDescriptor, strategy_for};
use gridalloc_topology::{Topology, TopologyError, TopologySnapshot};
use tracing::{debug, info, warn};

use crate::error::{AllocError, AllocResult};
use crate::node_set::{AllocationId, NodeSet};
use crate::request::AllocationRequest;

/// State guarded by the allocator lock.
#[derive(Debug, Default)]
struct Pool {
    topology: Topology,
    /// Holder of each BUSY node. Entries exist for BUSY nodes only.
    owners: HashMap<NodeId, AllocationId>,
    last_allocation: AllocationId,
}

/// Topology-aware node allocator.
///
/// `Send + Sync`; share it behind an `Arc` between callers.
pub struct Allocator {
    pool: Mutex<Pool>,
    defaults: StrategyDefaults,
    /// When false only `Arbitrary` requests are served.
    topology_enabled: bool,
}

impl Allocator {
    /// Create an allocator over an already populated topology.
    pub fn new(topology: Topology) -> Self {
        Self {
            pool: Mutex::new(Pool {
                topology,
                ..Pool::default()
            }),
            defaults: StrategyDefaults::default(),
            topology_enabled: true,
        }
    }

    /// Build the topology and allocator settings from a cluster config.
    ///
    /// A `local_host` that names no configured host is rejected.
    pub fn from_config(config: &ClusterConfig) -> AllocResult<Self> {
        let topology = Topology::from_config(config)?;
        if let Some(local) = &config.allocator.local_host {
            if topology.host(local).is_none() {
                return Err(TopologyError::UnknownHost(local.clone()).into());
            }
        }

        let mut allocator = Self::new(topology)
            .with_multi_host_fallback(config.allocator.multi_host_fallback)
            .with_topology_enabled(config.allocator.topology_enabled);
        if let Some(local) = &config.allocator.local_host {
            allocator = allocator.with_local_host(local.clone());
        }
        Ok(allocator)
    }

    /// Host the allocator runs on; the default proximity pivot.
    ///
    /// If the host is not registered when a proximity request runs, the
    /// first eligible host stands in for it.
    pub fn with_local_host(mut self, host: impl Into<HostId>) -> Self {
        self.defaults.local_host = Some(host.into());
        self
    }

    pub fn with_multi_host_fallback(mut self, fallback: SubsetFallback) -> Self {
        self.defaults.multi_host_fallback = fallback;
        self
    }

    pub fn with_topology_enabled(mut self, enabled: bool) -> Self {
        self.topology_enabled = enabled;
        self
    }

    pub fn local_host(&self) -> Option<&str> {
        self.defaults.local_host.as_deref()
    }

    // ── Allocation ─────────────────────────────────────────────────

    /// Allocate up to `request.max_nodes` nodes.
    ///
    /// Never waits for capacity: a shortage yields a smaller, possibly
    /// empty, `NodeSet`. Errors only for malformed requests.
    pub fn allocate(&self, request: &AllocationRequest) -> AllocResult<NodeSet> {
        self.validate(request)?;

        if request.max_nodes == 0 {
            return Ok(NodeSet::empty());
        }

        let strategy = strategy_for(&request.descriptor, &self.defaults);
        let filter = NodeFilter::new(&request.predicates, &request.excluded);

        let mut pool = self.lock();
        check_pivots(&pool.topology, &request.descriptor)?;

        let selection = strategy.select(&pool.topology, &filter, request.max_nodes);
        debug_assert!(selection.chosen.len() <= request.max_nodes);
        debug_assert!(
            selection
                .reserved()
                .all(|node| pool.topology.node_state(node) == Some(NodeState::Free)),
            "strategy selected a non-free node"
        );

        let allocation = pool.last_allocation.next();
        pool.last_allocation = allocation;
        for node in selection.reserved() {
            pool.topology.set_state(node, NodeState::Busy)?;
            pool.owners.insert(node.clone(), allocation);
        }
        drop(pool);

        let node_set = NodeSet::new(allocation, selection);
        if node_set.len() < request.max_nodes {
            warn!(
                strategy = strategy.name(),
                requested = request.max_nodes,
                granted = node_set.len(),
                "allocation short of request"
            );
        }
        info!(
            %allocation,
            strategy = strategy.name(),
            requested = request.max_nodes,
            selected = node_set.len(),
            extra = node_set.extra().len(),
            "nodes allocated"
        );
        Ok(node_set)
    }

    /// Return every node of `node_set`, selected and extra, to the FREE pool.
    ///
    /// Nodes that are already FREE, DOWN, no longer registered, or now held
    /// by a different allocation are skipped. Returns the number of nodes
    /// actually freed.
    pub fn release(&self, node_set: &NodeSet) -> usize {
        let allocation = node_set.allocation();
        let mut pool = self.lock();
        let mut freed = 0;
        for node in node_set.reserved() {
            match pool.topology.node_state(node) {
                Some(NodeState::Busy) if pool.owners.get(node) == Some(&allocation) => {
                    // Registered and BUSY: cannot fail.
                    if pool.topology.set_state(node, NodeState::Free).is_ok() {
                        pool.owners.remove(node);
                        freed += 1;
                    }
                }
                Some(NodeState::Busy) => warn!(
                    %node,
                    %allocation,
                    holder = ?pool.owners.get(node).map(ToString::to_string),
                    "release skipped node held by another allocation"
                ),
                Some(state) => debug!(%node, %state, "release skipped node not busy"),
                None => warn!(%node, "release of unknown node ignored"),
            }
        }
        drop(pool);

        info!(%allocation, freed, held = node_set.reserved().count(), "nodes released");
        freed
    }

    fn validate(&self, request: &AllocationRequest) -> AllocResult<()> {
        if !self.topology_enabled && request.descriptor.is_topology_aware() {
            return Err(AllocError::InvalidRequest(format!(
                "topology is disabled; strategy `{}` is unavailable",
                request.descriptor.name()
            )));
        }
        match &request.descriptor {
            TopologyDescriptor::BestProximity { pivot: Some(p) }
            | TopologyDescriptor::ThresholdProximity { pivot: Some(p), .. }
                if p.is_empty() =>
            {
                Err(AllocError::InvalidRequest("pivot host list is empty".to_string()))
            }
            _ => Ok(()),
        }
    }

    // ── Node source / health collaborators ─────────────────────────

    pub fn register_host(&self, host: &str) -> AllocResult<()> {
        self.lock().topology.register_host(host)?;
        Ok(())
    }

    pub fn register_node(&self, node: &str, host: &str) -> AllocResult<()> {
        self.lock().topology.register_node(node, host)?;
        Ok(())
    }

    /// Remove a node. If it is still part of an outstanding `NodeSet`, the
    /// later release skips it, even if the id is registered again.
    pub fn deregister_node(&self, node: &str) -> AllocResult<()> {
        let mut pool = self.lock();
        let removed = pool.topology.deregister_node(node)?;
        pool.owners.remove(node);
        drop(pool);
        if removed.state() == NodeState::Busy {
            warn!(%node, "busy node deregistered");
        }
        Ok(())
    }

    pub fn set_distance(&self, a: &str, b: &str, value: u64) -> AllocResult<()> {
        self.lock().topology.set_distance(a, b, value)?;
        Ok(())
    }

    /// Mark a node DOWN; it is never selected until marked up again.
    pub fn mark_down(&self, node: &str) -> AllocResult<()> {
        let mut pool = self.lock();
        let previous = pool.topology.set_state(node, NodeState::Down)?;
        pool.owners.remove(node);
        drop(pool);
        info!(%node, %previous, "node marked down");
        Ok(())
    }

    /// Bring a DOWN node back as FREE. Other states are left alone.
    pub fn mark_up(&self, node: &str) -> AllocResult<()> {
        let mut pool = self.lock();
        match pool.topology.node_state(node) {
            Some(NodeState::Down) => {
                pool.topology.set_state(node, NodeState::Free)?;
                info!(%node, "node marked up");
            }
            Some(state) => debug!(%node, %state, "mark up ignored, node not down"),
            None => {
                return Err(TopologyError::UnknownNode(node.to_string()).into());
            }
        }
        Ok(())
    }

    // ── Introspection ──────────────────────────────────────────────

    pub fn topology(&self) -> TopologySnapshot {
        self.lock().topology.snapshot()
    }

    pub fn free_count(&self, host: &str) -> usize {
        self.lock().topology.free_count(host)
    }

    pub fn node_state(&self, node: &str) -> Option<NodeState> {
        self.lock().topology.node_state(node)
    }

    /// Allocation currently holding a BUSY node.
    pub fn holder_of(&self, node: &str) -> Option<AllocationId> {
        self.lock().owners.get(node).copied()
    }

    pub fn host_of(&self, node: &str) -> Option<HostId> {
        self.lock().topology.host_of(node).map(str::to_string)
    }

    /// Ids of all FREE nodes, in topology order.
    pub fn free_nodes(&self) -> Vec<NodeId> {
        self.lock()
            .topology
            .all_free_nodes()
            .into_iter()
            .map(|n| n.id().to_string())
            .collect()
    }

    /// Every mutation completes before any point that could panic, so a
    /// poisoned pool is still consistent.
    fn lock(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Explicit pivots must name registered hosts. Checked under the lock,
/// before anything is marked.
fn check_pivots(topology: &Topology, descriptor: &TopologyDescriptor) -> AllocResult<()> {
    let pivots = match descriptor {
        TopologyDescriptor::BestProximity { pivot: Some(p) }
        | TopologyDescriptor::ThresholdProximity { pivot: Some(p), .. } => p,
        _ => return Ok(()),
    };
    match pivots.iter().find(|host| topology.host(host).is_none()) {
        Some(host) => Err(AllocError::InvalidRequest(format!(
            "unknown pivot host `{host}`"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridalloc_placement::MatchTable;

    fn three_hosts() -> Allocator {
        let mut t = Topology::new();
        for (host, count) in [("current", 6), ("neighbor", 1), ("distant", 2)] {
            t.register_host(host).unwrap();
            for i in 0..count {
                t.register_node(&format!("node://{host}/{i}"), host).unwrap();
            }
        }
        t.set_distance("current", "neighbor", 10).unwrap();
        t.set_distance("current", "distant", 100).unwrap();
        Allocator::new(t).with_local_host("current")
    }

    fn request(k: usize, descriptor: TopologyDescriptor) -> AllocationRequest {
        AllocationRequest::new(k, descriptor)
    }

    #[test]
    fn allocate_marks_selected_and_extra_busy() {
        let alloc = three_hosts();
        let set = alloc
            .allocate(&request(3, TopologyDescriptor::SingleHostExclusive))
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.extra().len(), 3);
        for node in set.reserved() {
            assert_eq!(alloc.node_state(node), Some(NodeState::Busy));
        }
        assert_eq!(alloc.free_count("current"), 0);
    }

    #[test]
    fn zero_request_is_empty() {
        let alloc = three_hosts();
        let set = alloc.allocate(&request(0, TopologyDescriptor::Arbitrary)).unwrap();
        assert!(set.is_empty());
        assert_eq!(alloc.free_nodes().len(), 9);
    }

    #[test]
    fn release_restores_free_pool() {
        let alloc = three_hosts();
        let before = alloc.topology();
        let set = alloc
            .allocate(&request(3, TopologyDescriptor::DifferentHostsExclusive))
            .unwrap();
        assert_eq!(alloc.free_nodes().len(), 0);

        assert_eq!(alloc.release(&set), 9);
        assert_eq!(alloc.topology(), before);
    }

    #[test]
    fn double_release_is_a_no_op() {
        let alloc = three_hosts();
        let set = alloc.allocate(&request(2, TopologyDescriptor::Arbitrary)).unwrap();
        assert_eq!(alloc.release(&set), 2);
        assert_eq!(alloc.release(&set), 0);
        assert_eq!(alloc.free_nodes().len(), 9);
    }

    #[test]
    fn stale_release_leaves_later_holder_alone() {
        let mut t = Topology::new();
        t.register_host("h").unwrap();
        t.register_node("h/0", "h").unwrap();
        let alloc = Allocator::new(t);

        let a = alloc.allocate(&request(1, TopologyDescriptor::Arbitrary)).unwrap();
        assert_eq!(alloc.release(&a), 1);

        let b = alloc.allocate(&request(1, TopologyDescriptor::Arbitrary)).unwrap();
        assert_eq!(b.selected(), ["h/0"]);
        assert_ne!(a.allocation(), b.allocation());

        assert_eq!(alloc.release(&a), 0);
        assert_eq!(alloc.node_state("h/0"), Some(NodeState::Busy));
        assert_eq!(alloc.holder_of("h/0"), Some(b.allocation()));

        let c = alloc.allocate(&request(1, TopologyDescriptor::Arbitrary)).unwrap();
        assert!(c.is_empty());

        assert_eq!(alloc.release(&b), 1);
        assert_eq!(alloc.holder_of("h/0"), None);
    }

    #[test]
    fn late_release_after_reregistration_is_ignored() {
        let alloc = three_hosts();
        let a = alloc.allocate(&request(1, TopologyDescriptor::Arbitrary)).unwrap();
        let node = a.selected()[0].clone();

        alloc.deregister_node(&node).unwrap();
        alloc.register_node(&node, "current").unwrap();
        let b = alloc.allocate(&request(9, TopologyDescriptor::Arbitrary)).unwrap();
        assert!(b.contains(&node));

        assert_eq!(alloc.release(&a), 0);
        assert_eq!(alloc.node_state(&node), Some(NodeState::Busy));
        assert_eq!(alloc.release(&b), 9);
    }

    #[test]
    fn empty_set_release_frees_nothing() {
        let alloc = three_hosts();
        let _held = alloc.allocate(&request(2, TopologyDescriptor::Arbitrary)).unwrap();
        assert_eq!(alloc.release(&NodeSet::empty()), 0);
        assert_eq!(alloc.free_nodes().len(), 7);
    }

    #[test]
    fn release_skips_deregistered_and_down_nodes() {
        let alloc = three_hosts();
        let set = alloc.allocate(&request(3, TopologyDescriptor::Arbitrary)).unwrap();

        alloc.deregister_node(&set.selected()[0]).unwrap();
        alloc.mark_down(&set.selected()[1]).unwrap();

        assert_eq!(alloc.release(&set), 1);
        assert_eq!(alloc.node_state(&set.selected()[1]), Some(NodeState::Down));
        assert_eq!(alloc.node_state(&set.selected()[2]), Some(NodeState::Free));
    }

    #[test]
    fn down_nodes_are_never_selected() {
        let alloc = three_hosts();
        alloc.mark_down("node://neighbor/0").unwrap();

        let set = alloc
            .allocate(&request(9, TopologyDescriptor::Arbitrary))
            .unwrap();
        assert_eq!(set.len(), 8);
        assert!(!set.contains("node://neighbor/0"));

        alloc.mark_up("node://neighbor/0").unwrap();
        assert_eq!(alloc.node_state("node://neighbor/0"), Some(NodeState::Free));
    }

    #[test]
    fn mark_up_leaves_busy_nodes_alone() {
        let alloc = three_hosts();
        let set = alloc.allocate(&request(1, TopologyDescriptor::Arbitrary)).unwrap();
        alloc.mark_up(&set.selected()[0]).unwrap();
        assert_eq!(alloc.node_state(&set.selected()[0]), Some(NodeState::Busy));
        assert!(alloc.mark_up("node://ghost/0").is_err());
    }

    #[test]
    fn disabled_topology_only_serves_arbitrary() {
        let alloc = three_hosts().with_topology_enabled(false);

        let err = alloc
            .allocate(&request(1, TopologyDescriptor::SingleHost))
            .unwrap_err();
        assert!(matches!(err, AllocError::InvalidRequest(_)));
        assert_eq!(alloc.free_nodes().len(), 9);

        let set = alloc.allocate(&request(1, TopologyDescriptor::Arbitrary)).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_pivot_list_is_invalid() {
        let alloc = three_hosts();
        let descriptor = TopologyDescriptor::BestProximity {
            pivot: Some(Vec::new()),
        };
        assert!(matches!(
            alloc.allocate(&request(1, descriptor)),
            Err(AllocError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unknown_explicit_pivot_is_invalid() {
        let alloc = three_hosts();
        let descriptor = TopologyDescriptor::ThresholdProximity {
            max_distance: 50,
            pivot: Some(vec!["current".to_string(), "typo".to_string()]),
        };
        let err = alloc.allocate(&request(2, descriptor)).unwrap_err();
        assert!(matches!(err, AllocError::InvalidRequest(ref msg) if msg.contains("typo")));
        assert_eq!(alloc.free_nodes().len(), 9);
    }

    #[test]
    fn unregistered_local_host_falls_back_to_first_host() {
        let alloc = three_hosts().with_local_host("typo");
        let set = alloc
            .allocate(&request(7, TopologyDescriptor::best_proximity()))
            .unwrap();
        assert_eq!(set.len(), 7);
        assert!(set.contains("node://neighbor/0"));
        assert!(!set.contains("node://distant/0"));
    }

    #[test]
    fn predicates_and_exclusions_apply() {
        let alloc = three_hosts();
        let req = request(5, TopologyDescriptor::Arbitrary)
            .with_predicate(MatchTable::matching([
                "node://current/0",
                "node://current/1",
                "node://distant/0",
            ]))
            .with_excluded(["node://current/1"]);

        let set = alloc.allocate(&req).unwrap();
        assert_eq!(set.selected(), ["node://current/0", "node://distant/0"]);
    }

    #[test]
    fn collaborators_extend_topology() {
        let alloc = three_hosts();
        alloc.register_host("fresh").unwrap();
        alloc.register_node("node://fresh/0", "fresh").unwrap();
        alloc.set_distance("current", "fresh", 5).unwrap();
        assert_eq!(alloc.host_of("node://fresh/0").as_deref(), Some("fresh"));

        // fresh is now nearer than neighbor.
        let set = alloc
            .allocate(&request(7, TopologyDescriptor::best_proximity()))
            .unwrap();
        assert!(set.contains("node://fresh/0"));
        assert!(!set.contains("node://neighbor/0"));

        assert!(matches!(
            alloc.register_host("fresh"),
            Err(AllocError::Topology(_))
        ));
    }

    #[test]
    fn from_config_applies_allocator_settings() {
        let config = ClusterConfig::parse(
            r#"
[allocator]
local_host = "b"
topology_enabled = true
multi_host_fallback = "exact-only"

[[hosts]]
name = "a"
nodes = ["a/0", "a/1", "a/2"]

[[hosts]]
name = "b"
nodes = ["b/0"]
"#,
        )
        .unwrap();
        let alloc = Allocator::from_config(&config).unwrap();
        assert_eq!(alloc.local_host(), Some("b"));

        let set = alloc
            .allocate(&request(2, TopologyDescriptor::multiple_hosts_exclusive()))
            .unwrap();
        assert!(set.is_empty());

        let set = alloc
            .allocate(&request(1, TopologyDescriptor::best_proximity()))
            .unwrap();
        assert_eq!(set.selected(), ["b/0"]);
    }

    #[test]
    fn from_config_rejects_unknown_local_host() {
        let config = ClusterConfig::parse(
            r#"
[allocator]
local_host = "typo"

[[hosts]]
name = "a"
nodes = ["a/0", "a/1"]
"#,
        )
        .unwrap();
        assert!(matches!(
            Allocator::from_config(&config),
            Err(AllocError::Topology(TopologyError::UnknownHost(ref h))) if h == "typo"
        ));
    }
}
