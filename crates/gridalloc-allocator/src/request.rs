//! Allocation requests.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use gridalloc_core::NodeId;
use gridalloc_placement::{EligibilityPredicate, Predicate, TopologyDescriptor};

use crate::error::{AllocError, AllocResult};

/// "At most `max_nodes` nodes, placed by `descriptor`, passing every
/// predicate, never one of `excluded`."
#[derive(Clone)]
pub struct AllocationRequest {
    pub max_nodes: usize,
    pub descriptor: TopologyDescriptor,
    /// Combined with logical AND.
    pub predicates: Vec<Predicate>,
    pub excluded: HashSet<NodeId>,
}

impl AllocationRequest {
    pub fn new(max_nodes: usize, descriptor: TopologyDescriptor) -> Self {
        Self {
            max_nodes,
            descriptor,
            predicates: Vec::new(),
            excluded: HashSet::new(),
        }
    }

    /// Build a request from untyped input such as CLI flags or an RPC
    /// payload. Negative counts and malformed descriptors are rejected.
    pub fn parse(max_nodes: i64, descriptor: &str) -> AllocResult<Self> {
        let max_nodes = usize::try_from(max_nodes).map_err(|_| {
            AllocError::InvalidRequest(format!("node count must be non-negative, got {max_nodes}"))
        })?;
        Ok(Self::new(max_nodes, descriptor.parse()?))
    }

    pub fn with_predicate(mut self, predicate: impl EligibilityPredicate + 'static) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn with_excluded<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.excluded.extend(nodes.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for AllocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationRequest")
            .field("max_nodes", &self.max_nodes)
            .field("descriptor", &self.descriptor)
            .field("predicates", &self.predicates.len())
            .field("excluded", &self.excluded)
            .finish()
    }
}
