//! NodeSet: the result of an allocation.

use std::fmt;

use gridalloc_core::NodeId;
use gridalloc_placement::Selection;
use serde::{Deserialize, Serialize};

/// Identifies one allocation. A node is only freed by a release that
/// carries the id of the allocation currently holding it.
///
/// Zero is never issued; empty sets carry it and own nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(u64);

impl AllocationId {
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Nodes handed to the caller plus the nodes reserved alongside them.
///
/// `selected` and `extra` are disjoint. Both are fixed once the set is
/// produced; releasing the set frees their union.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSet {
    allocation: AllocationId,
    selected: Vec<NodeId>,
    extra: Vec<NodeId>,
}

impl NodeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(allocation: AllocationId, selection: Selection) -> Self {
        Self {
            allocation,
            selected: selection.chosen,
            extra: selection.extra,
        }
    }

    /// The allocation that produced this set.
    pub fn allocation(&self) -> AllocationId {
        self.allocation
    }

    /// Nodes the caller may use, in selection order.
    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    /// Nodes reserved by an exclusive strategy but not handed out.
    pub fn extra(&self) -> &[NodeId] {
        &self.extra
    }

    /// Number of usable nodes.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Every node this set holds BUSY.
    pub fn reserved(&self) -> impl Iterator<Item = &NodeId> {
        self.selected.iter().chain(self.extra.iter())
    }

    pub fn contains(&self, node: &str) -> bool {
        self.reserved().any(|n| n == node)
    }
}
