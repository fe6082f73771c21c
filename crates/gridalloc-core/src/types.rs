//! Shared types used across gridalloc crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a host (machine) in the cluster.
pub type HostId = String;

/// Opaque node handle, usually a URL such as `node://host/0`.
pub type NodeId = String;

/// Allocation state of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Available for allocation.
    Free,
    /// Handed out by an allocation (selected or extra).
    Busy,
    /// Marked unreachable by the health collaborator. Never selected.
    Down,
}

impl NodeState {
    pub fn label(&self) -> &'static str {
        match self {
            NodeState::Free => "FREE",
            NodeState::Busy => "BUSY",
            NodeState::Down => "DOWN",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the multi-host exclusive strategy does when no subset of whole
/// hosts adds up to exactly the requested node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubsetFallback {
    /// Take the subset with the largest total not exceeding the request.
    #[default]
    LargestBelow,
    /// Take nothing.
    ExactOnly,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown subset fallback: {0} (expected `largest-below` or `exact-only`)")]
pub struct UnknownFallback(pub String);

impl FromStr for SubsetFallback {
    type Err = UnknownFallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "largest-below" => Ok(SubsetFallback::LargestBelow),
            "exact-only" => Ok(SubsetFallback::ExactOnly),
            other => Err(UnknownFallback(other.to_string())),
        }
    }
}

impl fmt::Display for SubsetFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubsetFallback::LargestBelow => f.write_str("largest-below"),
            SubsetFallback::ExactOnly => f.write_str("exact-only"),
        }
    }
}
