//! Topology descriptors: which placement strategy a request asks for.
//!
//! The text form is what the CLI and configuration files use:
//!
//! ```text
//! arbitrary
//! best-proximity
//! threshold-proximity:<max-distance>
//! single-host
//! single-host-exclusive
//! multiple-hosts-exclusive[:largest-below|:exact-only]
//! different-hosts-exclusive
//! ```

use std::fmt;
use std::str::FromStr;

use gridalloc_core::{HostId, SubsetFallback, UnknownFallback};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placement strategy requested for an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TopologyDescriptor {
    /// First eligible free nodes in topology order.
    Arbitrary,
    /// Nodes on the hosts nearest to the pivot first.
    BestProximity {
        /// Pivot hosts; defaults to the allocator's local host.
        #[serde(default)]
        pivot: Option<Vec<HostId>>,
    },
    /// Like `BestProximity`, but never beyond `max_distance` from the pivot.
    ThresholdProximity {
        max_distance: u64,
        #[serde(default)]
        pivot: Option<Vec<HostId>>,
    },
    /// All nodes on one host, best fit.
    SingleHost,
    /// All nodes on one host; the rest of that host is reserved as well.
    SingleHostExclusive,
    /// Whole hosts whose free nodes add up to the request.
    MultipleHostsExclusive {
        /// Overrides the configured fallback for inexact requests.
        #[serde(default)]
        fallback: Option<SubsetFallback>,
    },
    /// One node per host; each touched host is reserved entirely.
    DifferentHostsExclusive,
}

/// Errors raised while parsing a descriptor from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("unknown placement strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid threshold distance `{0}`: expected a non-negative integer")]
    InvalidThreshold(String),

    #[error("strategy `{0}` requires a parameter")]
    MissingParameter(String),

    #[error("strategy `{0}` takes no parameter")]
    UnexpectedParameter(String),

    #[error(transparent)]
    Fallback(#[from] UnknownFallback),
}

impl TopologyDescriptor {
    pub fn best_proximity() -> Self {
        TopologyDescriptor::BestProximity { pivot: None }
    }

    pub fn threshold_proximity(max_distance: u64) -> Self {
        TopologyDescriptor::ThresholdProximity {
            max_distance,
            pivot: None,
        }
    }

    pub fn multiple_hosts_exclusive() -> Self {
        TopologyDescriptor::MultipleHostsExclusive { fallback: None }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TopologyDescriptor::Arbitrary => "arbitrary",
            TopologyDescriptor::BestProximity { .. } => "best-proximity",
            TopologyDescriptor::ThresholdProximity { .. } => "threshold-proximity",
            TopologyDescriptor::SingleHost => "single-host",
            TopologyDescriptor::SingleHostExclusive => "single-host-exclusive",
            TopologyDescriptor::MultipleHostsExclusive { .. } => "multiple-hosts-exclusive",
            TopologyDescriptor::DifferentHostsExclusive => "different-hosts-exclusive",
        }
    }

    /// Whether the strategy needs host/distance information at all.
    pub fn is_topology_aware(&self) -> bool {
        !matches!(self, TopologyDescriptor::Arbitrary)
    }

    /// Whether the strategy may reserve nodes it does not hand out.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            TopologyDescriptor::SingleHostExclusive
                | TopologyDescriptor::MultipleHostsExclusive { .. }
                | TopologyDescriptor::DifferentHostsExclusive
        )
    }
}

impl FromStr for TopologyDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, param) = match s.trim().split_once(':') {
            Some((name, param)) => (name, Some(param.trim())),
            None => (s.trim(), None),
        };

        let no_param = |descriptor: TopologyDescriptor| match param {
            Some(_) => Err(DescriptorError::UnexpectedParameter(name.to_string())),
            None => Ok(descriptor),
        };

        match name {
            "arbitrary" => no_param(TopologyDescriptor::Arbitrary),
            "best-proximity" => no_param(TopologyDescriptor::best_proximity()),
            "single-host" => no_param(TopologyDescriptor::SingleHost),
            "single-host-exclusive" => no_param(TopologyDescriptor::SingleHostExclusive),
            "different-hosts-exclusive" => no_param(TopologyDescriptor::DifferentHostsExclusive),
            "threshold-proximity" => {
                let raw = param.ok_or_else(|| DescriptorError::MissingParameter(name.to_string()))?;
                let max_distance = raw
                    .parse::<u64>()
                    .map_err(|_| DescriptorError::InvalidThreshold(raw.to_string()))?;
                Ok(TopologyDescriptor::threshold_proximity(max_distance))
            }
            "multiple-hosts-exclusive" => {
                let fallback = param.map(str::parse::<SubsetFallback>).transpose()?;
                Ok(TopologyDescriptor::MultipleHostsExclusive { fallback })
            }
            other => Err(DescriptorError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for TopologyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyDescriptor::ThresholdProximity { max_distance, .. } => {
                write!(f, "{}:{max_distance}", self.name())
            }
            TopologyDescriptor::MultipleHostsExclusive {
                fallback: Some(fallback),
            } => write!(f, "{}:{fallback}", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}
