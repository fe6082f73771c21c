//! gridalloc-topology: the cluster inventory seen by the allocator.
//!
//! Holds hosts in registration order, the nodes of each host with their
//! FREE/BUSY/DOWN state, and a symmetric host-to-host distance table.
//!
//! # Ordering
//!
//! Registration order is significant: hosts are iterated in the order they
//! were registered and each host's nodes in the order they were added.
//! Every placement strategy breaks ties on this order, so it must stay
//! stable across deregistrations.

pub mod error;
pub mod snapshot;
pub mod topology;

pub use error::{TopologyError, TopologyResult};
pub use snapshot::{DistanceSnapshot, HostSnapshot, NodeSnapshot, TopologySnapshot};
pub use topology::{Host, Node, Topology};
