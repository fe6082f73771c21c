//! gridalloc-allocator: the public allocation entry point.
//!
//! Owns the cluster `Topology` behind a single mutex and serializes every
//! state change through it:
//!
//! - `allocate` runs a placement strategy and marks the selected and extra
//!   nodes BUSY in one critical section
//! - `release` returns a `NodeSet` to the FREE pool, skipping nodes that
//!   another allocation has taken since
//! - node-source and health collaborators register, deregister and mark
//!   nodes through the same lock
//!
//! # Architecture
//!
//! ```text
//! Allocator
//!   ├── Mutex<Pool>
//!   │   ├── Topology (hosts, node states, distances)
//!   │   └── owners (BUSY node → AllocationId)
//!   ├── StrategyDefaults (local host pivot, multi-host fallback)
//!   └── allocate(request)
//!       ├── validate (no lock)
//!       ├── pivot hosts registered?
//!       ├── NodeFilter (predicates + exclusions)
//!       ├── PlacementStrategy::select
//!       └── FREE → BUSY for selected ∪ extra, owned by a fresh id
//! ```

pub mod allocator;
pub mod error;
pub mod node_set;
pub mod request;

pub use allocator::Allocator;
pub use error::{AllocError, AllocResult};
pub use node_set::{AllocationId, NodeSet};
pub use request::AllocationRequest;
