//! gridalloc-placement: topology-aware node selection.
//!
//! This crate decides WHICH nodes an allocation gets. It never changes
//! node state; the allocator applies the returned selection under its
//! lock.
//!
//! # Components
//!
//! - **`descriptor`**: The seven strategy descriptors and their text form
//! - **`filter`**: Eligibility predicates and exclusion sets
//! - **`strategy`**: The `PlacementStrategy` trait and descriptor dispatch
//! - **`strategies`**: One implementation per descriptor
//! - **`subset`**: Subset-sum over host capacities

pub mod descriptor;
pub mod filter;
pub mod strategies;
pub mod strategy;
pub mod subset;

pub use descriptor::{DescriptorError, TopologyDescriptor};
pub use filter::{EligibilityPredicate, EvaluationError, MatchTable, NodeFilter, Predicate};
pub use strategy::{HostCandidates, PlacementStrategy, Selection, StrategyDefaults, eligible_hosts, strategy_for};
