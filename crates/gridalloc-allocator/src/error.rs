//! Allocator error types.
//!
//! Capacity shortfalls are not errors: they show up as a smaller
//! `NodeSet`. Only malformed requests and collaborator mistakes surface
//! here.

use gridalloc_placement::DescriptorError;
use gridalloc_topology::TopologyError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    /// Rejected before any node changed state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
}

impl From<DescriptorError> for AllocError {
    fn from(e: DescriptorError) -> Self {
        AllocError::InvalidRequest(e.to_string())
    }
}

pub type AllocResult<T> = Result<T, AllocError>;
