//! Error types for topology registration.

use thiserror::Error;

/// Result type alias for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors reported to the node-source and health collaborators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("host already registered: {0}")]
    DuplicateHost(String),

    #[error("node already registered: {0}")]
    DuplicateNode(String),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),
}
