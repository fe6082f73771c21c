//! Eligibility filtering.
//!
//! Predicates never run scripts: they look up results that an external
//! selection-script engine already computed. A failed evaluation counts as
//! "does not match".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use gridalloc_core::NodeId;
use gridalloc_topology::Node;
use thiserror::Error;
use tracing::debug;

/// A precomputed evaluation that failed upstream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("eligibility evaluation failed: {0}")]
pub struct EvaluationError(pub String);

/// Per-node eligibility check supplied with a request.
pub trait EligibilityPredicate: Send + Sync {
    fn evaluate(&self, node: &Node) -> Result<bool, EvaluationError>;
}

impl<F> EligibilityPredicate for F
where
    F: Fn(&Node) -> bool + Send + Sync,
{
    fn evaluate(&self, node: &Node) -> Result<bool, EvaluationError> {
        Ok(self(node))
    }
}

/// Shared handle to a predicate, as carried by allocation requests.
pub type Predicate = Arc<dyn EligibilityPredicate>;

/// Results of an eligibility script evaluated ahead of time, keyed by node.
///
/// Nodes absent from the table were never evaluated and do not match.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    results: HashMap<NodeId, Result<bool, EvaluationError>>,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table where exactly the given nodes match.
    pub fn matching<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let mut table = Self::new();
        for node in nodes {
            table.record(node, Ok(true));
        }
        table
    }

    pub fn record(&mut self, node: impl Into<NodeId>, result: Result<bool, EvaluationError>) {
        self.results.insert(node.into(), result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_predicate(self) -> Predicate {
        Arc::new(self)
    }
}

impl EligibilityPredicate for MatchTable {
    fn evaluate(&self, node: &Node) -> Result<bool, EvaluationError> {
        self.results.get(node.id()).cloned().unwrap_or(Ok(false))
    }
}

/// Narrows candidate nodes for one request.
///
/// A node passes when it is FREE, not excluded, and every predicate
/// evaluates to `true`.
pub struct NodeFilter<'r> {
    predicates: &'r [Predicate],
    excluded: &'r HashSet<NodeId>,
}

impl<'r> NodeFilter<'r> {
    pub fn new(predicates: &'r [Predicate], excluded: &'r HashSet<NodeId>) -> Self {
        Self {
            predicates,
            excluded,
        }
    }

    pub fn accepts(&self, node: &Node) -> bool {
        if !node.is_free() || self.excluded.contains(node.id()) {
            return false;
        }
        self.predicates.iter().all(|p| match p.evaluate(node) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(node = node.id(), error = %e, "treating failed evaluation as no match");
                false
            }
        })
    }

    /// Keep the accepted nodes, preserving input order.
    pub fn apply<'n, I>(&self, nodes: I) -> Vec<&'n Node>
    where
        I: IntoIterator<Item = &'n Node>,
    {
        nodes.into_iter().filter(|n| self.accepts(n)).collect()
    }
}
