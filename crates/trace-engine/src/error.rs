use thiserror::Error;

use crate::graph::NodeId;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Which search bound a call ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Number of pending search nodes
    Frontier,
    /// Number of recorded trace steps
    TraceSteps,
    /// Node ids carried by frontier snapshots and paths
    TraceEntries,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Frontier => f.write_str("frontier size"),
            Resource::TraceSteps => f.write_str("trace length"),
            Resource::TraceEntries => f.write_str("recorded node ids"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid puzzle: {reason}")]
    InvalidPuzzle { reason: String },
    #[error("invalid graph: {reason}")]
    InvalidGraph { reason: String },
    #[error("unknown node `{0}`")]
    UnknownNode(NodeId),
    #[error("{resource} exceeded the configured limit of {limit}")]
    ResourceExhausted { resource: Resource, limit: usize },
    #[error("invalid trace at step {index}: {reason}")]
    InvalidTrace { index: usize, reason: String },
}

impl EngineError {
    pub(crate) fn invalid_puzzle(reason: impl Into<String>) -> Self {
        EngineError::InvalidPuzzle {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_graph(reason: impl Into<String>) -> Self {
        EngineError::InvalidGraph {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_trace(index: usize, reason: impl Into<String>) -> Self {
        EngineError::InvalidTrace {
            index,
            reason: reason.into(),
        }
    }

    /// Whether retrying with relaxed bounds could succeed.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, EngineError::ResourceExhausted { .. })
    }
}
