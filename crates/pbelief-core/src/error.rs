use crate::topology::NodeId;

/// Errors the engine can raise. Every variant is fatal at the point it's raised --
/// the engine never recovers from a bad input or a broken invariant, it reports
/// and stops (spec §7).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PdagError {
    #[error("graph must be a DAG: cycle detected (node {0} never reaches in-degree zero)")]
    Cycle(NodeId),

    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    #[error("edge references unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} has no prior")]
    MissingPrior(NodeId),

    #[error("edge ({0}, {1}) has no probability")]
    MissingEdgeProbability(NodeId, NodeId),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("outgoing/incoming index disagree at node {0}")]
    InconsistentIndex(NodeId),

    #[error("parent belief for node {0} read before it was written")]
    PropagationOrder(NodeId),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type PdagResult<T> = Result<T, PdagError>;
