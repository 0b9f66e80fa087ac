//! Render graph error types.

use crate::graph::id::NodeId;
use thiserror::Error;

/// Errors raised by graph topology, parameter and persistence operations.
///
/// Every failing operation leaves the graph unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Connecting {producer} -> {consumer} would create a cycle")]
    Cycle { producer: NodeId, consumer: NodeId },

    #[error("Slot {slot} out of range for {consumer} ({slots} input slots)")]
    SlotOutOfRange {
        consumer: NodeId,
        slot: usize,
        slots: usize,
    },

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("{0} is an output sink and cannot feed other nodes")]
    NotAProducer(NodeId),

    #[error("{node} has no parameter '{key}'")]
    UnknownParameter { node: NodeId, key: String },

    #[error("Invalid value for {node} parameter '{key}': {reason}")]
    InvalidParameter {
        node: NodeId,
        key: String,
        reason: String,
    },

    #[error("Failed to decode node: {0}")]
    Decode(String),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
