//! Error types for the consensus engine

use shared_types::NodeId;

/// Failure of the durable state store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt state record: {0}")]
    Corrupt(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// Consensus error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("Not leader. Current leader: {}", .leader.as_ref().map(NodeId::as_str).unwrap_or("unknown"))]
    NotLeader { leader: Option<NodeId> },

    #[error("Failed to persist consensus state: {0}")]
    Persistence(StoreError),

    #[error("Consensus engine halted after a persistence failure")]
    Halted,

    #[error("Invalid consensus configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
