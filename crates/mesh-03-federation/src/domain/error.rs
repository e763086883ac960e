//! Error types for federation governance

use super::node::NodeStatus;
use super::proposal::ProposalStatus;
use shared_types::NodeId;
use std::time::Duration;

/// Federation policy errors.
///
/// `Display` is the human-readable reason handed back to callers; the variant
/// is the machine-readable reason code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("Invalid policy configuration: {0}")]
    InvalidConfig(String),

    #[error("Node ID {0} already exists")]
    DuplicateNode(NodeId),

    #[error("Public key already registered by {existing}")]
    DuplicatePublicKey { existing: NodeId },

    #[error("Insufficient stake: {offered} < {required}")]
    InsufficientStake { offered: u64, required: u64 },

    #[error("Invalid endpoint format: {0:?}")]
    InvalidEndpoint(String),

    #[error("Peering contract signature for {0} does not verify")]
    InvalidSignature(NodeId),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Node {0} is banned")]
    NodeBanned(NodeId),

    #[error("Node {0} already banned")]
    AlreadyBanned(NodeId),

    #[error("Node {node} must be ACTIVE (currently {status})")]
    NotActive { node: NodeId, status: NodeStatus },

    #[error("Node {0} is already unbonding")]
    AlreadyUnbonding(NodeId),

    #[error("Node {0} is not unbonding")]
    NotUnbonding(NodeId),

    #[error("Unbonding for {node} incomplete: {}s remaining", .remaining.as_secs())]
    UnbondingIncomplete { node: NodeId, remaining: Duration },

    #[error("Invalid performance report: {0}")]
    InvalidPerformance(String),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Proposal {0} not found")]
    ProposalNotFound(String),

    #[error("Proposal {id} already {status}")]
    ProposalClosed { id: String, status: ProposalStatus },

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Result type for federation operations
pub type PolicyResult<T> = Result<T, PolicyError>;

impl From<shared_crypto::CryptoError> for PolicyError {
    fn from(err: shared_crypto::CryptoError) -> Self {
        PolicyError::Encoding(err.to_string())
    }
}
