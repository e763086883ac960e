//! Error types for the gossip layer

use shared_types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GossipError {
    #[error("Invalid gossip configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown peer: {0}")]
    UnknownPeer(NodeId),

    #[error("Node has left the mesh")]
    Left,
}

pub type GossipResult<T> = Result<T, GossipError>;
