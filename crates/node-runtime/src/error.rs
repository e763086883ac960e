//! Node assembly errors.

use crate::config::ConfigError;
use mesh_01_gossip::GossipError;
use mesh_02_consensus::ConsensusError;
use mesh_03_federation::PolicyError;
use mesh_05_trust::TrustError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to prepare data directory {}: {source}", path.display())]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("consensus: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("gossip: {0}")]
    Gossip(#[from] GossipError),

    #[error("federation: {0}")]
    Federation(#[from] PolicyError),

    #[error("trust registry: {0}")]
    Trust(#[from] TrustError),
}

pub type NodeResult<T> = Result<T, NodeError>;
