//! # Node Configuration
//!
//! One TOML file per node. Every section is optional and falls back to the
//! subsystem defaults:
//!
//! ```toml
//! [node]
//! id = "node-1"
//! address = "10.0.0.1:7000"
//! data_dir = "/var/lib/mesh/node-1"
//! stake = 20000
//!
//! [[node.peers]]
//! id = "node-2"
//! address = "10.0.0.2:7000"
//! public_key = "d75a98..."
//! stake = 20000
//!
//! [consensus]
//! tick_interval_ms = 50
//!
//! [gossip]
//! protocol_period_ms = 1000
//!
//! [federation]
//! min_stake = 10000
//!
//! [slashing]
//! min_downtime_secs = 3600
//!
//! [trust]
//! admins = ["node-1", "node-2"]
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `MESH_NODE_ID` | `node.id` |
//! | `MESH_ADDRESS` | `node.address` |
//! | `MESH_DATA_DIR` | `node.data_dir` |
//! | `MESH_PEERS` | `node.peers`, as `id@host:port,id@host:port` |

use mesh_01_gossip::GossipConfig;
use mesh_02_consensus::ConsensusConfig;
use mesh_03_federation::{validate_endpoint, PolicyConfig};
use mesh_04_slashing::SlashingConfig;
use mesh_05_trust::TrustConfig;
use serde::{Deserialize, Serialize};
use shared_types::{NodeId, PublicKey};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub consensus: ConsensusConfig,
    pub gossip: GossipConfig,
    pub federation: PolicyConfig,
    pub slashing: SlashingConfig,
    pub trust: TrustConfig,
}

/// Identity, storage and bootstrap peers of the local node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub id: String,
    /// `host:port` other nodes reach this one at.
    pub address: String,
    /// Durable state lives here; without it the node keeps everything in
    /// memory.
    pub data_dir: Option<PathBuf>,
    /// Hex-encoded 32-byte Ed25519 seed. A fresh key is generated if unset.
    pub identity_seed: Option<String>,
    /// Stake this node commits; the node admits itself to its federation
    /// view at boot when set.
    pub stake: Option<u64>,
    pub health_interval_ms: u64,
    pub peers: Vec<PeerEntry>,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: String::new(),
            address: "127.0.0.1:7000".to_string(),
            data_dir: None,
            identity_seed: None,
            stake: None,
            health_interval_ms: 5_000,
            peers: Vec::new(),
        }
    }
}

/// A bootstrap peer. With a key its ban proofs can be verified; with a stake
/// it is admitted as a founding federation member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    pub id: NodeId,
    pub address: String,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
    #[serde(default)]
    pub stake: Option<u64>,
}

impl PeerEntry {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: NodeId::from(id.into().as_str()),
            address: address.into(),
            public_key: None,
            stake: None,
        }
    }
}

impl NodeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read `path` (defaults when `None`), apply environment overrides and
    /// validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MESH_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(id) = lookup("MESH_NODE_ID") {
            self.node.id = id;
        }
        if let Some(address) = lookup("MESH_ADDRESS") {
            self.node.address = address;
        }
        if let Some(dir) = lookup("MESH_DATA_DIR") {
            self.node.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(peers) = lookup("MESH_PEERS") {
            self.node.peers = self.merge_peers(&peers)?;
        }
        Ok(())
    }

    /// Peers listed in `raw` replace the configured set; keys and stakes of
    /// peers already configured under the same id are kept.
    fn merge_peers(&self, raw: &str) -> Result<Vec<PeerEntry>, ConfigError> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (id, address) = entry.split_once('@').ok_or_else(|| {
                    ConfigError::Invalid(format!("peer '{entry}' is not of the form id@host:port"))
                })?;
                let mut peer = self
                    .node
                    .peers
                    .iter()
                    .find(|p| p.id.as_str() == id)
                    .cloned()
                    .unwrap_or_else(|| PeerEntry::new(id, address));
                peer.address = address.to_string();
                Ok(peer)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.node.id.trim().is_empty() {
            return invalid("node.id must not be empty".into());
        }
        if validate_endpoint(&self.node.address).is_err() {
            return invalid(format!(
                "node.address '{}' is not host:port",
                self.node.address
            ));
        }

        let me = self.node_id();
        let mut seen = HashSet::new();
        for peer in &self.node.peers {
            if peer.id == me {
                return invalid(format!("node {me} lists itself as a peer"));
            }
            if !seen.insert(&peer.id) {
                return invalid(format!("peer {} listed twice", peer.id));
            }
            if validate_endpoint(&peer.address).is_err() {
                return invalid(format!(
                    "peer {} address '{}' is not host:port",
                    peer.id, peer.address
                ));
            }
        }

        if self.node.health_interval_ms == 0 {
            return invalid("node.health_interval_ms must be positive".into());
        }
        self.identity_seed()?;

        self.consensus
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.gossip
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.federation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.trust.min_quorum == 0 || self.trust.default_quorum < self.trust.min_quorum {
            return invalid(format!(
                "trust.default_quorum {} must be at least trust.min_quorum {} (itself positive)",
                self.trust.default_quorum, self.trust.min_quorum
            ));
        }
        Ok(())
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::from(self.node.id.trim())
    }

    pub fn peer_ids(&self) -> Vec<NodeId> {
        self.node.peers.iter().map(|p| p.id.clone()).collect()
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.node.health_interval_ms)
    }

    /// Decoded `node.identity_seed`.
    pub fn identity_seed(&self) -> Result<Option<[u8; 32]>, ConfigError> {
        let Some(raw) = &self.node.identity_seed else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim())
            .map_err(|e| ConfigError::Invalid(format!("node.identity_seed: {e}")))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            ConfigError::Invalid("node.identity_seed must be 32 bytes (64 hex chars)".into())
        })?;
        Ok(Some(seed))
    }
}
