//! Persisted form of the registry.

use super::ban::BanProof;
use super::level::TrustLevel;
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, PublicKey, Timestamp};
use std::collections::{BTreeMap, BTreeSet};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub version: u32,
    pub saved_at: Timestamp,
    #[serde(default)]
    pub trust_levels: BTreeMap<NodeId, TrustLevel>,
    #[serde(default)]
    pub node_names: BTreeMap<NodeId, String>,
    #[serde(default)]
    pub identities: BTreeMap<NodeId, PublicKey>,
    /// Ban per target, revoked bans removed.
    #[serde(default)]
    pub bans: BTreeMap<NodeId, BanProof>,
    #[serde(default)]
    pub processed_ban_ids: BTreeSet<ContentHash>,
    #[serde(default)]
    pub processed_evidence: BTreeSet<ContentHash>,
}
