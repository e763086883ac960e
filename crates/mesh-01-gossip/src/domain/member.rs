//! Gossip-known peers.

use serde::{Deserialize, Serialize};
use shared_types::{NodeId, Timestamp};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Alive,
    Suspect,
    Dead,
    Left,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemberStatus::Alive => "ALIVE",
            MemberStatus::Suspect => "SUSPECT",
            MemberStatus::Dead => "DEAD",
            MemberStatus::Left => "LEFT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: NodeId,
    pub address: String,
    pub status: MemberStatus,
    /// Version of this member's state. Only ever increases.
    pub incarnation: u64,
    pub last_seen: Timestamp,
    pub status_changed: Timestamp,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Member {
    /// A freshly discovered ALIVE member.
    pub fn new(id: NodeId, address: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            address: address.into(),
            status: MemberStatus::Alive,
            incarnation: 0,
            last_seen: now,
            status_changed: now,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_incarnation(mut self, incarnation: u64) -> Self {
        self.incarnation = incarnation;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_alive(&self) -> bool {
        self.status == MemberStatus::Alive
    }

    pub fn is_suspect(&self) -> bool {
        self.status == MemberStatus::Suspect
    }

    pub fn is_dead(&self) -> bool {
        self.status == MemberStatus::Dead
    }
}
