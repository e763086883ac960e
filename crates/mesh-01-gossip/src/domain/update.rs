//! Items carried by GOSSIP messages.

use serde::{Deserialize, Serialize};
use shared_types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Alive,
    Suspect,
    Dead,
    Left,
}

/// One membership assertion about `peer_id` at `incarnation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpdate {
    pub kind: UpdateKind,
    pub peer_id: NodeId,
    pub incarnation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl MembershipUpdate {
    pub fn alive(peer_id: NodeId, incarnation: u64, address: Option<String>) -> Self {
        Self {
            kind: UpdateKind::Alive,
            peer_id,
            incarnation,
            address,
        }
    }

    pub fn suspect(peer_id: NodeId, incarnation: u64) -> Self {
        Self::bare(UpdateKind::Suspect, peer_id, incarnation)
    }

    pub fn dead(peer_id: NodeId, incarnation: u64) -> Self {
        Self::bare(UpdateKind::Dead, peer_id, incarnation)
    }

    pub fn left(peer_id: NodeId, incarnation: u64) -> Self {
        Self::bare(UpdateKind::Left, peer_id, incarnation)
    }

    fn bare(kind: UpdateKind, peer_id: NodeId, incarnation: u64) -> Self {
        Self {
            kind,
            peer_id,
            incarnation,
            address: None,
        }
    }

    /// Whether this update claims the peer is unhealthy.
    pub fn is_accusation(&self) -> bool {
        matches!(self.kind, UpdateKind::Suspect | UpdateKind::Dead)
    }
}

/// Opaque application payload spread epidemically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rumor {
    pub id: String,
    pub topic: String,
    pub payload: serde_json::Value,
}

impl Rumor {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            payload,
        }
    }

    /// Rumor with a random id, for payloads that carry no natural key.
    pub fn with_random_id(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), topic, payload)
    }
}
