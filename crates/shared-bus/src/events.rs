//! # Mesh Events
//!
//! Facts published by a node's subsystems. Payloads use plain strings for
//! roles and statuses so this crate stays a leaf.

use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId};

/// Everything a subsystem can announce on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeshEvent {
    // Membership
    PeerJoined { peer: NodeId, address: String },
    PeerSuspected { peer: NodeId, incarnation: u64 },
    PeerFailed { peer: NodeId, incarnation: u64 },
    PeerRecovered { peer: NodeId, incarnation: u64 },
    PeerLeft { peer: NodeId },

    // Consensus
    RoleChanged { node: NodeId, role: String, term: u64 },
    EntryCommitted { node: NodeId, index: u64, term: u64 },
    ConsensusHalted { node: NodeId, reason: String },

    // Governance
    NodeAdmitted { node: NodeId, stake: u64 },
    NodeStatusChanged { node: NodeId, status: String, reason: String },
    PolicyUpdated { version: u64, proposal_id: String },
    NodeSlashed {
        accused: NodeId,
        violation: String,
        action: String,
        stake_slashed: u64,
        evidence_hash: ContentHash,
        verdict_hash: ContentHash,
    },

    // Trust
    BanApplied { target: NodeId, ban_id: ContentHash, issuer: NodeId },
    BanRevoked { target: NodeId, revoked_by: NodeId },
}

impl MeshEvent {
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            MeshEvent::PeerJoined { .. }
            | MeshEvent::PeerSuspected { .. }
            | MeshEvent::PeerFailed { .. }
            | MeshEvent::PeerRecovered { .. }
            | MeshEvent::PeerLeft { .. } => EventTopic::Membership,
            MeshEvent::RoleChanged { .. }
            | MeshEvent::EntryCommitted { .. }
            | MeshEvent::ConsensusHalted { .. } => EventTopic::Consensus,
            MeshEvent::NodeAdmitted { .. }
            | MeshEvent::NodeStatusChanged { .. }
            | MeshEvent::PolicyUpdated { .. }
            | MeshEvent::NodeSlashed { .. } => EventTopic::Governance,
            MeshEvent::BanApplied { .. } | MeshEvent::BanRevoked { .. } => EventTopic::Trust,
        }
    }
}

/// Coarse event categories for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Membership,
    Consensus,
    Governance,
    Trust,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn matches(&self, event: &MeshEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
