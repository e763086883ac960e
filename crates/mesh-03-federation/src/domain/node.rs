//! Federation's record of each member.

use super::contract::PeeringContract;
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, PublicKey, Timestamp};
use std::fmt;

/// Standing of a node within the federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Application submitted, not yet admitted
    Pending,
    /// Full member in good standing
    Active,
    /// Under observation after violations
    Probation,
    /// Leaving voluntarily, stake locked
    Unbonding,
    /// Punished, stake reduced
    Slashed,
    /// Permanently expelled
    Banned,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 6] = [
        NodeStatus::Pending,
        NodeStatus::Active,
        NodeStatus::Probation,
        NodeStatus::Unbonding,
        NodeStatus::Slashed,
        NodeStatus::Banned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "PENDING",
            NodeStatus::Active => "ACTIVE",
            NodeStatus::Probation => "PROBATION",
            NodeStatus::Unbonding => "UNBONDING",
            NodeStatus::Slashed => "SLASHED",
            NodeStatus::Banned => "BANNED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Banned)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub public_key: PublicKey,
    pub endpoint: String,
    pub organization: String,
    pub region: String,

    pub status: NodeStatus,
    pub status_reason: String,
    pub stake_amount: u64,
    /// Total stake removed by slashing verdicts.
    pub stake_slashed: u64,

    pub uptime_percent: f64,
    pub blocks_produced: u64,
    pub blocks_missed: u64,

    pub admitted_at: Timestamp,
    pub last_seen: Timestamp,
    pub unbonding_started: Option<Timestamp>,

    pub warnings: u32,
    /// Verdict hashes of every slashing applied to this node.
    pub slashing_events: Vec<ContentHash>,
}

impl NodeRecord {
    /// ACTIVE record for an accepted contract.
    pub fn admitted(contract: &PeeringContract, now: Timestamp) -> Self {
        Self {
            node_id: contract.node_id.clone(),
            public_key: contract.public_key.clone(),
            endpoint: contract.endpoint.clone(),
            organization: contract.organization.clone(),
            region: contract.region.clone(),
            status: NodeStatus::Active,
            status_reason: "Admitted via valid peering contract".into(),
            stake_amount: contract.stake_amount,
            stake_slashed: 0,
            uptime_percent: 100.0,
            blocks_produced: 0,
            blocks_missed: 0,
            admitted_at: now,
            last_seen: now,
            unbonding_started: None,
            warnings: 0,
            slashing_events: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    pub fn is_banned(&self) -> bool {
        self.status == NodeStatus::Banned
    }
}
