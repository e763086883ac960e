//! # Mesh Wire Messages
//!
//! One closed request enum and one closed response enum cover every RPC a
//! node accepts. Each subsystem's own enums are adjacently tagged, so the
//! untagged wrappers below serialize to exactly the subsystem shape:
//!
//! ```text
//! {"method": "RequestVote", "params": {...}}   → {"method": "RequestVote", "result": {...}}
//! {"method": "Ping",        "params": {...}}   → {"method": "Pong",        "result": {...}}
//! {"method": "BanProof",    "params": {...}}   → {"method": "BanAck",      "result": {...}}
//! ```
//!
//! A peer refused by the admission gate receives `Rejected` instead of the
//! subsystem's answer.

use mesh_01_gossip::{GossipRequest, GossipResponse};
use mesh_02_consensus::{RaftRequest, RaftResponse};
use mesh_05_trust::BanProof;
use serde::{Deserialize, Serialize};

/// Governance pushes between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum GovernanceRequest {
    BanProof(BanProof),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "result")]
pub enum GovernanceResponse {
    BanAck {
        accepted: bool,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Refused at the transport boundary before reaching any subsystem.
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshRequest {
    Raft(RaftRequest),
    Gossip(GossipRequest),
    Governance(GovernanceRequest),
}

impl MeshRequest {
    /// Method name as it appears on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            MeshRequest::Raft(request) => request.method(),
            MeshRequest::Gossip(request) => request.method(),
            MeshRequest::Governance(GovernanceRequest::BanProof(_)) => "BanProof",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshResponse {
    Raft(RaftResponse),
    Gossip(GossipResponse),
    Governance(GovernanceResponse),
}

impl MeshResponse {
    pub fn rejected(reason: impl Into<String>) -> Self {
        MeshResponse::Governance(GovernanceResponse::Rejected {
            reason: reason.into(),
        })
    }

    /// Subsystem the response belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshResponse::Raft(_) => "raft",
            MeshResponse::Gossip(_) => "gossip",
            MeshResponse::Governance(_) => "governance",
        }
    }
}
