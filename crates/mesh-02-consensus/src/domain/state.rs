//! Node roles, durable state and status snapshots.

use super::log::RaftLog;
use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Follower => "FOLLOWER",
            Role::Candidate => "CANDIDATE",
            Role::Leader => "LEADER",
        };
        f.write_str(name)
    }
}

/// State that must survive a crash. Rewritten atomically on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    pub current_term: u64,
    pub voted_for: Option<NodeId>,
    pub log: RaftLog,
}

/// Majority of a cluster of `cluster_size` voters.
pub fn quorum_size(cluster_size: usize) -> usize {
    cluster_size / 2 + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusStatus {
    pub node_id: NodeId,
    pub role: Role,
    pub term: u64,
    pub leader: Option<NodeId>,
    pub voted_for: Option<NodeId>,
    pub commit_index: u64,
    pub last_applied: u64,
    pub log_length: u64,
    pub cluster_size: usize,
    pub quorum_size: usize,
    pub halted: bool,
    /// Voters (self included) the membership view reports alive, if wired.
    pub live_voters: Option<usize>,
}

impl ConsensusStatus {
    /// Whether enough voters are alive to make progress. Unknown counts as yes.
    pub fn has_live_quorum(&self) -> bool {
        self.live_voters.map_or(true, |live| live >= self.quorum_size)
    }
}
