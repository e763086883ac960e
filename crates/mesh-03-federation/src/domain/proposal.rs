//! Policy proposals and their votes.

use super::config::PolicyChanges;
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, Timestamp};
use std::collections::BTreeSet;
use std::fmt;

/// What a proposal touches. All kinds pass at the policy quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyUpdateType {
    ParameterChange,
    AdmissionRule,
    SlashingRule,
    Constitutional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Passed,
    Rejected,
    Expired,
}

impl ProposalStatus {
    pub fn is_open(&self) -> bool {
        *self == ProposalStatus::Pending
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProposalStatus::Pending => "PENDING",
            ProposalStatus::Passed => "PASSED",
            ProposalStatus::Rejected => "REJECTED",
            ProposalStatus::Expired => "EXPIRED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyProposal {
    pub proposal_id: String,
    pub proposer: NodeId,
    pub update_type: PolicyUpdateType,
    pub changes: PolicyChanges,
    pub votes_for: BTreeSet<NodeId>,
    pub votes_against: BTreeSet<NodeId>,
    pub status: ProposalStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl PolicyProposal {
    /// Record a vote. A voter appears in at most one set.
    pub fn record_vote(&mut self, voter: &NodeId, approve: bool) {
        if approve {
            self.votes_against.remove(voter);
            self.votes_for.insert(voter.clone());
        } else {
            self.votes_for.remove(voter);
            self.votes_against.insert(voter.clone());
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Tally after a proposal is created or voted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub proposal_id: String,
    pub status: ProposalStatus,
    pub votes_for: usize,
    pub votes_against: usize,
    /// Votes needed to pass at the time of the tally.
    pub required: usize,
    /// Config version after the tally; bumped when the proposal passed.
    pub config_version: u64,
}

/// Audit entry for an applied proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdateRecord {
    pub proposal_id: String,
    pub update_type: PolicyUpdateType,
    pub changes: PolicyChanges,
    pub new_version: u64,
    pub config_hash: ContentHash,
    pub applied_at: Timestamp,
}
