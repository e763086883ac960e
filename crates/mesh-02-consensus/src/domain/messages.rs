//! Consensus RPC messages.
//!
//! Requests and responses form closed enums so dispatch is an exhaustive
//! `match`. On the wire each request is `{"method": ..., "params": {...}}`.

use super::log::LogEntry;
use serde::{Deserialize, Serialize};
use shared_types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVoteRequest {
    pub term: u64,
    pub candidate_id: NodeId,
    pub last_log_index: u64,
    pub last_log_term: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVoteResponse {
    pub term: u64,
    pub vote_granted: bool,
    pub voter_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendEntriesRequest {
    pub term: u64,
    pub leader_id: NodeId,
    pub prev_log_index: u64,
    pub prev_log_term: u64,
    pub entries: Vec<LogEntry>,
    pub leader_commit: u64,
}

/// `match_index` is the last index known to match the leader on success,
/// and the follower's last log index (a back-off hint) on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEntriesResponse {
    pub term: u64,
    pub success: bool,
    pub follower_id: NodeId,
    pub match_index: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RaftRequest {
    RequestVote(RequestVoteRequest),
    AppendEntries(AppendEntriesRequest),
}

impl RaftRequest {
    /// Method name as it appears on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            RaftRequest::RequestVote(_) => "RequestVote",
            RaftRequest::AppendEntries(_) => "AppendEntries",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "result")]
pub enum RaftResponse {
    RequestVote(RequestVoteResponse),
    AppendEntries(AppendEntriesResponse),
}

/// A request the engine wants delivered to one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: NodeId,
    pub request: RaftRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = RaftRequest::RequestVote(RequestVoteRequest {
            term: 3,
            candidate_id: NodeId::from("n1"),
            last_log_index: 7,
            last_log_term: 2,
        });
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["method"], "RequestVote");
        assert_eq!(json["params"]["candidate_id"], "n1");
        assert_eq!(json["params"]["last_log_index"], 7);
    }
}
