//! Driving ports (Inbound API)

use crate::domain::{ConsensusResult, ConsensusStatus};
use async_trait::async_trait;
use shared_types::NodeId;

/// Primary Consensus API
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// Append a command to the replicated log.
    ///
    /// Only the leader accepts proposals. Returns the assigned log index, or
    /// `NotLeader` carrying the last known leader for the caller to retry.
    async fn propose(&self, command: serde_json::Value) -> ConsensusResult<u64>;

    /// Snapshot of the engine's current state.
    fn status(&self) -> ConsensusStatus;

    fn is_leader(&self) -> bool;

    fn leader_id(&self) -> Option<NodeId>;
}
