//! Driving ports (Inbound API)

use crate::domain::{NodeRecord, NodeStatus, PolicyResult};
use shared_types::{ContentHash, NodeId};

/// Narrow view of the node registry for enforcement code.
///
/// The slashing engine punishes through this trait and never sees proposals
/// or policy parameters.
pub trait NodeRegistry: Send + Sync {
    fn get_node(&self, node: &NodeId) -> Option<NodeRecord>;

    fn update_status(&self, node: &NodeId, status: NodeStatus, reason: &str) -> PolicyResult<()>;

    fn ban_node(&self, node: &NodeId, reason: &str) -> PolicyResult<()>;

    /// Returns the node's warning count after this warning.
    fn warn_node(&self, node: &NodeId, reason: &str) -> PolicyResult<u32>;

    /// Returns the stake actually removed.
    fn slash_stake(&self, node: &NodeId, amount: u64, verdict_hash: ContentHash)
        -> PolicyResult<u64>;
}
