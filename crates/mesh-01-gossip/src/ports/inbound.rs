//! Driving ports (Inbound API)

use crate::domain::{Member, Rumor};
use async_trait::async_trait;
use shared_types::NodeId;

/// Primary Gossip API
#[async_trait]
pub trait GossipApi: Send + Sync {
    /// Spread a rumor to the mesh now. Returns the number of recipients of
    /// the first round.
    async fn broadcast_rumor(&self, rumor: Rumor) -> usize;

    fn members(&self) -> Vec<Member>;

    fn is_alive(&self, peer: &NodeId) -> bool;

    /// Digest of the ALIVE set, for cross-node consistency checks.
    fn membership_hash(&self) -> String;
}
