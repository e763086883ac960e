//! Driving ports (Inbound API)

use crate::domain::TrustLevel;
use shared_types::NodeId;

/// Read-only trust decisions for the transport boundary.
pub trait TrustView: Send + Sync {
    fn trust_level(&self, node: &NodeId) -> TrustLevel;

    fn is_banned(&self, node: &NodeId) -> bool {
        self.trust_level(node) == TrustLevel::Banned
    }

    /// UNKNOWN or better.
    fn can_connect(&self, node: &NodeId) -> bool {
        self.trust_level(node) >= TrustLevel::Unknown
    }
}
