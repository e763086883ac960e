//! Trust registry configuration

use super::ban::DEFAULT_FEDERATION_ID;
use serde::{Deserialize, Serialize};
use shared_types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Seeded at FOUNDER. A node listed here and in `admins` is a founder.
    pub founders: Vec<NodeId>,
    /// Seeded at ADMIN.
    pub admins: Vec<NodeId>,
    pub federation_id: String,
    /// Signers required for a quorum ban when the caller does not say.
    pub default_quorum: u32,
    /// Smallest `required_quorum` this node issues or accepts. A proof that
    /// declares fewer signers is refused whatever its signatures say.
    pub min_quorum: u32,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            founders: Vec::new(),
            admins: Vec::new(),
            federation_id: DEFAULT_FEDERATION_ID.to_string(),
            default_quorum: 3,
            min_quorum: 2,
        }
    }
}
