//! Driven ports (Outbound dependencies)

use crate::domain::Rumor;
use shared_types::NodeId;

/// Consumer of rumors on one topic.
///
/// Called under no gossip lock. Returning `true` accepts the rumor, which
/// makes this node re-disseminate it; `false` stops it here.
pub trait RumorHandler: Send + Sync {
    fn topic(&self) -> &str;

    fn on_rumor(&self, from: &NodeId, rumor: &Rumor) -> bool;
}
