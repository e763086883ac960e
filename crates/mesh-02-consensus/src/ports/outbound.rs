//! Driven ports (Outbound dependencies)

use crate::domain::{LogEntry, PersistentState, StoreError};
use shared_types::NodeId;

/// Durable storage for term, vote and log.
///
/// `save` must not return before the state is on stable storage; the engine
/// replies to peers only after it returns `Ok`.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistentState>, StoreError>;

    fn save(&self, state: &PersistentState) -> Result<(), StoreError>;
}

/// State machine receiving committed entries.
///
/// Invoked under the engine lock, strictly in index order, once per entry.
/// Implementations must not call back into the engine.
pub trait CommitHandler: Send + Sync {
    fn apply(&self, entry: &LogEntry);
}

/// Live-membership view, supplied by the gossip layer.
pub trait MembershipView: Send + Sync {
    fn is_live(&self, peer: &NodeId) -> bool;
}
