//! Driven ports (Outbound dependencies)

use crate::domain::{StoreError, TrustSnapshot};

/// Durable storage for the registry.
///
/// `save` replaces the whole record and must not return `Ok` before it is
/// on stable storage.
pub trait TrustStore: Send + Sync {
    fn load(&self) -> Result<Option<TrustSnapshot>, StoreError>;

    fn save(&self, snapshot: &TrustSnapshot) -> Result<(), StoreError>;
}
