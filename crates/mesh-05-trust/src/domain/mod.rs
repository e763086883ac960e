//! Domain layer: trust levels, ban proofs and the registry, no I/O.

pub mod ban;
pub mod config;
pub mod error;
pub mod level;
pub mod registry;
pub mod snapshot;

pub use ban::{evidence_hash, BanProof, SupportingSignature, DEFAULT_FEDERATION_ID};
pub use config::TrustConfig;
pub use error::{BanRejection, StoreError, TrustError, TrustResult};
pub use level::{BanReason, TrustLevel};
pub use registry::{BanRequest, TrustRegistry, TrustStats};
pub use snapshot::{TrustSnapshot, SNAPSHOT_VERSION};
