//! # mesh-05-trust
//!
//! Who may talk to this node, and the bans that say who may not.
//!
//! ## Trust levels
//!
//! `BANNED < UNKNOWN < PENDING < PEER < TRUSTED < ADMIN < FOUNDER`
//!
//! | Check | Needs |
//! |-------|-------|
//! | connect | UNKNOWN |
//! | attest | PEER |
//! | co-sign a quorum ban | TRUSTED |
//! | issue or revoke a ban | ADMIN |
//!
//! ## Ban propagation
//!
//! ```text
//!   issue_ban ──→ BanProof (content-addressed, signed) ──→ gossip "ban" rumor
//!                      │                                          │
//!                 applied locally                  process_ban_gossip on peers
//!                                                  (replay, expiry, id, signature,
//!                                                   quorum and authority checks)
//! ```
//!
//! A proof's id and evidence hash are remembered for good, even after the
//! ban is revoked, so the same proof is never applied twice.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{ban_rumor, BanRumorHandler, InMemoryTrustStore, JsonFileTrustStore, BAN_TOPIC};
pub use domain::{
    evidence_hash, BanProof, BanReason, BanRejection, BanRequest, StoreError, SupportingSignature,
    TrustConfig, TrustError, TrustLevel, TrustRegistry, TrustResult, TrustSnapshot, TrustStats,
    DEFAULT_FEDERATION_ID,
};
pub use ports::{TrustStore, TrustView};
pub use service::TrustService;
