//! # mesh-04-slashing
//!
//! Automated enforcement: misbehavior evidence is validated and, if it holds,
//! punished immediately through the federation's
//! [`NodeRegistry`](mesh_03_federation::NodeRegistry).
//!
//! ## Punishment table
//!
//! | Violation | Slash | Action |
//! |-----------|-------|--------|
//! | DOUBLE_SIGN, DOUBLE_VOTE | 100% | BAN |
//! | DOWNTIME | 10% | PROBATION |
//! | CENSORSHIP | 25% | PROBATION |
//! | LATE_BLOCK, INVALID_SIGNATURE | 0% | warning |
//!
//! Each evidence hash is judged at most once. Verdicts are content-addressed
//! and kept for audit.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    rule_for, BlockHeader, SlashingAction, SlashingConfig, SlashingError, SlashingEvidence,
    SlashingResult, SlashingRule, SlashingStatus, SlashingVerdict, ViolationType,
};
pub use ports::SlashingApi;
pub use service::SlashingEngine;
