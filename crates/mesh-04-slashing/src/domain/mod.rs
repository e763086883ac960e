//! Domain layer: the punishment table, evidence and its validation.

pub mod config;
pub mod error;
pub mod evidence;
pub mod validation;
pub mod verdict;
pub mod violation;

pub use config::SlashingConfig;
pub use error::{SlashingError, SlashingResult};
pub use evidence::{BlockHeader, SlashingEvidence};
pub use validation::{validate_evidence, verify_integrity};
pub use verdict::{verdict_hash, SlashingStatus, SlashingVerdict};
pub use violation::{rule_for, SlashingAction, SlashingRule, ViolationType};
