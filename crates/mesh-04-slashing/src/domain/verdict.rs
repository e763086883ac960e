//! Verdicts and the engine's audit summary.

use super::error::{SlashingError, SlashingResult};
use super::violation::{SlashingAction, ViolationType};
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, Timestamp};
use std::collections::BTreeMap;

/// Outcome of one evidence submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashingVerdict {
    pub is_valid: bool,
    /// Punishment applied; `None` when the evidence was rejected.
    pub action: Option<SlashingAction>,
    pub accused_id: NodeId,
    pub violation_type: ViolationType,
    pub stake_slashed: u64,
    pub evidence_hash: ContentHash,
    /// `ZERO` for replays, which are never recorded.
    pub verdict_hash: ContentHash,
    pub processed_at: Timestamp,
    /// `PUNISHED` for valid evidence, otherwise the rejection code.
    pub code: String,
    pub reason: String,
}

#[derive(Serialize)]
struct VerdictHashFields<'a> {
    is_valid: bool,
    evidence_hash: &'a ContentHash,
    stake_slashed: u64,
    processed_at: Timestamp,
}

/// SHA-256 over the verdict's decisive fields.
pub fn verdict_hash(
    is_valid: bool,
    evidence_hash: &ContentHash,
    stake_slashed: u64,
    processed_at: Timestamp,
) -> SlashingResult<ContentHash> {
    let fields = VerdictHashFields {
        is_valid,
        evidence_hash,
        stake_slashed,
        processed_at,
    };
    shared_crypto::hash_canonical(&fields).map_err(SlashingError::from)
}

impl SlashingVerdict {
    pub const PUNISHED: &'static str = "PUNISHED";

    pub fn is_replay(&self) -> bool {
        self.code == "REPLAY"
    }

    pub fn rejection(
        accused_id: NodeId,
        violation_type: ViolationType,
        evidence_hash: ContentHash,
        verdict_hash: ContentHash,
        processed_at: Timestamp,
        error: &SlashingError,
    ) -> Self {
        Self {
            is_valid: false,
            action: None,
            accused_id,
            violation_type,
            stake_slashed: 0,
            evidence_hash,
            verdict_hash,
            processed_at,
            code: error.code().to_string(),
            reason: error.to_string(),
        }
    }
}

/// Totals for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlashingStatus {
    pub total_evidence_processed: usize,
    pub total_verdicts: usize,
    pub valid_slashings: usize,
    pub total_stake_slashed: u64,
    pub violations_by_type: BTreeMap<ViolationType, usize>,
}
