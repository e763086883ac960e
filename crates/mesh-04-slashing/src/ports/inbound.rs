//! Driving ports (Inbound API)

use crate::domain::{BlockHeader, SlashingEvidence, SlashingStatus, SlashingVerdict};
use shared_types::{ContentHash, NodeId};

/// Primary API of the slashing engine.
pub trait SlashingApi: Send + Sync {
    /// Judge `evidence` and, if it holds, punish the accused at once.
    ///
    /// Always returns a verdict; rejected evidence carries the reason code.
    fn process_evidence(&self, evidence: SlashingEvidence) -> SlashingVerdict;

    /// Build double-sign evidence from two observed headers, if they conflict.
    fn check_double_signing(
        &self,
        header_a: &BlockHeader,
        header_b: &BlockHeader,
    ) -> Option<SlashingEvidence>;

    /// Verdicts in processing order, optionally only those against `accused`.
    fn get_verdicts(&self, accused: Option<&NodeId>) -> Vec<SlashingVerdict>;

    fn get_evidence(&self, evidence_hash: &ContentHash) -> Option<SlashingEvidence>;

    fn status(&self) -> SlashingStatus;
}
