//! Misbehavior evidence.
//!
//! Evidence is content-addressed: `evidence_hash` is SHA-256 over the
//! canonical JSON of the violation, the accused and both headers. The hash is
//! the replay key, so two submissions of the same proof collide no matter who
//! reports them or when.

use super::error::{SlashingError, SlashingResult};
use super::violation::ViolationType;
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, Signature, Signer, Timestamp};

/// A header signed by a validator. For `DOUBLE_VOTE` evidence `height` is
/// the voting round and `block_hash` the hash of the proposal voted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub block_hash: ContentHash,
    pub parent_hash: ContentHash,
    pub timestamp: Timestamp,
    pub validator_id: NodeId,
    #[serde(default)]
    pub signature: Signature,
}

#[derive(Serialize)]
struct HeaderSigningFields<'a> {
    height: u64,
    block_hash: &'a ContentHash,
    parent_hash: &'a ContentHash,
    timestamp: Timestamp,
    validator_id: &'a NodeId,
}

impl BlockHeader {
    pub fn new(
        height: u64,
        block_hash: ContentHash,
        parent_hash: ContentHash,
        timestamp: Timestamp,
        validator_id: NodeId,
    ) -> Self {
        Self {
            height,
            block_hash,
            parent_hash,
            timestamp,
            validator_id,
            signature: Signature::default(),
        }
    }

    /// Canonical bytes the validator signs: every field but the signature.
    pub fn signing_payload(&self) -> SlashingResult<Vec<u8>> {
        let fields = HeaderSigningFields {
            height: self.height,
            block_hash: &self.block_hash,
            parent_hash: &self.parent_hash,
            timestamp: self.timestamp,
            validator_id: &self.validator_id,
        };
        shared_crypto::canonical_json(&fields).map_err(SlashingError::from)
    }

    pub fn signed_by(mut self, signer: &dyn Signer) -> SlashingResult<Self> {
        let payload = self.signing_payload()?;
        self.signature = signer.sign(&payload);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashingEvidence {
    pub violation_type: ViolationType,
    pub accused_id: NodeId,

    pub header_a: Option<BlockHeader>,
    pub header_b: Option<BlockHeader>,

    #[serde(default)]
    pub downtime_secs: u64,
    #[serde(default)]
    pub censored_tx_hashes: Vec<ContentHash>,

    #[serde(default)]
    pub reporter_id: Option<NodeId>,
    pub submitted_at: Timestamp,
    /// Declared content hash; checked against [`compute_hash`](Self::compute_hash).
    pub evidence_hash: ContentHash,
}

#[derive(Serialize)]
struct EvidenceHashFields<'a> {
    violation_type: ViolationType,
    accused: &'a NodeId,
    header_a: Option<&'a BlockHeader>,
    header_b: Option<&'a BlockHeader>,
    downtime_secs: u64,
    censored_tx_hashes: &'a [ContentHash],
}

impl SlashingEvidence {
    /// Evidence with its hash filled in.
    pub fn new(
        violation_type: ViolationType,
        accused_id: NodeId,
        submitted_at: Timestamp,
    ) -> Self {
        let mut evidence = Self {
            violation_type,
            accused_id,
            header_a: None,
            header_b: None,
            downtime_secs: 0,
            censored_tx_hashes: Vec::new(),
            reporter_id: None,
            submitted_at,
            evidence_hash: ContentHash::ZERO,
        };
        evidence.seal();
        evidence
    }

    /// Two conflicting headers by the same validator. The accused is the
    /// signer of `header_a`.
    pub fn equivocation(
        violation_type: ViolationType,
        header_a: BlockHeader,
        header_b: BlockHeader,
        submitted_at: Timestamp,
    ) -> Self {
        let mut evidence = Self::new(violation_type, header_a.validator_id.clone(), submitted_at);
        evidence.header_a = Some(header_a);
        evidence.header_b = Some(header_b);
        evidence.seal();
        evidence
    }

    pub fn double_sign(header_a: BlockHeader, header_b: BlockHeader, submitted_at: Timestamp) -> Self {
        Self::equivocation(ViolationType::DoubleSign, header_a, header_b, submitted_at)
    }

    pub fn downtime(accused_id: NodeId, downtime_secs: u64, submitted_at: Timestamp) -> Self {
        let mut evidence = Self::new(ViolationType::Downtime, accused_id, submitted_at);
        evidence.downtime_secs = downtime_secs;
        evidence.seal();
        evidence
    }

    pub fn censorship(
        accused_id: NodeId,
        censored_tx_hashes: Vec<ContentHash>,
        submitted_at: Timestamp,
    ) -> Self {
        let mut evidence = Self::new(ViolationType::Censorship, accused_id, submitted_at);
        evidence.censored_tx_hashes = censored_tx_hashes;
        evidence.seal();
        evidence
    }

    pub fn reported_by(mut self, reporter: NodeId) -> Self {
        self.reporter_id = Some(reporter);
        self
    }

    /// Hash over the proof content. Reporter and submission time are not part
    /// of it.
    pub fn compute_hash(&self) -> SlashingResult<ContentHash> {
        let fields = EvidenceHashFields {
            violation_type: self.violation_type,
            accused: &self.accused_id,
            header_a: self.header_a.as_ref(),
            header_b: self.header_b.as_ref(),
            downtime_secs: self.downtime_secs,
            censored_tx_hashes: &self.censored_tx_hashes,
        };
        shared_crypto::hash_canonical(&fields).map_err(SlashingError::from)
    }

    fn seal(&mut self) {
        // Only fails if serde_json cannot encode plain structs; leave ZERO,
        // which the integrity check then rejects.
        self.evidence_hash = self.compute_hash().unwrap_or(ContentHash::ZERO);
    }
}
