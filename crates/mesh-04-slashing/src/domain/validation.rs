//! Evidence validation.
//!
//! Pure checks over the evidence itself plus the accused's registered key.
//! Replay and registry lookups happen in the engine; these functions only
//! decide whether the proof holds.

use super::error::{SlashingError, SlashingResult};
use super::evidence::{BlockHeader, SlashingEvidence};
use super::violation::ViolationType;
use shared_types::{PublicKey, SignatureVerifier};

/// The declared hash must match the content.
pub fn verify_integrity(evidence: &SlashingEvidence) -> SlashingResult<()> {
    let computed = evidence.compute_hash()?;
    if computed != evidence.evidence_hash {
        return Err(SlashingError::HashMismatch {
            declared: evidence.evidence_hash,
            computed,
        });
    }
    Ok(())
}

/// Two headers prove equivocation when they share a height and a signer
/// (the accused) but commit to different blocks under two real signatures.
///
/// With a verifier and the accused's key both signatures must also verify.
pub fn validate_equivocation(
    evidence: &SlashingEvidence,
    accused_key: Option<&PublicKey>,
    verifier: Option<&dyn SignatureVerifier>,
) -> SlashingResult<()> {
    let (a, b) = match (&evidence.header_a, &evidence.header_b) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(SlashingError::MissingHeaders),
    };

    if a.height != b.height {
        return Err(SlashingError::HeightMismatch {
            a: a.height,
            b: b.height,
        });
    }
    if a.block_hash == b.block_hash {
        return Err(SlashingError::SameBlock);
    }
    if a.validator_id != b.validator_id {
        return Err(SlashingError::ValidatorMismatch {
            a: a.validator_id.clone(),
            b: b.validator_id.clone(),
        });
    }
    if a.validator_id != evidence.accused_id {
        return Err(SlashingError::AccusedMismatch {
            signer: a.validator_id.clone(),
            accused: evidence.accused_id.clone(),
        });
    }
    if a.signature.is_empty() || b.signature.is_empty() {
        return Err(SlashingError::MissingSignature);
    }
    if a.signature == b.signature {
        return Err(SlashingError::SameSignature);
    }

    if let (Some(verifier), Some(key)) = (verifier, accused_key) {
        for header in [a, b] {
            if !header_signed_by(header, key, verifier)? {
                return Err(SlashingError::BadSignature(evidence.accused_id.clone()));
            }
        }
    }
    Ok(())
}

fn header_signed_by(
    header: &BlockHeader,
    key: &PublicKey,
    verifier: &dyn SignatureVerifier,
) -> SlashingResult<bool> {
    let payload = header.signing_payload()?;
    Ok(verifier.verify(key, &payload, &header.signature))
}

pub fn validate_downtime(evidence: &SlashingEvidence, min_downtime_secs: u64) -> SlashingResult<()> {
    if evidence.downtime_secs < min_downtime_secs {
        return Err(SlashingError::InsufficientDowntime {
            actual: evidence.downtime_secs,
            minimum: min_downtime_secs,
        });
    }
    Ok(())
}

pub fn validate_censorship(evidence: &SlashingEvidence) -> SlashingResult<()> {
    if evidence.censored_tx_hashes.is_empty() {
        return Err(SlashingError::NoCensoredTransactions);
    }
    Ok(())
}

/// Type-specific checks. Whether the accused exists is the caller's concern.
pub fn validate_evidence(
    evidence: &SlashingEvidence,
    accused_key: Option<&PublicKey>,
    verifier: Option<&dyn SignatureVerifier>,
    min_downtime_secs: u64,
) -> SlashingResult<()> {
    match evidence.violation_type {
        ViolationType::DoubleSign | ViolationType::DoubleVote => {
            validate_equivocation(evidence, accused_key, verifier)
        }
        ViolationType::Downtime => validate_downtime(evidence, min_downtime_secs),
        ViolationType::Censorship => validate_censorship(evidence),
        ViolationType::LateBlock | ViolationType::InvalidSignature => Ok(()),
    }
}
