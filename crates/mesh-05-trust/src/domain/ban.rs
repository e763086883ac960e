//! Signed ban proofs.
//!
//! A proof names its target, the evidence (by hash) and its issuer. The
//! `ban_id` is the content hash of those fields, and every signature covers
//! the same fields plus the id, so neither can be altered without
//! invalidating the proof.

use super::error::TrustResult;
use super::level::{BanReason, TrustLevel};
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, NodeId, PublicKey, Signature, SignatureVerifier, Signer, Timestamp};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_FEDERATION_ID: &str = "MESH-FEDERATION";

/// Co-signature on a quorum ban.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportingSignature {
    pub node_id: NodeId,
    pub trust_level: TrustLevel,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanProof {
    pub ban_id: ContentHash,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub target_node_name: Option<String>,
    pub reason: BanReason,
    pub evidence_hash: ContentHash,

    pub issuer_node_id: NodeId,
    /// Level the issuer claimed; receivers use their own view instead.
    pub issuer_trust_level: TrustLevel,
    pub signature: Signature,

    #[serde(default)]
    pub supporting_signatures: Vec<SupportingSignature>,
    /// 0 for a single-signer ban.
    #[serde(default)]
    pub required_quorum: u32,

    pub issued_at: Timestamp,
    /// `None` is permanent.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    pub federation_id: String,
}

#[derive(Serialize)]
struct BanIdFields<'a> {
    target_node_id: &'a NodeId,
    reason: BanReason,
    evidence_hash: &'a ContentHash,
    issuer_node_id: &'a NodeId,
    issued_at: Timestamp,
    expires_at: Option<Timestamp>,
    federation_id: &'a str,
    required_quorum: u32,
}

#[derive(Serialize)]
struct SignableFields<'a> {
    #[serde(flatten)]
    content: BanIdFields<'a>,
    ban_id: &'a ContentHash,
}

impl BanProof {
    /// Unsigned proof with its id computed.
    #[allow(clippy::too_many_arguments)]
    pub fn draft(
        target: NodeId,
        reason: BanReason,
        evidence_hash: ContentHash,
        issuer: NodeId,
        issuer_trust_level: TrustLevel,
        required_quorum: u32,
        issued_at: Timestamp,
        expires_at: Option<Timestamp>,
        federation_id: impl Into<String>,
    ) -> TrustResult<Self> {
        let mut proof = Self {
            ban_id: ContentHash::ZERO,
            target_node_id: target,
            target_node_name: None,
            reason,
            evidence_hash,
            issuer_node_id: issuer,
            issuer_trust_level,
            signature: Signature::default(),
            supporting_signatures: Vec::new(),
            required_quorum,
            issued_at,
            expires_at,
            federation_id: federation_id.into(),
        };
        proof.ban_id = proof.compute_ban_id()?;
        Ok(proof)
    }

    fn id_fields(&self) -> BanIdFields<'_> {
        BanIdFields {
            target_node_id: &self.target_node_id,
            reason: self.reason,
            evidence_hash: &self.evidence_hash,
            issuer_node_id: &self.issuer_node_id,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            federation_id: &self.federation_id,
            required_quorum: self.required_quorum,
        }
    }

    pub fn compute_ban_id(&self) -> TrustResult<ContentHash> {
        Ok(shared_crypto::hash_canonical(&self.id_fields())?)
    }

    /// Canonical bytes every signer signs: all fields but the signatures.
    pub fn signable_bytes(&self) -> TrustResult<Vec<u8>> {
        let fields = SignableFields {
            content: self.id_fields(),
            ban_id: &self.ban_id,
        };
        Ok(shared_crypto::canonical_json(&fields)?)
    }

    pub fn sign_primary(&mut self, signer: &dyn Signer) -> TrustResult<()> {
        let bytes = self.signable_bytes()?;
        self.signature = signer.sign(&bytes);
        Ok(())
    }

    pub fn add_supporting(&mut self, signer: &dyn Signer, level: TrustLevel) -> TrustResult<()> {
        let bytes = self.signable_bytes()?;
        self.supporting_signatures.push(SupportingSignature {
            node_id: signer.node_id().clone(),
            trust_level: level,
            signature: signer.sign(&bytes),
        });
        Ok(())
    }

    pub fn is_quorum(&self) -> bool {
        self.required_quorum > 0
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }

    pub fn verify_primary(
        &self,
        key: &PublicKey,
        verifier: &dyn SignatureVerifier,
    ) -> TrustResult<bool> {
        let bytes = self.signable_bytes()?;
        Ok(verifier.verify(key, &bytes, &self.signature))
    }

    /// Distinct signers (primary included) whose signature verifies under
    /// their known key and who pass `eligible`.
    pub fn count_valid_signers(
        &self,
        identities: &HashMap<NodeId, PublicKey>,
        verifier: &dyn SignatureVerifier,
        eligible: impl Fn(&NodeId) -> bool,
    ) -> TrustResult<usize> {
        let bytes = self.signable_bytes()?;
        let mut counted: HashSet<&NodeId> = HashSet::new();

        let signers = std::iter::once((&self.issuer_node_id, &self.signature)).chain(
            self.supporting_signatures
                .iter()
                .map(|s| (&s.node_id, &s.signature)),
        );
        for (node, signature) in signers {
            if counted.contains(node) || !eligible(node) {
                continue;
            }
            let Some(key) = identities.get(node) else {
                continue;
            };
            if verifier.verify(key, &bytes, signature) {
                counted.insert(node);
            }
        }
        Ok(counted.len())
    }
}

/// Hash of arbitrary evidence, for callers that hold the evidence itself.
pub fn evidence_hash(evidence: &serde_json::Value) -> TrustResult<ContentHash> {
    Ok(shared_crypto::hash_canonical(evidence)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::{Ed25519Identity, Ed25519KeyPair, Ed25519Verifier};

    fn identity(name: &str, seed: u8) -> Ed25519Identity {
        Ed25519Identity::new(NodeId::from(name), Ed25519KeyPair::from_seed([seed; 32]))
    }

    fn draft(issuer: &str, quorum: u32) -> BanProof {
        BanProof::draft(
            NodeId::from("bad"),
            BanReason::Spam,
            ContentHash([4; 32]),
            NodeId::from(issuer),
            TrustLevel::Admin,
            quorum,
            Timestamp::from_secs(10),
            None,
            DEFAULT_FEDERATION_ID,
        )
        .unwrap()
    }

    #[test]
    fn test_ban_id_is_content_hash() {
        let proof = draft("admin", 0);
        assert_eq!(proof.compute_ban_id().unwrap(), proof.ban_id);

        let mut tampered = proof.clone();
        tampered.target_node_id = NodeId::from("innocent");
        assert_ne!(tampered.compute_ban_id().unwrap(), proof.ban_id);
    }

    #[test]
    fn test_primary_signature_covers_fields() {
        let admin = identity("admin", 1);
        let mut proof = draft("admin", 0);
        proof.sign_primary(&admin).unwrap();
        let key = admin.public_key();
        assert!(proof.verify_primary(&key, &Ed25519Verifier).unwrap());

        proof.reason = BanReason::ManualBan;
        assert!(!proof.verify_primary(&key, &Ed25519Verifier).unwrap());
    }

    #[test]
    fn test_duplicate_signers_count_once() {
        let a = identity("a", 1);
        let b = identity("b", 2);
        let mut proof = draft("a", 2);
        proof.sign_primary(&a).unwrap();
        proof.add_supporting(&a, TrustLevel::Trusted).unwrap();

        let identities: HashMap<_, _> = [
            (NodeId::from("a"), a.public_key()),
            (NodeId::from("b"), b.public_key()),
        ]
        .into_iter()
        .collect();
        let count = |p: &BanProof| {
            p.count_valid_signers(&identities, &Ed25519Verifier, |_| true)
                .unwrap()
        };
        assert_eq!(count(&proof), 1);

        proof.add_supporting(&b, TrustLevel::Trusted).unwrap();
        assert_eq!(count(&proof), 2);
        assert_eq!(
            proof
                .count_valid_signers(&identities, &Ed25519Verifier, |n| n.as_str() == "b")
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_expiry() {
        let mut proof = draft("admin", 0);
        assert!(!proof.is_expired(Timestamp::from_secs(u64::MAX / 2000)));
        proof.expires_at = Some(Timestamp::from_secs(20));
        assert!(!proof.is_expired(Timestamp::from_secs(20)));
        assert!(proof.is_expired(Timestamp::from_secs(21)));
    }
}
