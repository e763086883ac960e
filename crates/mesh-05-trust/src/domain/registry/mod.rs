//! The trust registry: node id → trust level, plus the ban list.
//!
//! Plain data. Time comes in as `now`; persistence and events belong to the
//! service.

use super::ban::BanProof;
use super::config::TrustConfig;
use super::error::{BanRejection, TrustError, TrustResult};
use super::level::{BanReason, TrustLevel};
use super::snapshot::{TrustSnapshot, SNAPSHOT_VERSION};
use serde::Serialize;
use shared_types::{ContentHash, NodeId, PublicKey, SignatureVerifier, Signer, Timestamp};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrustStats {
    pub total_nodes: usize,
    pub trust_levels: BTreeMap<TrustLevel, usize>,
    pub active_bans: usize,
    pub expired_bans: usize,
    pub known_identities: usize,
    pub processed_evidence: usize,
}

/// A ban to issue. The evidence is referenced by hash only.
#[derive(Debug, Clone)]
pub struct BanRequest {
    pub target: NodeId,
    pub target_name: Option<String>,
    pub reason: BanReason,
    pub evidence_hash: ContentHash,
    pub expires_at: Option<Timestamp>,
}

impl BanRequest {
    pub fn new(target: NodeId, reason: BanReason, evidence_hash: ContentHash) -> Self {
        Self {
            target,
            target_name: None,
            reason,
            evidence_hash,
            expires_at: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    pub fn expiring(mut self, at: Timestamp) -> Self {
        self.expires_at = Some(at);
        self
    }
}

#[derive(Clone)]
pub struct TrustRegistry {
    config: TrustConfig,
    verifier: Arc<dyn SignatureVerifier>,

    trust_levels: HashMap<NodeId, TrustLevel>,
    node_names: HashMap<NodeId, String>,
    identities: HashMap<NodeId, PublicKey>,
    bans: HashMap<NodeId, BanProof>,

    processed_ban_ids: HashSet<ContentHash>,
    processed_evidence: HashSet<ContentHash>,
}

impl TrustRegistry {
    /// Empty registry with founders and admins seeded.
    pub fn new(config: TrustConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        let mut trust_levels = HashMap::new();
        for founder in &config.founders {
            trust_levels.insert(founder.clone(), TrustLevel::Founder);
        }
        for admin in &config.admins {
            trust_levels
                .entry(admin.clone())
                .or_insert(TrustLevel::Admin);
        }

        Self {
            config,
            verifier,
            trust_levels,
            node_names: HashMap::new(),
            identities: HashMap::new(),
            bans: HashMap::new(),
            processed_ban_ids: HashSet::new(),
            processed_evidence: HashSet::new(),
        }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    // === Trust management ===

    /// Effective level: BANNED while an unexpired ban exists.
    pub fn get_trust_level(&self, node: &NodeId, now: Timestamp) -> TrustLevel {
        if self.active_ban(node, now).is_some() {
            return TrustLevel::Banned;
        }
        match self.trust_levels.get(node) {
            // The ban behind it has expired.
            Some(TrustLevel::Banned) | None => TrustLevel::Unknown,
            Some(level) => *level,
        }
    }

    pub fn set_trust_level(
        &mut self,
        node: &NodeId,
        level: TrustLevel,
        name: Option<&str>,
    ) -> TrustResult<()> {
        if level == TrustLevel::Banned {
            return Err(TrustError::CannotSetBanned);
        }
        self.trust_levels.insert(node.clone(), level);
        if let Some(name) = name {
            self.node_names.insert(node.clone(), name.to_string());
        }
        info!(node = %node, level = %level, "Trust level set");
        Ok(())
    }

    pub fn add_node(
        &mut self,
        node: &NodeId,
        level: TrustLevel,
        name: Option<&str>,
        public_key: Option<PublicKey>,
    ) -> TrustResult<()> {
        self.set_trust_level(node, level, name)?;
        if let Some(key) = public_key {
            self.identities.insert(node.clone(), key);
        }
        Ok(())
    }

    pub fn register_identity(&mut self, node: &NodeId, public_key: PublicKey) {
        self.identities.insert(node.clone(), public_key);
    }

    /// Forget a node. Does not lift a ban.
    pub fn remove_node(&mut self, node: &NodeId) {
        if self.trust_levels.get(node) != Some(&TrustLevel::Banned) {
            self.trust_levels.remove(node);
        }
        self.node_names.remove(node);
        self.identities.remove(node);
    }

    pub fn node_name(&self, node: &NodeId) -> Option<&str> {
        self.node_names.get(node).map(String::as_str)
    }

    pub fn identity(&self, node: &NodeId) -> Option<&PublicKey> {
        self.identities.get(node)
    }

    // === Access control ===

    /// BANNED is always denied, whatever `minimum` is.
    pub fn is_allowed(&self, node: &NodeId, minimum: TrustLevel, now: Timestamp) -> bool {
        let level = self.get_trust_level(node, now);
        if level == TrustLevel::Banned {
            debug!(node = %node, "Access denied (BANNED)");
            return false;
        }
        level >= minimum
    }

    pub fn is_banned(&self, node: &NodeId, now: Timestamp) -> bool {
        self.get_trust_level(node, now) == TrustLevel::Banned
    }

    pub fn can_connect(&self, node: &NodeId, now: Timestamp) -> bool {
        self.is_allowed(node, TrustLevel::Unknown, now)
    }

    pub fn can_attest(&self, node: &NodeId, now: Timestamp) -> bool {
        self.is_allowed(node, TrustLevel::Peer, now)
    }

    pub fn can_admin(&self, node: &NodeId, now: Timestamp) -> bool {
        self.is_allowed(node, TrustLevel::Admin, now)
    }

    // === Bans ===

    fn require_level(&self, node: &NodeId, required: TrustLevel, now: Timestamp) -> TrustResult<TrustLevel> {
        let level = self.get_trust_level(node, now);
        if level < required {
            return Err(TrustError::Unauthorized {
                node: node.clone(),
                level,
                required,
            });
        }
        Ok(level)
    }

    fn draft(
        &self,
        request: &BanRequest,
        issuer: &NodeId,
        issuer_level: TrustLevel,
        quorum: u32,
        now: Timestamp,
    ) -> TrustResult<BanProof> {
        if self.active_ban(&request.target, now).is_some() {
            return Err(TrustError::AlreadyBanned(request.target.clone()));
        }
        let mut proof = BanProof::draft(
            request.target.clone(),
            request.reason,
            request.evidence_hash,
            issuer.clone(),
            issuer_level,
            quorum,
            now,
            request.expires_at,
            self.config.federation_id.clone(),
        )?;
        proof.target_node_name = request.target_name.clone();
        Ok(proof)
    }

    /// Single-signer ban. The issuer must be ADMIN or above. Applied locally
    /// before it is returned for propagation.
    pub fn issue_ban(
        &mut self,
        request: BanRequest,
        issuer: &dyn Signer,
        now: Timestamp,
    ) -> TrustResult<BanProof> {
        let level = self.require_level(issuer.node_id(), TrustLevel::Admin, now)?;
        let mut proof = self.draft(&request, issuer.node_id(), level, 0, now)?;
        proof.sign_primary(issuer)?;

        self.apply_ban(&proof);
        Ok(proof)
    }

    /// Ban signed by at least `quorum` signers that this registry holds at
    /// TRUSTED or above. Signers below TRUSTED are skipped; the first
    /// eligible signer becomes the primary issuer.
    pub fn issue_quorum_ban(
        &mut self,
        request: BanRequest,
        signers: &[&dyn Signer],
        quorum: u32,
        now: Timestamp,
    ) -> TrustResult<BanProof> {
        let minimum = self.config.min_quorum.max(1);
        if quorum < minimum {
            return Err(TrustError::QuorumTooSmall { quorum, minimum });
        }

        let mut seen = HashSet::new();
        let eligible: Vec<(&dyn Signer, TrustLevel)> = signers
            .iter()
            .filter(|s| seen.insert(s.node_id().clone()))
            .map(|s| (*s, self.get_trust_level(s.node_id(), now)))
            .filter(|(_, level)| *level >= TrustLevel::Trusted)
            .collect();

        let required = usize::try_from(quorum).unwrap_or(usize::MAX);
        if eligible.len() < required {
            return Err(TrustError::QuorumNotMet {
                valid: eligible.len(),
                required,
            });
        }

        let (primary, primary_level) = eligible[0];
        let request = BanRequest {
            reason: BanReason::QuorumBan,
            ..request
        };
        let mut proof = self.draft(&request, primary.node_id(), primary_level, quorum, now)?;
        proof.sign_primary(primary)?;
        for (signer, level) in &eligible[1..] {
            proof.add_supporting(*signer, *level)?;
        }

        self.apply_ban(&proof);
        Ok(proof)
    }

    /// Judge a ban proof received from a peer. On success the ban is applied.
    pub fn process_ban_gossip(&mut self, proof: &BanProof, now: Timestamp) -> TrustResult<()> {
        self.check_ban_proof(proof, now)?;
        self.apply_ban(proof);
        Ok(())
    }

    fn check_ban_proof(&self, proof: &BanProof, now: Timestamp) -> TrustResult<()> {
        if self.processed_ban_ids.contains(&proof.ban_id) {
            return Err(BanRejection::Replay(proof.ban_id).into());
        }
        if self.processed_evidence.contains(&proof.evidence_hash) {
            return Err(BanRejection::EvidenceReplay(proof.evidence_hash).into());
        }
        if self.active_ban(&proof.target_node_id, now).is_some() {
            return Err(BanRejection::AlreadyBanned(proof.target_node_id.clone()).into());
        }
        if proof.is_expired(now) {
            return Err(BanRejection::Expired.into());
        }
        if proof.compute_ban_id()? != proof.ban_id {
            return Err(BanRejection::TamperedId.into());
        }
        if proof.federation_id != self.config.federation_id {
            return Err(BanRejection::ForeignFederation(proof.federation_id.clone()).into());
        }

        let Some(issuer_key) = self.identities.get(&proof.issuer_node_id) else {
            warn!(issuer = %proof.issuer_node_id, "Ban from unknown issuer");
            return Err(BanRejection::UnknownIssuer(proof.issuer_node_id.clone()).into());
        };
        if !proof.verify_primary(issuer_key, self.verifier.as_ref())? {
            return Err(BanRejection::InvalidSignature.into());
        }

        let required_level = if proof.is_quorum() {
            let minimum = self.config.min_quorum.max(1);
            if proof.required_quorum < minimum {
                return Err(BanRejection::QuorumTooSmall {
                    declared: proof.required_quorum,
                    minimum,
                }
                .into());
            }
            let verified = proof.count_valid_signers(&self.identities, self.verifier.as_ref(), |n| {
                self.get_trust_level(n, now) >= TrustLevel::Trusted
            })?;
            let required = usize::try_from(proof.required_quorum).unwrap_or(usize::MAX);
            if verified < required {
                return Err(BanRejection::QuorumNotMet { verified, required }.into());
            }
            TrustLevel::Trusted
        } else {
            TrustLevel::Admin
        };

        let level = self.get_trust_level(&proof.issuer_node_id, now);
        if level < required_level {
            return Err(BanRejection::InsufficientAuthority {
                level,
                required: required_level,
            }
            .into());
        }
        Ok(())
    }

    fn apply_ban(&mut self, proof: &BanProof) {
        let target = &proof.target_node_id;
        self.bans.insert(target.clone(), proof.clone());
        self.trust_levels.insert(target.clone(), TrustLevel::Banned);
        if let Some(name) = &proof.target_node_name {
            self.node_names.insert(target.clone(), name.clone());
        }
        self.processed_ban_ids.insert(proof.ban_id);
        self.processed_evidence.insert(proof.evidence_hash);

        warn!(
            target = %target,
            reason = %proof.reason,
            issuer = %proof.issuer_node_id,
            ban_id = %proof.ban_id.short_hex(16),
            "BAN APPLIED"
        );
    }

    /// Lift a ban and put the node at `new_level`. The proof's id and evidence
    /// stay recorded, so the same proof cannot be replayed afterwards.
    pub fn revoke_ban(
        &mut self,
        target: &NodeId,
        revoker: &NodeId,
        new_level: TrustLevel,
        now: Timestamp,
    ) -> TrustResult<BanProof> {
        self.require_level(revoker, TrustLevel::Admin, now)?;
        if new_level == TrustLevel::Banned {
            return Err(TrustError::CannotSetBanned);
        }
        let proof = self
            .bans
            .remove(target)
            .ok_or_else(|| TrustError::NoActiveBan(target.clone()))?;
        self.trust_levels.insert(target.clone(), new_level);

        warn!(target = %target, level = %new_level, revoker = %revoker, "BAN REVOKED");
        Ok(proof)
    }

    fn active_ban(&self, node: &NodeId, now: Timestamp) -> Option<&BanProof> {
        self.bans.get(node).filter(|ban| !ban.is_expired(now))
    }

    pub fn get_ban_proof(&self, node: &NodeId) -> Option<&BanProof> {
        self.bans.get(node)
    }

    pub fn active_bans(&self, now: Timestamp) -> Vec<&BanProof> {
        self.bans.values().filter(|b| !b.is_expired(now)).collect()
    }

    pub fn is_evidence_processed(&self, evidence_hash: &ContentHash) -> bool {
        self.processed_evidence.contains(evidence_hash)
    }

    pub fn stats(&self, now: Timestamp) -> TrustStats {
        let mut trust_levels = BTreeMap::new();
        for node in self.trust_levels.keys() {
            *trust_levels
                .entry(self.get_trust_level(node, now))
                .or_default() += 1;
        }
        let active_bans = self.active_bans(now).len();
        TrustStats {
            total_nodes: self.trust_levels.len(),
            trust_levels,
            active_bans,
            expired_bans: self.bans.len() - active_bans,
            known_identities: self.identities.len(),
            processed_evidence: self.processed_evidence.len(),
        }
    }

    // === Persistence ===

    pub fn snapshot(&self, now: Timestamp) -> TrustSnapshot {
        TrustSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            trust_levels: self.trust_levels.clone().into_iter().collect(),
            node_names: self.node_names.clone().into_iter().collect(),
            identities: self.identities.clone().into_iter().collect(),
            bans: self.bans.clone().into_iter().collect(),
            processed_ban_ids: self.processed_ban_ids.iter().copied().collect(),
            processed_evidence: self.processed_evidence.iter().copied().collect(),
        }
    }

    /// Layer a stored snapshot over the seeded state; stored entries win.
    pub fn restore(&mut self, snapshot: TrustSnapshot) {
        self.trust_levels.extend(snapshot.trust_levels);
        self.node_names.extend(snapshot.node_names);
        self.identities.extend(snapshot.identities);
        for (target, ban) in snapshot.bans {
            self.processed_ban_ids.insert(ban.ban_id);
            self.processed_evidence.insert(ban.evidence_hash);
            self.bans.insert(target, ban);
        }
        self.processed_ban_ids.extend(snapshot.processed_ban_ids);
        self.processed_evidence.extend(snapshot.processed_evidence);
        info!(
            nodes = self.trust_levels.len(),
            bans = self.bans.len(),
            "Trust registry restored"
        );
    }
}
