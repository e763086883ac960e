//! Trust Service - shared, persistent access to the trust registry
//!
//! # Commit protocol
//!
//! Every mutation runs on a copy of the registry. The copy is saved to the
//! [`TrustStore`]; only when the save succeeds does it replace the live
//! registry and is the matching event published. A failed save returns
//! [`TrustError::Store`] and leaves the registry as it was.

use crate::domain::{
    BanProof, BanRequest, TrustConfig, TrustError, TrustLevel, TrustRegistry, TrustResult,
    TrustStats,
};
use crate::ports::{TrustStore, TrustView};
use parking_lot::RwLock;
use shared_bus::{EventPublisher, MeshEvent};
use shared_types::{NodeId, PublicKey, SignatureVerifier, Signer, TimeSource, Timestamp};
use std::sync::Arc;
use tracing::{info, warn};

/// Trust Service
pub struct TrustService {
    registry: RwLock<TrustRegistry>,
    store: Arc<dyn TrustStore>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl TrustService {
    /// Seed the registry from `config`, then layer the stored record over it.
    pub fn open(
        config: TrustConfig,
        verifier: Arc<dyn SignatureVerifier>,
        store: Arc<dyn TrustStore>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> TrustResult<Self> {
        let mut registry = TrustRegistry::new(config, verifier);
        if let Some(snapshot) = store.load()? {
            registry.restore(snapshot);
        }
        Ok(Self {
            registry: RwLock::new(registry),
            store,
            events,
            clock,
        })
    }

    /// Read-only access to the registry.
    pub fn with_registry<R>(&self, f: impl FnOnce(&TrustRegistry, Timestamp) -> R) -> R {
        let now = self.clock.now();
        f(&self.registry.read(), now)
    }

    fn commit<R>(
        &self,
        f: impl FnOnce(&mut TrustRegistry, Timestamp) -> TrustResult<R>,
    ) -> TrustResult<R> {
        let now = self.clock.now();
        let mut registry = self.registry.write();
        let mut next = registry.clone();
        let out = f(&mut next, now)?;
        if let Err(err) = self.store.save(&next.snapshot(now)) {
            warn!(error = %err, "Trust registry not saved; change discarded");
            return Err(err.into());
        }
        *registry = next;
        Ok(out)
    }

    // === Trust management ===

    pub fn get_trust_level(&self, node: &NodeId) -> TrustLevel {
        self.with_registry(|r, now| r.get_trust_level(node, now))
    }

    pub fn set_trust_level(
        &self,
        node: &NodeId,
        level: TrustLevel,
        name: Option<&str>,
    ) -> TrustResult<()> {
        self.commit(|r, _| r.set_trust_level(node, level, name))
    }

    pub fn add_node(
        &self,
        node: &NodeId,
        level: TrustLevel,
        name: Option<&str>,
        public_key: Option<PublicKey>,
    ) -> TrustResult<()> {
        self.commit(|r, _| r.add_node(node, level, name, public_key))
    }

    pub fn register_identity(&self, node: &NodeId, public_key: PublicKey) -> TrustResult<()> {
        self.commit(|r, _| {
            r.register_identity(node, public_key);
            Ok(())
        })
    }

    pub fn remove_node(&self, node: &NodeId) -> TrustResult<()> {
        self.commit(|r, _| {
            r.remove_node(node);
            Ok(())
        })
    }

    // === Access control ===

    pub fn is_allowed(&self, node: &NodeId, minimum: TrustLevel) -> bool {
        self.with_registry(|r, now| r.is_allowed(node, minimum, now))
    }

    pub fn can_attest(&self, node: &NodeId) -> bool {
        self.with_registry(|r, now| r.can_attest(node, now))
    }

    pub fn can_admin(&self, node: &NodeId) -> bool {
        self.with_registry(|r, now| r.can_admin(node, now))
    }

    // === Bans ===

    pub fn issue_ban(&self, request: BanRequest, issuer: &dyn Signer) -> TrustResult<BanProof> {
        let proof = self.commit(|r, now| r.issue_ban(request, issuer, now))?;
        self.publish_ban(&proof);
        Ok(proof)
    }

    pub fn issue_quorum_ban(
        &self,
        request: BanRequest,
        signers: &[&dyn Signer],
        quorum: Option<u32>,
    ) -> TrustResult<BanProof> {
        let proof = self.commit(|r, now| {
            let quorum = quorum.unwrap_or(r.config().default_quorum);
            r.issue_quorum_ban(request, signers, quorum, now)
        })?;
        self.publish_ban(&proof);
        Ok(proof)
    }

    /// Judge a proof received from a peer; applied and persisted if accepted.
    pub fn process_ban_gossip(&self, proof: &BanProof) -> TrustResult<()> {
        match self.commit(|r, now| r.process_ban_gossip(proof, now)) {
            Ok(()) => {
                self.publish_ban(proof);
                Ok(())
            }
            Err(TrustError::Rejected(rejection)) if rejection.is_replay() => {
                Err(TrustError::Rejected(rejection))
            }
            Err(err) => {
                info!(
                    target = %proof.target_node_id,
                    issuer = %proof.issuer_node_id,
                    reason = %err,
                    "Ban proof rejected"
                );
                Err(err)
            }
        }
    }

    pub fn revoke_ban(
        &self,
        target: &NodeId,
        revoker: &NodeId,
        new_level: TrustLevel,
    ) -> TrustResult<BanProof> {
        let proof = self.commit(|r, now| r.revoke_ban(target, revoker, new_level, now))?;
        self.events.publish(MeshEvent::BanRevoked {
            target: target.clone(),
            revoked_by: revoker.clone(),
        });
        Ok(proof)
    }

    fn publish_ban(&self, proof: &BanProof) {
        self.events.publish(MeshEvent::BanApplied {
            target: proof.target_node_id.clone(),
            ban_id: proof.ban_id,
            issuer: proof.issuer_node_id.clone(),
        });
    }

    // === Queries ===

    pub fn get_ban_proof(&self, node: &NodeId) -> Option<BanProof> {
        self.registry.read().get_ban_proof(node).cloned()
    }

    pub fn active_bans(&self) -> Vec<BanProof> {
        self.with_registry(|r, now| r.active_bans(now).into_iter().cloned().collect())
    }

    pub fn stats(&self) -> TrustStats {
        self.with_registry(|r, now| r.stats(now))
    }
}

impl TrustView for TrustService {
    fn trust_level(&self, node: &NodeId) -> TrustLevel {
        self.get_trust_level(node)
    }
}
