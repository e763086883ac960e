//! # Admission Gate
//!
//! Every inbound RPC passes the gate before any subsystem sees it. A peer is
//! refused when the local trust registry holds an active ban on it, or when
//! the federation registry has expelled it. Peers the node knows nothing
//! about are let through: membership is open until a ban says otherwise.

use mesh_03_federation::NodeRegistry;
use mesh_05_trust::TrustView;
use shared_types::NodeId;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Refusal {
    #[error("peer {0} is banned")]
    Banned(NodeId),

    #[error("peer {0} was expelled from the federation")]
    Expelled(NodeId),
}

pub struct AdmissionGate {
    trust: Arc<dyn TrustView>,
    registry: Arc<dyn NodeRegistry>,
}

impl AdmissionGate {
    pub fn new(trust: Arc<dyn TrustView>, registry: Arc<dyn NodeRegistry>) -> Self {
        Self { trust, registry }
    }

    pub fn check(&self, peer: &NodeId) -> Result<(), Refusal> {
        if !self.trust.can_connect(peer) {
            return Err(Refusal::Banned(peer.clone()));
        }
        if self
            .registry
            .get_node(peer)
            .is_some_and(|record| record.is_banned())
        {
            return Err(Refusal::Expelled(peer.clone()));
        }
        Ok(())
    }
}
