//! Ban propagation over gossip rumors.
//!
//! A ban travels as a rumor on the `ban` topic whose id is derived from the
//! ban id, so the gossip layer's duplicate suppression and the registry's
//! replay check agree on what "the same ban" means.

use crate::domain::{BanProof, TrustError, TrustResult};
use crate::service::TrustService;
use mesh_01_gossip::{Rumor, RumorHandler};
use shared_types::NodeId;
use std::sync::Arc;
use tracing::debug;

pub const BAN_TOPIC: &str = "ban";

pub fn ban_rumor(proof: &BanProof) -> TrustResult<Rumor> {
    let payload = serde_json::to_value(proof).map_err(|e| TrustError::Encoding(e.to_string()))?;
    Ok(Rumor::new(
        format!("ban:{}", proof.ban_id.to_hex()),
        BAN_TOPIC,
        payload,
    ))
}

/// Feeds gossiped ban proofs into the local registry. Accepted proofs are
/// re-disseminated; rejected ones stop here.
pub struct BanRumorHandler {
    trust: Arc<TrustService>,
}

impl BanRumorHandler {
    pub fn new(trust: Arc<TrustService>) -> Self {
        Self { trust }
    }
}

impl RumorHandler for BanRumorHandler {
    fn topic(&self) -> &str {
        BAN_TOPIC
    }

    fn on_rumor(&self, from: &NodeId, rumor: &Rumor) -> bool {
        let proof: BanProof = match serde_json::from_value(rumor.payload.clone()) {
            Ok(proof) => proof,
            Err(e) => {
                debug!(from = %from, error = %e, "Malformed ban rumor");
                return false;
            }
        };
        self.trust.process_ban_gossip(&proof).is_ok()
    }
}
