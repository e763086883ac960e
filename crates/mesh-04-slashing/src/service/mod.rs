//! Slashing Engine - evidence in, punishment out
//!
//! # Pipeline
//!
//! ```text
//! evidence ─→ replay? ─→ hash intact? ─→ accused known? ─→ proof holds?
//!               │            │                 │                │
//!            REPLAY     HASH_MISMATCH    UNKNOWN_ACCUSED   type-specific code
//!                                                               │
//!                                      slash stake ─→ ban / probation / warn
//! ```
//!
//! Punishment is applied unconditionally once a proof holds; nothing in this
//! crate can veto or soften it.
//!
//! # Replay window
//!
//! Every evidence hash that passes the integrity check is remembered before
//! validation starts, whether the proof then holds or not. Evidence whose
//! declared hash is wrong is not remembered, so a forged declaration cannot
//! reserve the hash of a real proof.

use crate::domain::{
    rule_for, validate_evidence, verdict_hash, verify_integrity, BlockHeader, SlashingAction,
    SlashingConfig, SlashingError, SlashingEvidence, SlashingStatus, SlashingVerdict,
    ViolationType,
};
use crate::ports::SlashingApi;
use mesh_03_federation::{NodeRecord, NodeRegistry, NodeStatus};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, MeshEvent};
use shared_types::{ContentHash, NodeId, SignatureVerifier, TimeSource, Timestamp};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct EngineState {
    processed: HashSet<ContentHash>,
    evidence_log: HashMap<ContentHash, SlashingEvidence>,
    verdicts: VecDeque<SlashingVerdict>,
    total_verdicts: usize,
    valid_slashings: usize,
    slashed_pool: u64,
    violations_by_type: BTreeMap<ViolationType, usize>,
}

/// Slashing Engine
pub struct SlashingEngine {
    config: SlashingConfig,
    registry: Arc<dyn NodeRegistry>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    state: Mutex<EngineState>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl SlashingEngine {
    pub fn new(
        config: SlashingConfig,
        registry: Arc<dyn NodeRegistry>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            registry,
            verifier: None,
            state: Mutex::new(EngineState::default()),
            events,
            clock,
        }
    }

    /// Check equivocation signatures against the accused's registered key.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn config(&self) -> &SlashingConfig {
        &self.config
    }

    pub fn is_processed(&self, evidence_hash: &ContentHash) -> bool {
        self.state.lock().processed.contains(evidence_hash)
    }

    fn judge(&self, evidence: SlashingEvidence) -> SlashingVerdict {
        let hash = evidence.evidence_hash;
        let now = self.clock.now();

        if self.is_processed(&hash) {
            return self.replay(&evidence, now);
        }

        if let Err(err) = verify_integrity(&evidence) {
            return self.reject(&evidence, now, err);
        }

        // Claim the hash before validating; a concurrent duplicate loses here.
        {
            let mut state = self.state.lock();
            if !state.processed.insert(hash) {
                drop(state);
                return self.replay(&evidence, now);
            }
            state.evidence_log.insert(hash, evidence.clone());
        }

        let Some(accused) = self.registry.get_node(&evidence.accused_id) else {
            let err = SlashingError::UnknownAccused(evidence.accused_id.clone());
            return self.reject(&evidence, now, err);
        };

        if let Err(err) = validate_evidence(
            &evidence,
            Some(&accused.public_key),
            self.verifier.as_deref(),
            self.config.min_downtime_secs,
        ) {
            return self.reject(&evidence, now, err);
        }

        match self.punish(&evidence, &accused, now) {
            Ok(verdict) => verdict,
            Err(err) => self.reject(&evidence, now, err),
        }
    }

    fn punish(
        &self,
        evidence: &SlashingEvidence,
        accused: &NodeRecord,
        now: Timestamp,
    ) -> Result<SlashingVerdict, SlashingError> {
        let rule = rule_for(evidence.violation_type);
        let amount = rule.slash_amount(accused.stake_amount);
        let hash = verdict_hash(true, &evidence.evidence_hash, amount, now)?;
        let node = &accused.node_id;
        let reason = format!("{}: {}", evidence.violation_type, rule.description);

        let stake_slashed = if rule.slash_percent > 0 {
            match self.registry.slash_stake(node, amount, hash) {
                Ok(slashed) => slashed,
                Err(err) => {
                    warn!(node = %node, error = %err, "Registry refused stake slash");
                    0
                }
            }
        } else {
            0
        };

        let applied = match rule.action {
            SlashingAction::Ban => self.registry.ban_node(node, &reason),
            SlashingAction::Probation => {
                self.registry
                    .update_status(node, NodeStatus::Probation, &reason)
            }
            SlashingAction::Warn => self.registry.warn_node(node, &reason).map(|_| ()),
        };
        if let Err(err) = applied {
            // A node already banned stays banned; the stake slash still stands.
            debug!(node = %node, action = %rule.action, error = %err, "Status action not applied");
        }

        warn!(
            node = %node,
            violation = %evidence.violation_type,
            action = %rule.action,
            stake_slashed,
            evidence = %evidence.evidence_hash.short_hex(16),
            "Node slashed"
        );

        let verdict = SlashingVerdict {
            is_valid: true,
            action: Some(rule.action),
            accused_id: node.clone(),
            violation_type: evidence.violation_type,
            stake_slashed,
            evidence_hash: evidence.evidence_hash,
            verdict_hash: hash,
            processed_at: now,
            code: SlashingVerdict::PUNISHED.to_string(),
            reason,
        };

        {
            let mut state = self.state.lock();
            state.valid_slashings += 1;
            state.slashed_pool = state.slashed_pool.saturating_add(stake_slashed);
            *state
                .violations_by_type
                .entry(evidence.violation_type)
                .or_default() += 1;
            self.log_verdict(&mut state, verdict.clone());
        }

        self.events.publish(MeshEvent::NodeSlashed {
            accused: node.clone(),
            violation: evidence.violation_type.to_string(),
            action: rule.action.to_string(),
            stake_slashed,
            evidence_hash: evidence.evidence_hash,
            verdict_hash: hash,
        });
        Ok(verdict)
    }

    fn reject(
        &self,
        evidence: &SlashingEvidence,
        now: Timestamp,
        err: SlashingError,
    ) -> SlashingVerdict {
        info!(
            accused = %evidence.accused_id,
            violation = %evidence.violation_type,
            code = err.code(),
            reason = %err,
            "Evidence rejected"
        );
        let hash = verdict_hash(false, &evidence.evidence_hash, 0, now).unwrap_or(ContentHash::ZERO);
        let verdict = SlashingVerdict::rejection(
            evidence.accused_id.clone(),
            evidence.violation_type,
            evidence.evidence_hash,
            hash,
            now,
            &err,
        );
        self.log_verdict(&mut self.state.lock(), verdict.clone());
        verdict
    }

    /// Replays are answered but leave no trace in the audit log.
    fn replay(&self, evidence: &SlashingEvidence, now: Timestamp) -> SlashingVerdict {
        let err = SlashingError::Replay(evidence.evidence_hash);
        debug!(accused = %evidence.accused_id, reason = %err, "Evidence replayed");
        SlashingVerdict::rejection(
            evidence.accused_id.clone(),
            evidence.violation_type,
            evidence.evidence_hash,
            ContentHash::ZERO,
            now,
            &err,
        )
    }

    fn log_verdict(&self, state: &mut EngineState, verdict: SlashingVerdict) {
        state.total_verdicts += 1;
        state.verdicts.push_back(verdict);
        let limit = self.config.audit_log_limit;
        if limit > 0 {
            while state.verdicts.len() > limit {
                state.verdicts.pop_front();
            }
        }
    }
}

impl SlashingApi for SlashingEngine {
    fn process_evidence(&self, evidence: SlashingEvidence) -> SlashingVerdict {
        self.judge(evidence)
    }

    fn check_double_signing(
        &self,
        header_a: &BlockHeader,
        header_b: &BlockHeader,
    ) -> Option<SlashingEvidence> {
        let conflicting = header_a.height == header_b.height
            && header_a.validator_id == header_b.validator_id
            && header_a.block_hash != header_b.block_hash;
        if !conflicting {
            return None;
        }
        warn!(
            validator = %header_a.validator_id,
            height = header_a.height,
            "Conflicting headers observed"
        );
        Some(SlashingEvidence::double_sign(
            header_a.clone(),
            header_b.clone(),
            self.clock.now(),
        ))
    }

    fn get_verdicts(&self, accused: Option<&NodeId>) -> Vec<SlashingVerdict> {
        self.state
            .lock()
            .verdicts
            .iter()
            .filter(|v| accused.map_or(true, |id| &v.accused_id == id))
            .cloned()
            .collect()
    }

    fn get_evidence(&self, evidence_hash: &ContentHash) -> Option<SlashingEvidence> {
        self.state.lock().evidence_log.get(evidence_hash).cloned()
    }

    fn status(&self) -> SlashingStatus {
        let state = self.state.lock();
        SlashingStatus {
            total_evidence_processed: state.processed.len(),
            total_verdicts: state.total_verdicts,
            valid_slashings: state.valid_slashings,
            total_stake_slashed: state.slashed_pool,
            violations_by_type: state.violations_by_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
