//! # Federation Policy
//!
//! The canonical node-status registry plus quorum-voted governance.
//!
//! All methods are synchronous and take the current time explicitly; the
//! service layer supplies it from a `TimeSource`.
//!
//! ## Status Machine
//!
//! ```text
//!   admit ──→ ACTIVE ──warnings──→ PROBATION
//!               │  └──slash────→ SLASHED
//!               ├──unbond──→ UNBONDING ──period elapsed──→ (record removed)
//!               └──ban────→ BANNED   (terminal)
//! ```

use super::config::{PolicyChanges, PolicyConfig};
use super::contract::{validate_endpoint, PeeringContract};
use super::error::{PolicyError, PolicyResult};
use super::node::{NodeRecord, NodeStatus};
use super::proposal::{
    PolicyProposal, PolicyUpdateRecord, PolicyUpdateType, ProposalStatus, VoteOutcome,
};
use serde::Serialize;
use shared_types::{ContentHash, NodeId, SignatureVerifier, Timestamp};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};


/// A status change that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: NodeStatus,
    pub to: NodeStatus,
}

/// Result of `warn_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningOutcome {
    pub warnings: u32,
    /// The warning crossed the threshold and moved the node to PROBATION.
    pub probation: bool,
}

/// Result of `check_unbonding_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbondingState {
    Complete,
    Remaining(Duration),
}

/// Aggregate view for operators.
#[derive(Debug, Clone, PartialEq)]
pub struct FederationStatus {
    pub config_version: u64,
    pub config_hash: ContentHash,
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub pending_proposals: usize,
    pub nodes_by_status: BTreeMap<NodeStatus, usize>,
}

#[derive(Serialize)]
struct ProposalSeed<'a> {
    proposer: &'a NodeId,
    sequence: u64,
    changes: &'a PolicyChanges,
    created_at: Timestamp,
}

pub struct FederationPolicy {
    config: PolicyConfig,
    nodes: HashMap<NodeId, NodeRecord>,
    proposals: HashMap<String, PolicyProposal>,
    history: Vec<PolicyUpdateRecord>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    proposal_seq: u64,
}

impl FederationPolicy {
    /// Validate `config`, stamp it and start with an empty registry.
    pub fn new(mut config: PolicyConfig, now: Timestamp) -> PolicyResult<Self> {
        config.validate()?;
        config.version = config.version.max(1);
        config.last_updated = now;
        config.update_hash = config.compute_hash()?;

        info!(
            version = config.version,
            hash = %config.update_hash.short_hex(16),
            "Federation policy initialized"
        );

        Ok(Self {
            config,
            nodes: HashMap::new(),
            proposals: HashMap::new(),
            history: Vec::new(),
            verifier: None,
            proposal_seq: 0,
        })
    }

    /// Require peering contracts to carry a valid signature.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn get_node(&self, node: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    pub fn active_nodes(&self) -> Vec<&NodeRecord> {
        self.nodes.values().filter(|n| n.is_active()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_active()).count()
    }

    pub fn get_proposal(&self, id: &str) -> Option<&PolicyProposal> {
        self.proposals.get(id)
    }

    pub fn history(&self) -> &[PolicyUpdateRecord] {
        &self.history
    }

    /// Votes a policy proposal needs among the current ACTIVE set.
    pub fn required_policy_votes(&self) -> usize {
        self.config.policy_quorum.required(self.active_count())
    }

    /// Votes an ordinary decision needs among the current ACTIVE set.
    pub fn required_tx_votes(&self) -> usize {
        self.config.tx_quorum.required(self.active_count())
    }

    pub fn status(&self) -> FederationStatus {
        let mut nodes_by_status: BTreeMap<NodeStatus, usize> =
            NodeStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for node in self.nodes.values() {
            *nodes_by_status.entry(node.status).or_insert(0) += 1;
        }

        FederationStatus {
            config_version: self.config.version,
            config_hash: self.config.update_hash,
            total_nodes: self.nodes.len(),
            active_nodes: self.active_count(),
            pending_proposals: self
                .proposals
                .values()
                .filter(|p| p.status.is_open())
                .count(),
            nodes_by_status,
        }
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// Check a contract against the registry and current parameters.
    pub fn validate_contract(&self, contract: &PeeringContract) -> PolicyResult<()> {
        if self.nodes.contains_key(&contract.node_id) {
            return Err(PolicyError::DuplicateNode(contract.node_id.clone()));
        }

        if let Some(existing) = self
            .nodes
            .values()
            .find(|n| n.public_key == contract.public_key)
        {
            return Err(PolicyError::DuplicatePublicKey {
                existing: existing.node_id.clone(),
            });
        }

        if contract.stake_amount < self.config.min_stake {
            return Err(PolicyError::InsufficientStake {
                offered: contract.stake_amount,
                required: self.config.min_stake,
            });
        }

        validate_endpoint(&contract.endpoint)?;

        if let Some(verifier) = &self.verifier {
            let payload = contract.signing_payload()?;
            if !verifier.verify(&contract.public_key, &payload, &contract.signature) {
                return Err(PolicyError::InvalidSignature(contract.node_id.clone()));
            }
        }

        Ok(())
    }

    /// Admit a node; the new record is ACTIVE.
    pub fn admit_node(
        &mut self,
        contract: &PeeringContract,
        now: Timestamp,
    ) -> PolicyResult<NodeRecord> {
        if let Err(e) = self.validate_contract(contract) {
            warn!(node = %contract.node_id, reason = %e, "Rejected peering contract");
            return Err(e);
        }

        let record = NodeRecord::admitted(contract, now);
        self.nodes.insert(contract.node_id.clone(), record.clone());

        info!(
            node = %contract.node_id,
            stake = contract.stake_amount,
            "Admitted node to federation"
        );
        Ok(record)
    }

    // =========================================================================
    // STATUS MANAGEMENT
    // =========================================================================

    /// Move a node to `status`. Nothing leaves BANNED.
    pub fn update_node_status(
        &mut self,
        node: &NodeId,
        status: NodeStatus,
        reason: &str,
        now: Timestamp,
    ) -> PolicyResult<StatusTransition> {
        let record = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;

        let from = record.status;
        if from.is_terminal() && status != from {
            return Err(PolicyError::NodeBanned(node.clone()));
        }

        record.status = status;
        record.status_reason = reason.to_string();
        record.unbonding_started = match status {
            NodeStatus::Unbonding => Some(now),
            _ => None,
        };

        info!(node = %node, from = %from, to = %status, reason, "Node status changed");
        Ok(StatusTransition { from, to: status })
    }

    /// Count a warning; the threshold-th warning puts an ACTIVE node on probation.
    pub fn warn_node(
        &mut self,
        node: &NodeId,
        reason: &str,
        now: Timestamp,
    ) -> PolicyResult<WarningOutcome> {
        let (warnings, status) = {
            let record = self
                .nodes
                .get_mut(node)
                .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;
            record.warnings = record.warnings.saturating_add(1);
            (record.warnings, record.status)
        };
        warn!(node = %node, warnings, reason, "Warning issued");

        let probation =
            warnings >= self.config.warning_threshold && status == NodeStatus::Active;
        if probation {
            let why = format!("{warnings} warnings ({reason})");
            self.update_node_status(node, NodeStatus::Probation, &why, now)?;
        }

        Ok(WarningOutcome {
            warnings,
            probation,
        })
    }

    pub fn ban_node(&mut self, node: &NodeId, reason: &str, now: Timestamp) -> PolicyResult<()> {
        match self.nodes.get(node) {
            None => return Err(PolicyError::NodeNotFound(node.clone())),
            Some(record) if record.is_banned() => {
                return Err(PolicyError::AlreadyBanned(node.clone()))
            }
            Some(_) => {}
        }

        self.update_node_status(node, NodeStatus::Banned, reason, now)?;
        error!(node = %node, reason, "Node banned");
        Ok(())
    }

    /// Remove up to `amount` stake and record the verdict. Returns what was
    /// actually removed.
    pub fn slash_stake(
        &mut self,
        node: &NodeId,
        amount: u64,
        verdict_hash: ContentHash,
    ) -> PolicyResult<u64> {
        let record = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;

        let slashed = amount.min(record.stake_amount);
        record.stake_amount -= slashed;
        record.stake_slashed = record.stake_slashed.saturating_add(slashed);
        record.slashing_events.push(verdict_hash);

        warn!(
            node = %node,
            slashed,
            remaining = record.stake_amount,
            verdict = %verdict_hash.short_hex(16),
            "Stake slashed"
        );
        Ok(slashed)
    }

    /// Store a performance report. Returns whether uptime meets the minimum.
    pub fn record_performance(
        &mut self,
        node: &NodeId,
        uptime_percent: f64,
        blocks_produced: u64,
        blocks_missed: u64,
        now: Timestamp,
    ) -> PolicyResult<bool> {
        if !(0.0..=100.0).contains(&uptime_percent) {
            return Err(PolicyError::InvalidPerformance(format!(
                "uptime {uptime_percent} outside 0-100"
            )));
        }
        let record = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;

        record.uptime_percent = uptime_percent;
        record.blocks_produced = blocks_produced;
        record.blocks_missed = blocks_missed;
        record.last_seen = now;

        Ok(uptime_percent >= self.config.min_uptime_percent)
    }

    // =========================================================================
    // UNBONDING
    // =========================================================================

    /// Begin a voluntary exit. Returns how long the stake stays locked.
    pub fn start_unbonding(&mut self, node: &NodeId, now: Timestamp) -> PolicyResult<Duration> {
        match self.nodes.get(node).map(|r| r.status) {
            None => return Err(PolicyError::NodeNotFound(node.clone())),
            Some(NodeStatus::Banned) => return Err(PolicyError::NodeBanned(node.clone())),
            Some(NodeStatus::Unbonding) => {
                return Err(PolicyError::AlreadyUnbonding(node.clone()))
            }
            Some(_) => {}
        }

        self.update_node_status(node, NodeStatus::Unbonding, "Voluntary exit requested", now)?;
        Ok(self.config.unbonding_period())
    }

    /// Pure time check against the unbonding period.
    pub fn check_unbonding_complete(
        &self,
        node: &NodeId,
        now: Timestamp,
    ) -> PolicyResult<UnbondingState> {
        let record = self
            .nodes
            .get(node)
            .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;

        let started = match (record.status, record.unbonding_started) {
            (NodeStatus::Unbonding, Some(started)) => started,
            _ => return Err(PolicyError::NotUnbonding(node.clone())),
        };

        let elapsed = now.duration_since(started);
        let period = self.config.unbonding_period();
        if elapsed >= period {
            Ok(UnbondingState::Complete)
        } else {
            Ok(UnbondingState::Remaining(period - elapsed))
        }
    }

    /// Drop a node whose unbonding has completed and return its stake.
    pub fn finalize_unbonding(&mut self, node: &NodeId, now: Timestamp) -> PolicyResult<u64> {
        if let UnbondingState::Remaining(remaining) = self.check_unbonding_complete(node, now)? {
            return Err(PolicyError::UnbondingIncomplete {
                node: node.clone(),
                remaining,
            });
        }

        let record = self
            .nodes
            .remove(node)
            .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;

        info!(node = %node, released = record.stake_amount, "Unbonding finalized");
        Ok(record.stake_amount)
    }

    // =========================================================================
    // GOVERNANCE
    // =========================================================================

    /// Open a proposal. The proposer votes for it.
    ///
    /// The changes are validated against the config they would produce, so a
    /// proposal that would break an invariant never exists.
    pub fn propose_policy_update(
        &mut self,
        proposer: &NodeId,
        update_type: PolicyUpdateType,
        changes: PolicyChanges,
        now: Timestamp,
    ) -> PolicyResult<VoteOutcome> {
        self.require_active(proposer)?;

        if changes.is_empty() {
            return Err(PolicyError::InvalidProposal("no changes proposed".into()));
        }
        self.config
            .with_changes(&changes)
            .validate()
            .map_err(|e| PolicyError::InvalidProposal(e.to_string()))?;

        self.proposal_seq += 1;
        let seed = ProposalSeed {
            proposer,
            sequence: self.proposal_seq,
            changes: &changes,
            created_at: now,
        };
        let proposal_id = shared_crypto::hash_canonical(&seed)?.short_hex(16);

        let mut votes_for = BTreeSet::new();
        votes_for.insert(proposer.clone());

        let proposal = PolicyProposal {
            proposal_id: proposal_id.clone(),
            proposer: proposer.clone(),
            update_type,
            changes,
            votes_for,
            votes_against: BTreeSet::new(),
            status: ProposalStatus::Pending,
            created_at: now,
            expires_at: now.saturating_add(self.config.proposal_ttl()),
        };
        self.proposals.insert(proposal_id.clone(), proposal);

        info!(
            proposal = %proposal_id,
            proposer = %proposer,
            ?update_type,
            "Policy proposal created"
        );
        self.tally(&proposal_id, now)
    }

    /// Cast or switch a vote, then re-tally.
    pub fn vote_on_proposal(
        &mut self,
        proposal_id: &str,
        voter: &NodeId,
        approve: bool,
        now: Timestamp,
    ) -> PolicyResult<VoteOutcome> {
        let proposal = self
            .proposals
            .get_mut(proposal_id)
            .ok_or_else(|| PolicyError::ProposalNotFound(proposal_id.to_string()))?;

        if proposal.status.is_open() && proposal.is_expired(now) {
            proposal.status = ProposalStatus::Expired;
            info!(proposal = %proposal_id, "Policy proposal expired");
        }
        if !proposal.status.is_open() {
            return Err(PolicyError::ProposalClosed {
                id: proposal_id.to_string(),
                status: proposal.status,
            });
        }

        self.require_active(voter)?;

        if let Some(proposal) = self.proposals.get_mut(proposal_id) {
            proposal.record_vote(voter, approve);
        }
        self.tally(proposal_id, now)
    }

    /// Close every open proposal past its deadline. Returns their ids.
    pub fn expire_proposals(&mut self, now: Timestamp) -> Vec<String> {
        let mut expired = Vec::new();
        for proposal in self.proposals.values_mut() {
            if proposal.status.is_open() && proposal.is_expired(now) {
                proposal.status = ProposalStatus::Expired;
                expired.push(proposal.proposal_id.clone());
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Policy proposals expired");
        }
        expired
    }

    fn require_active(&self, node: &NodeId) -> PolicyResult<()> {
        let record = self
            .nodes
            .get(node)
            .ok_or_else(|| PolicyError::NodeNotFound(node.clone()))?;
        if !record.is_active() {
            return Err(PolicyError::NotActive {
                node: node.clone(),
                status: record.status,
            });
        }
        Ok(())
    }

    /// Decide an open proposal against the current ACTIVE count.
    fn tally(&mut self, proposal_id: &str, now: Timestamp) -> PolicyResult<VoteOutcome> {
        let active = self.active_count();
        let required = self.config.policy_quorum.required(active);

        let (votes_for, votes_against, status) = {
            let proposal = self
                .proposals
                .get(proposal_id)
                .ok_or_else(|| PolicyError::ProposalNotFound(proposal_id.to_string()))?;
            (
                proposal.votes_for.len(),
                proposal.votes_against.len(),
                proposal.status,
            )
        };

        let mut status = status;
        if status.is_open() && active > 0 {
            if votes_for >= required {
                status = self.apply_proposal(proposal_id, now)?;
            } else if votes_against > active - required {
                status = ProposalStatus::Rejected;
                info!(proposal = %proposal_id, votes_against, active, "Policy proposal rejected");
            }
            if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                proposal.status = status;
            }
        }

        Ok(VoteOutcome {
            proposal_id: proposal_id.to_string(),
            status,
            votes_for,
            votes_against,
            required,
            config_version: self.config.version,
        })
    }

    /// Apply a passing proposal. The config may have moved since the proposal
    /// was opened; if the result no longer validates the proposal is rejected.
    fn apply_proposal(
        &mut self,
        proposal_id: &str,
        now: Timestamp,
    ) -> PolicyResult<ProposalStatus> {
        let (update_type, changes) = match self.proposals.get(proposal_id) {
            Some(p) => (p.update_type, p.changes.clone()),
            None => return Err(PolicyError::ProposalNotFound(proposal_id.to_string())),
        };

        let mut next = self.config.with_changes(&changes);
        if let Err(e) = next.validate() {
            warn!(proposal = %proposal_id, reason = %e, "Passing proposal no longer valid");
            return Ok(ProposalStatus::Rejected);
        }
        next.version = self.config.version + 1;
        next.last_updated = now;
        next.update_hash = next.compute_hash()?;
        self.config = next;

        self.history.push(PolicyUpdateRecord {
            proposal_id: proposal_id.to_string(),
            update_type,
            changes,
            new_version: self.config.version,
            config_hash: self.config.update_hash,
            applied_at: now,
        });

        info!(
            proposal = %proposal_id,
            version = self.config.version,
            hash = %self.config.update_hash.short_hex(16),
            "Policy updated"
        );
        Ok(ProposalStatus::Passed)
    }
}
