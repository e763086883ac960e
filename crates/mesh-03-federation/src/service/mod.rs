//! Federation Service - shared, clock-driven access to the policy registry
//!
//! # Architecture
//! - [`FederationPolicy`] is plain data behind a `RwLock`; every mutation
//!   takes the write lock once and releases it before events are published.
//! - Deadlines (unbonding, proposal expiry) read time from the injected
//!   [`TimeSource`].
//! - The narrow [`NodeRegistry`] port is implemented here so enforcement code
//!   can punish nodes without seeing proposals or parameters.

use crate::domain::{
    FederationPolicy, FederationStatus, NodeRecord, NodeStatus, PeeringContract, PolicyChanges,
    PolicyConfig, PolicyProposal, PolicyResult, PolicyUpdateRecord, PolicyUpdateType,
    ProposalStatus, UnbondingState, VoteOutcome,
};
use crate::ports::NodeRegistry;
use parking_lot::RwLock;
use shared_bus::{EventPublisher, MeshEvent};
use shared_types::{ContentHash, NodeId, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Federation Service
pub struct FederationService {
    policy: RwLock<FederationPolicy>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl FederationService {
    pub fn new(
        policy: FederationPolicy,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            policy: RwLock::new(policy),
            events,
            clock,
        }
    }

    /// Build the policy from `config`, stamped with the current time.
    pub fn from_config(
        config: PolicyConfig,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> PolicyResult<Self> {
        let policy = FederationPolicy::new(config, clock.now())?;
        Ok(Self::new(policy, events, clock))
    }

    /// Read-only access to the registry.
    pub fn with_policy<R>(&self, f: impl FnOnce(&FederationPolicy) -> R) -> R {
        f(&self.policy.read())
    }

    pub fn config(&self) -> PolicyConfig {
        self.policy.read().config().clone()
    }

    pub fn status(&self) -> FederationStatus {
        self.policy.read().status()
    }

    pub fn active_nodes(&self) -> Vec<NodeRecord> {
        self.policy
            .read()
            .active_nodes()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_proposal(&self, proposal_id: &str) -> Option<PolicyProposal> {
        self.policy.read().get_proposal(proposal_id).cloned()
    }

    pub fn history(&self) -> Vec<PolicyUpdateRecord> {
        self.policy.read().history().to_vec()
    }

    /// Whether `node` is a member in good standing (ACTIVE).
    pub fn is_active_member(&self, node: &NodeId) -> bool {
        self.policy
            .read()
            .get_node(node)
            .is_some_and(NodeRecord::is_active)
    }

    // === Admission ===

    pub fn admit_node(&self, contract: &PeeringContract) -> PolicyResult<NodeRecord> {
        let now = self.clock.now();
        let record = self.policy.write().admit_node(contract, now)?;
        self.events.publish(MeshEvent::NodeAdmitted {
            node: record.node_id.clone(),
            stake: record.stake_amount,
        });
        Ok(record)
    }

    pub fn record_performance(
        &self,
        node: &NodeId,
        uptime_percent: f64,
        blocks_produced: u64,
        blocks_missed: u64,
    ) -> PolicyResult<bool> {
        let now = self.clock.now();
        self.policy.write().record_performance(
            node,
            uptime_percent,
            blocks_produced,
            blocks_missed,
            now,
        )
    }

    // === Governance ===

    pub fn propose_policy_update(
        &self,
        proposer: &NodeId,
        update_type: PolicyUpdateType,
        changes: PolicyChanges,
    ) -> PolicyResult<VoteOutcome> {
        let now = self.clock.now();
        let outcome = self
            .policy
            .write()
            .propose_policy_update(proposer, update_type, changes, now)?;
        self.publish_outcome(&outcome);
        Ok(outcome)
    }

    pub fn vote_on_proposal(
        &self,
        proposal_id: &str,
        voter: &NodeId,
        approve: bool,
    ) -> PolicyResult<VoteOutcome> {
        let now = self.clock.now();
        let outcome = self
            .policy
            .write()
            .vote_on_proposal(proposal_id, voter, approve, now)?;
        self.publish_outcome(&outcome);
        Ok(outcome)
    }

    pub fn expire_proposals(&self) -> Vec<String> {
        let now = self.clock.now();
        self.policy.write().expire_proposals(now)
    }

    fn publish_outcome(&self, outcome: &VoteOutcome) {
        if outcome.status == ProposalStatus::Passed {
            self.events.publish(MeshEvent::PolicyUpdated {
                version: outcome.config_version,
                proposal_id: outcome.proposal_id.clone(),
            });
        }
    }

    // === Unbonding ===

    pub fn start_unbonding(&self, node: &NodeId) -> PolicyResult<Duration> {
        let now = self.clock.now();
        let lock = self.policy.write().start_unbonding(node, now)?;
        self.publish_status(node, NodeStatus::Unbonding, "Voluntary exit requested");
        Ok(lock)
    }

    pub fn check_unbonding_complete(&self, node: &NodeId) -> PolicyResult<UnbondingState> {
        let now = self.clock.now();
        self.policy.read().check_unbonding_complete(node, now)
    }

    /// Remove a node whose unbonding completed. Returns the released stake.
    pub fn finalize_unbonding(&self, node: &NodeId) -> PolicyResult<u64> {
        let now = self.clock.now();
        self.policy.write().finalize_unbonding(node, now)
    }

    fn publish_status(&self, node: &NodeId, status: NodeStatus, reason: &str) {
        self.events.publish(MeshEvent::NodeStatusChanged {
            node: node.clone(),
            status: status.to_string(),
            reason: reason.to_string(),
        });
    }
}

impl NodeRegistry for FederationService {
    fn get_node(&self, node: &NodeId) -> Option<NodeRecord> {
        self.policy.read().get_node(node).cloned()
    }

    fn update_status(&self, node: &NodeId, status: NodeStatus, reason: &str) -> PolicyResult<()> {
        let now = self.clock.now();
        let transition = self
            .policy
            .write()
            .update_node_status(node, status, reason, now)?;
        if transition.from != transition.to {
            self.publish_status(node, status, reason);
        }
        Ok(())
    }

    fn ban_node(&self, node: &NodeId, reason: &str) -> PolicyResult<()> {
        let now = self.clock.now();
        self.policy.write().ban_node(node, reason, now)?;
        self.publish_status(node, NodeStatus::Banned, reason);
        Ok(())
    }

    fn warn_node(&self, node: &NodeId, reason: &str) -> PolicyResult<u32> {
        let now = self.clock.now();
        let outcome = self.policy.write().warn_node(node, reason, now)?;
        if outcome.probation {
            self.publish_status(node, NodeStatus::Probation, reason);
        }
        Ok(outcome.warnings)
    }

    fn slash_stake(
        &self,
        node: &NodeId,
        amount: u64,
        verdict_hash: ContentHash,
    ) -> PolicyResult<u64> {
        let slashed = self.policy.write().slash_stake(node, amount, verdict_hash)?;
        debug!(node = %node, slashed, "Slash recorded in federation registry");
        Ok(slashed)
    }
}
