//! # Mesh Node
//!
//! One node's object graph. Every subsystem gets its own instance, wired to
//! the node's event bus, clock and a shared [`MeshTransport`]:
//!
//! ```text
//!                 inbound MeshRequest
//!                         │
//!                  AdmissionGate ──→ Rejected{reason}
//!                         │
//!       ┌─────────────────┼──────────────────────┐
//!       ↓                 ↓                      ↓
//!   Consensus          Gossip ──ban rumors──→ Trust Registry
//!       ↑ live view       │                      ↑
//!       └─────────────────┘                      │ ban proof
//!                                                │
//!   Slashing ──NodeSlashed(BAN)──→ governance loop
//!       │
//!       └──→ Federation registry (stake, status)
//! ```
//!
//! ## Task loops
//!
//! [`MeshNode::start`] spawns one task per loop: consensus ticks, gossip
//! probing, suspicion sweeps, governance (slashing bans into ban proofs) and
//! health gauges. [`MeshNode::shutdown`] signals the watch channel, aborts the
//! tasks and announces a graceful leave.

use crate::admission::AdmissionGate;
use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use crate::transport::MeshTransport;
use crate::wire::{GovernanceRequest, GovernanceResponse, MeshRequest, MeshResponse};
use async_trait::async_trait;
use futures::future::join_all;
use mesh_01_gossip::{GossipApi, GossipService, Member};
use mesh_02_consensus::adapters::{FileStateStore, InMemoryStateStore, KeyValueStateMachine};
use mesh_02_consensus::{ConsensusService, MembershipView, RaftNode, RaftPorts, StateStore};
use mesh_03_federation::{FederationService, NodeRegistry, PeeringContract};
use mesh_04_slashing::{
    SlashingAction, SlashingApi, SlashingEngine, SlashingEvidence, SlashingVerdict,
};
use mesh_05_trust::{
    ban_rumor, BanProof, BanReason, BanRequest, BanRumorHandler, InMemoryTrustStore,
    JsonFileTrustStore, TrustService, TrustStore,
};
use mesh_telemetry::HealthGauges;
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, MeshEvent, Subscription};
use shared_crypto::Ed25519Verifier;
use shared_types::{ContentHash, NodeId, RpcHandler, RpcTransport, Signer, TimeSource};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Consensus liveness as seen by this node's gossip layer.
struct GossipMembership<N>
where
    N: RpcTransport<mesh_01_gossip::GossipRequest, mesh_01_gossip::GossipResponse> + 'static,
{
    gossip: Arc<GossipService<N>>,
}

impl<N> MembershipView for GossipMembership<N>
where
    N: RpcTransport<mesh_01_gossip::GossipRequest, mesh_01_gossip::GossipResponse> + 'static,
{
    fn is_live(&self, peer: &NodeId) -> bool {
        self.gossip.is_alive(peer)
    }
}

/// Ban reason recorded in the proof for a slashing violation.
fn ban_reason(violation: &str) -> BanReason {
    match violation {
        "DOUBLE_SIGN" | "DOUBLE_VOTE" => BanReason::DoubleSign,
        _ => BanReason::ProtocolViolation,
    }
}

/// File-backed stores under `node.data_dir`, or in-memory ones without it.
fn open_stores(
    config: &NodeConfig,
    id: &NodeId,
) -> NodeResult<(Box<dyn StateStore>, Arc<dyn TrustStore>)> {
    let Some(dir) = &config.node.data_dir else {
        let state: Box<dyn StateStore> = Box::new(InMemoryStateStore::new());
        let trust: Arc<dyn TrustStore> = Arc::new(InMemoryTrustStore::new());
        return Ok((state, trust));
    };
    std::fs::create_dir_all(dir).map_err(|source| NodeError::DataDir {
        path: dir.clone(),
        source,
    })?;
    let state: Box<dyn StateStore> = Box::new(FileStateStore::new(dir, id));
    let trust: Arc<dyn TrustStore> = Arc::new(JsonFileTrustStore::in_dir(dir));
    Ok((state, trust))
}

/// Mesh Node
pub struct MeshNode<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    id: NodeId,
    peers: Vec<NodeId>,
    identity: Arc<dyn Signer>,
    transport: Arc<MeshTransport<T>>,
    gate: AdmissionGate,
    consensus: Arc<ConsensusService<MeshTransport<T>>>,
    gossip: Arc<GossipService<MeshTransport<T>>>,
    federation: Arc<FederationService>,
    slashing: Arc<SlashingEngine>,
    trust: Arc<TrustService>,
    state_machine: Arc<KeyValueStateMachine>,
    events: Arc<InMemoryEventBus>,
    push_timeout: Duration,
    health_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> MeshNode<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    /// Assemble every subsystem for `config`.
    ///
    /// Bootstrap peers are joined to gossip and become the consensus
    /// cluster. Peers with a key have it registered in the trust registry,
    /// and those with a stake as well are admitted as founding federation
    /// members (this node too, when `node.stake` is set).
    pub fn build(
        config: &NodeConfig,
        identity: Arc<dyn Signer>,
        transport: Arc<T>,
        clock: Arc<dyn TimeSource>,
    ) -> NodeResult<Self> {
        config.validate()?;
        let id = config.node_id();
        let peers = config.peer_ids();
        let events = Arc::new(InMemoryEventBus::new());
        let transport = Arc::new(MeshTransport::new(transport));

        let (state_store, trust_store) = open_stores(config, &id)?;

        // Federation: founding members.
        let federation = Arc::new(FederationService::from_config(
            config.federation.clone(),
            events.clone(),
            clock.clone(),
        )?);
        let now = clock.now();
        if let Some(stake) = config.node.stake {
            let contract = PeeringContract::new(
                id.clone(),
                identity.public_key(),
                stake,
                config.node.address.clone(),
                now,
            );
            federation.admit_node(&contract)?;
        }
        for peer in &config.node.peers {
            match (&peer.public_key, peer.stake) {
                (Some(key), Some(stake)) => {
                    let contract = PeeringContract::new(
                        peer.id.clone(),
                        key.clone(),
                        stake,
                        peer.address.clone(),
                        now,
                    );
                    federation.admit_node(&contract)?;
                }
                (None, Some(_)) => {
                    warn!(node = %id, peer = %peer.id, "Peer has a stake but no key; not admitted");
                }
                _ => {}
            }
        }

        // Trust: seeds from config, record from the store, then known keys.
        let trust = Arc::new(TrustService::open(
            config.trust.clone(),
            Arc::new(Ed25519Verifier),
            trust_store,
            events.clone(),
            clock.clone(),
        )?);
        let keys = std::iter::once((id.clone(), identity.public_key())).chain(
            config
                .node
                .peers
                .iter()
                .filter_map(|p| p.public_key.clone().map(|key| (p.id.clone(), key))),
        );
        for (node, key) in keys {
            let known = trust.with_registry(|r, _| r.identity(&node) == Some(&key));
            if !known {
                trust.register_identity(&node, key)?;
            }
        }

        // Gossip: bootstrap view plus ban rumors.
        let gossip = Arc::new(GossipService::new(
            id.clone(),
            config.node.address.clone(),
            config.gossip.clone(),
            transport.clone(),
            events.clone(),
            clock.clone(),
        )?);
        gossip.register_handler(Arc::new(BanRumorHandler::new(trust.clone())));
        for peer in &config.node.peers {
            gossip.join(Member::new(peer.id.clone(), peer.address.clone(), now));
        }

        // Consensus over the bootstrap cluster.
        let state_machine = Arc::new(KeyValueStateMachine::new());
        let core = RaftNode::new(
            id.clone(),
            peers.clone(),
            config.consensus.clone(),
            RaftPorts {
                store: state_store,
                commit_handler: state_machine.clone(),
                events: events.clone(),
                clock: clock.clone(),
            },
        )?;
        let consensus = Arc::new(
            ConsensusService::new(core, transport.clone(), &config.consensus).with_membership(
                Arc::new(GossipMembership {
                    gossip: gossip.clone(),
                }),
            ),
        );

        let slashing = Arc::new(
            SlashingEngine::new(
                config.slashing.clone(),
                federation.clone(),
                events.clone(),
                clock,
            )
            .with_verifier(Arc::new(Ed25519Verifier)),
        );

        let gate = AdmissionGate::new(trust.clone(), federation.clone());
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            node = %id,
            peers = peers.len(),
            durable = config.node.data_dir.is_some(),
            "Mesh node assembled"
        );

        Ok(Self {
            id,
            peers,
            identity,
            transport,
            gate,
            consensus,
            gossip,
            federation,
            slashing,
            trust,
            state_machine,
            events,
            push_timeout: Duration::from_millis(config.gossip.ping_req_timeout_ms),
            health_interval: config.health_interval(),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn consensus(&self) -> &Arc<ConsensusService<MeshTransport<T>>> {
        &self.consensus
    }

    pub fn gossip(&self) -> &Arc<GossipService<MeshTransport<T>>> {
        &self.gossip
    }

    pub fn federation(&self) -> &Arc<FederationService> {
        &self.federation
    }

    pub fn slashing(&self) -> &Arc<SlashingEngine> {
        &self.slashing
    }

    pub fn trust(&self) -> &Arc<TrustService> {
        &self.trust
    }

    pub fn state_machine(&self) -> &Arc<KeyValueStateMachine> {
        &self.state_machine
    }

    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    pub fn identity(&self) -> &dyn Signer {
        self.identity.as_ref()
    }

    // === Governance ===

    /// Judge misbehavior evidence. A BAN verdict reaches the rest of the
    /// mesh through the governance loop.
    pub fn submit_evidence(&self, evidence: SlashingEvidence) -> SlashingVerdict {
        self.slashing.process_evidence(evidence)
    }

    /// React to one bus event; the governance loop feeds every governance
    /// and trust event through here.
    pub async fn handle_event(&self, event: &MeshEvent) {
        match event {
            MeshEvent::NodeSlashed {
                accused,
                violation,
                action,
                evidence_hash,
                ..
            } if *action == SlashingAction::Ban.to_string() => {
                if let Some(proof) = self.enforce_ban(accused, violation, *evidence_hash) {
                    self.propagate_ban(&proof).await;
                }
            }
            MeshEvent::BanApplied { target, ban_id, .. } => self.expel(target, ban_id),
            _ => {}
        }
    }

    /// Issue a signed ban proof for a slashed node. `None` when the target
    /// is already banned here or this node lacks the authority to ban.
    pub fn enforce_ban(
        &self,
        target: &NodeId,
        violation: &str,
        evidence_hash: ContentHash,
    ) -> Option<BanProof> {
        if self.trust.with_registry(|r, now| r.is_banned(target, now)) {
            debug!(node = %self.id, target = %target, "Target already banned");
            return None;
        }
        if !self.trust.can_admin(&self.id) {
            info!(
                node = %self.id,
                target = %target,
                "Not authorized to issue bans; leaving it to federation admins"
            );
            return None;
        }

        let request = BanRequest::new(target.clone(), ban_reason(violation), evidence_hash);
        match self.trust.issue_ban(request, self.identity.as_ref()) {
            Ok(proof) => {
                warn!(
                    node = %self.id,
                    target = %target,
                    ban_id = %proof.ban_id.short_hex(16),
                    "Ban issued"
                );
                Some(proof)
            }
            Err(err) => {
                warn!(node = %self.id, target = %target, error = %err, "Ban not issued");
                None
            }
        }
    }

    /// Push `proof` to every known peer but its target and spread it as a
    /// gossip rumor. Returns the number of peers that accepted the push.
    pub async fn propagate_ban(&self, proof: &BanProof) -> usize {
        match ban_rumor(proof) {
            Ok(rumor) => {
                self.gossip.broadcast_rumor(rumor).await;
            }
            Err(err) => warn!(node = %self.id, error = %err, "Ban rumor not built"),
        }

        let recipients: BTreeSet<NodeId> = self
            .peers
            .iter()
            .cloned()
            .chain(self.gossip.alive_members().into_iter().map(|m| m.id))
            .filter(|peer| peer != &self.id && peer != &proof.target_node_id)
            .collect();

        let pushes = recipients.iter().map(|peer| self.push_ban(peer, proof));
        let accepted = join_all(pushes).await.into_iter().filter(|ok| *ok).count();
        info!(
            node = %self.id,
            target = %proof.target_node_id,
            recipients = recipients.len(),
            accepted,
            "Ban propagated"
        );
        accepted
    }

    async fn push_ban(&self, peer: &NodeId, proof: &BanProof) -> bool {
        let request = GovernanceRequest::BanProof(proof.clone());
        let call = RpcTransport::<GovernanceRequest, GovernanceResponse>::send(
            self.transport.as_ref(),
            peer,
            request,
        );
        match timeout(self.push_timeout, call).await {
            Ok(Ok(GovernanceResponse::BanAck { accepted, reason })) => {
                if let Some(reason) = reason {
                    debug!(node = %self.id, peer = %peer, reason = %reason, "Ban push declined");
                }
                accepted
            }
            Ok(Ok(GovernanceResponse::Rejected { reason })) => {
                debug!(node = %self.id, peer = %peer, reason = %reason, "Ban push rejected");
                false
            }
            Ok(Err(err)) => {
                debug!(node = %self.id, peer = %peer, error = %err, "Ban push failed");
                false
            }
            Err(_) => {
                debug!(node = %self.id, peer = %peer, "Ban push timed out");
                false
            }
        }
    }

    fn receive_ban(&self, proof: &BanProof) -> GovernanceResponse {
        match self.trust.process_ban_gossip(proof) {
            Ok(()) => GovernanceResponse::BanAck {
                accepted: true,
                reason: None,
            },
            Err(err) => GovernanceResponse::BanAck {
                accepted: false,
                reason: Some(err.to_string()),
            },
        }
    }

    /// Mirror an accepted ban into the federation registry.
    fn expel(&self, target: &NodeId, ban_id: &ContentHash) {
        let member = self.federation.get_node(target);
        if !member.is_some_and(|record| !record.is_banned()) {
            return;
        }
        let reason = format!("ban proof {}", ban_id.short_hex(16));
        match self.federation.ban_node(target, &reason) {
            Ok(()) => info!(node = %self.id, target = %target, "Banned member expelled"),
            Err(err) => debug!(node = %self.id, target = %target, error = %err, "Expulsion not applied"),
        }
    }

    pub fn health(&self) -> HealthGauges {
        HealthGauges {
            live_peers: self.gossip.alive_members().len() as i64,
            active_bans: self.trust.stats().active_bans as i64,
            active_members: self.federation.status().active_nodes as i64,
        }
    }

    // === Lifecycle ===

    /// Spawn the node's task loops. Calling it again while running does
    /// nothing.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        let consensus = self.consensus.clone();
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move { consensus.run(shutdown).await }));

        let gossip = self.gossip.clone();
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            gossip.run_protocol_loop(shutdown).await
        }));

        let gossip = self.gossip.clone();
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            gossip.run_suspicion_loop(shutdown).await
        }));

        // Subscribe before spawning so no event published meanwhile is lost.
        let subscription = self.events.subscribe(EventFilter::topics(vec![
            EventTopic::Governance,
            EventTopic::Trust,
        ]));
        let node = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            node.run_governance_loop(subscription, shutdown).await
        }));

        let node = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move { node.run_health_loop(shutdown).await }));

        info!(node = %self.id, tasks = tasks.len(), "Mesh node started");
    }

    async fn run_governance_loop(
        &self,
        mut events: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(&event).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!(node = %self.id, "Governance loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn run_health_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.health_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => mesh_telemetry::record_health(self.health()),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Stop every loop and tell the mesh this node is leaving.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
        }
        let notified = self.gossip.leave().await;
        info!(node = %self.id, notified, "Mesh node stopped");
    }
}

#[async_trait]
impl<T> RpcHandler<MeshRequest, MeshResponse> for MeshNode<T>
where
    T: RpcTransport<MeshRequest, MeshResponse> + 'static,
{
    async fn handle(&self, from: &NodeId, request: MeshRequest) -> Option<MeshResponse> {
        if let Err(refusal) = self.gate.check(from) {
            debug!(node = %self.id, peer = %from, method = request.method(), reason = %refusal, "Request refused");
            return Some(MeshResponse::rejected(refusal.to_string()));
        }
        match request {
            MeshRequest::Raft(request) => self.consensus.handle_rpc(&request).map(MeshResponse::Raft),
            MeshRequest::Gossip(request) => Some(MeshResponse::Gossip(
                self.gossip.handle_request(from, request).await,
            )),
            MeshRequest::Governance(GovernanceRequest::BanProof(proof)) => {
                Some(MeshResponse::Governance(self.receive_ban(&proof)))
            }
        }
    }
}

#[cfg(test)]
mod tests;
