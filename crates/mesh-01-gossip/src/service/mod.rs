//! Gossip Service - SWIM probing and dissemination
//!
//! # Protocol round
//! 1. Pick one random ALIVE or SUSPECT member and PING it (`ping_timeout`).
//! 2. On failure, ask `k` other ALIVE members to PING-REQ it concurrently
//!    (`ping_req_timeout`).
//! 3. Any ack keeps (or brings back) the member ALIVE. Otherwise an ALIVE
//!    target becomes SUSPECT.
//! 4. Piggyback pending updates and rumors on GOSSIP messages. SUSPECT
//!    members are recipients too, so an accused node hears the accusation.
//!
//! A separate sweep promotes members that stayed SUSPECT for
//! `suspect_timeout` to DEAD.
//!
//! All state sits behind one mutex, released before every send.

use crate::domain::{
    fanout, AddOutcome, DiscoveryEvent, DisseminationQueue, GossipConfig, GossipRequest,
    GossipResponse, GossipResult, Member, MemberStatus, MembershipUpdate, PeerRegistry, Rumor,
    RumorCache, StatusChange, TopologySnapshot, UpdateOutcome,
};
use crate::metrics;
use crate::ports::{GossipApi, RumorHandler};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use shared_bus::{EventPublisher, MeshEvent};
use shared_types::{NodeId, RpcHandler, RpcTransport, TimeSource};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Protocol counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GossipStats {
    pub rounds: u64,
    pub pings_sent: u64,
    pub acks_received: u64,
    pub ping_reqs_sent: u64,
    pub members_suspected: u64,
    pub members_failed: u64,
    pub updates_disseminated: u64,
    pub rumors_delivered: u64,
    pub pending_updates: usize,
    pub pending_rumors: usize,
    pub incarnation: u64,
}

/// What one probe round found out about its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub target: NodeId,
    pub alive: bool,
    /// The ack came through a PING-REQ helper.
    pub indirect: bool,
}

struct GossipState {
    registry: PeerRegistry,
    queue: DisseminationQueue,
    seen: RumorCache,
    incarnation: u64,
    left: bool,
    rng: StdRng,
    stats: GossipStats,
}

/// Gossip Service
pub struct GossipService<N>
where
    N: RpcTransport<GossipRequest, GossipResponse>,
{
    id: NodeId,
    address: String,
    config: GossipConfig,
    state: Mutex<GossipState>,
    transport: Arc<N>,
    handlers: RwLock<Vec<Arc<dyn RumorHandler>>>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl<N> GossipService<N>
where
    N: RpcTransport<GossipRequest, GossipResponse> + 'static,
{
    pub fn new(
        id: NodeId,
        address: impl Into<String>,
        config: GossipConfig,
        transport: Arc<N>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> GossipResult<Self> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = GossipState {
            registry: PeerRegistry::new(id.clone(), config.max_event_log),
            queue: DisseminationQueue::new(config.max_transmissions),
            seen: RumorCache::new(config.rumor_cache_size),
            incarnation: 0,
            left: false,
            rng,
            stats: GossipStats::default(),
        };
        Ok(Self {
            id,
            address: address.into(),
            config,
            state: Mutex::new(state),
            transport,
            handlers: RwLock::new(Vec::new()),
            events,
            clock,
        })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    pub fn register_handler(&self, handler: Arc<dyn RumorHandler>) {
        debug!(node = %self.id, topic = handler.topic(), "Registered rumor handler");
        self.handlers.write().push(handler);
    }

    // === Membership ===

    /// Add a member learned out of band (seed list, join request) and
    /// announce it to the mesh.
    pub fn join(&self, member: Member) -> AddOutcome {
        let now = self.clock.now();
        let peer = member.id.clone();
        let address = member.address.clone();
        let update = MembershipUpdate::alive(peer.clone(), member.incarnation, Some(address.clone()));

        let outcome = {
            let mut state = self.state.lock();
            let outcome = state.registry.add(member, now);
            if outcome == AddOutcome::New {
                state.queue.queue_update(update);
            }
            outcome
        };

        if outcome == AddOutcome::New {
            info!(node = %self.id, peer = %peer, address = %address, "Peer joined");
            self.events.publish(MeshEvent::PeerJoined { peer, address });
        }
        outcome
    }

    /// Queue an `alive` update about this node so peers learn its address.
    pub fn announce(&self) {
        let mut state = self.state.lock();
        let update =
            MembershipUpdate::alive(self.id.clone(), state.incarnation, Some(self.address.clone()));
        state.queue.queue_update(update);
    }

    /// Leave gracefully: tell the mesh, then stop probing.
    pub async fn leave(&self) -> usize {
        {
            let mut state = self.state.lock();
            if state.left {
                return 0;
            }
            state.left = true;
            state.incarnation += 1;
            let update = MembershipUpdate::left(self.id.clone(), state.incarnation);
            state.queue.queue_update(update);
        }
        info!(node = %self.id, "Leaving the mesh");
        self.disseminate().await
    }

    pub fn has_left(&self) -> bool {
        self.state.lock().left
    }

    pub fn incarnation(&self) -> u64 {
        self.state.lock().incarnation
    }

    pub fn member(&self, peer: &NodeId) -> Option<Member> {
        self.state.lock().registry.get(peer).cloned()
    }

    pub fn alive_members(&self) -> Vec<Member> {
        self.state.lock().registry.alive().into_iter().cloned().collect()
    }

    pub fn topology(&self) -> TopologySnapshot {
        let now = self.clock.now();
        self.state.lock().registry.topology(now)
    }

    pub fn recent_events(&self, limit: usize) -> Vec<DiscoveryEvent> {
        self.state.lock().registry.recent_events(limit)
    }

    pub fn stats(&self) -> GossipStats {
        let state = self.state.lock();
        GossipStats {
            pending_updates: state.queue.pending_updates(),
            pending_rumors: state.queue.pending_rumors(),
            incarnation: state.incarnation,
            ..state.stats.clone()
        }
    }

    // === Failure detection ===

    /// One SWIM round followed by dissemination. `None` when there was no
    /// member to probe or this node has left.
    pub async fn probe_round(&self) -> Option<ProbeOutcome> {
        let target = {
            let mut state = self.state.lock();
            if state.left {
                return None;
            }
            state.stats.rounds += 1;
            let GossipState { registry, rng, .. } = &mut *state;
            registry.random_reachable(1, &HashSet::new(), rng).pop()
        };

        let Some(target) = target else {
            self.disseminate().await;
            return None;
        };

        let direct = self.direct_ping(&target.id).await;
        let alive = direct || self.indirect_ping(&target.id).await;
        let result = match (direct, alive) {
            (true, _) => "direct",
            (false, true) => "indirect",
            (false, false) => "failed",
        };
        metrics::record_probe(result);

        self.record_probe_result(&target.id, alive);
        self.disseminate().await;

        Some(ProbeOutcome {
            target: target.id,
            alive,
            indirect: !direct && alive,
        })
    }

    /// Promote members SUSPECT for longer than `suspect_timeout` to DEAD.
    pub fn sweep_suspects(&self) -> Vec<NodeId> {
        let now = self.clock.now();
        let limit = self.config.suspect_timeout();

        let failed: Vec<(NodeId, u64)> = {
            let mut state = self.state.lock();
            let expired: Vec<NodeId> = state
                .registry
                .suspects()
                .into_iter()
                .filter(|m| now.duration_since(m.status_changed) > limit)
                .map(|m| m.id.clone())
                .collect();

            let mut failed = Vec::new();
            for peer in expired {
                if let Some(change) = state.registry.set_status(&peer, MemberStatus::Dead, now) {
                    state
                        .queue
                        .queue_update(MembershipUpdate::dead(peer.clone(), change.incarnation));
                    state.stats.members_failed += 1;
                    failed.push((peer, change.incarnation));
                }
            }
            failed
        };

        for (peer, incarnation) in &failed {
            warn!(node = %self.id, peer = %peer, incarnation, "Peer declared dead after suspicion timeout");
            metrics::record_failed();
            self.events.publish(MeshEvent::PeerFailed {
                peer: peer.clone(),
                incarnation: *incarnation,
            });
        }
        failed.into_iter().map(|(peer, _)| peer).collect()
    }

    async fn direct_ping(&self, target: &NodeId) -> bool {
        self.state.lock().stats.pings_sent += 1;
        let ping = GossipRequest::Ping {
            from: self.id.clone(),
        };
        match timeout(self.config.ping_timeout(), self.transport.send(target, ping)).await {
            Ok(Ok(GossipResponse::Pong { .. })) => {
                self.state.lock().stats.acks_received += 1;
                true
            }
            Ok(Ok(other)) => {
                debug!(node = %self.id, peer = %target, response = ?other, "Unexpected reply to PING");
                false
            }
            Ok(Err(e)) => {
                debug!(node = %self.id, peer = %target, error = %e, "PING failed");
                false
            }
            Err(_) => {
                debug!(node = %self.id, peer = %target, "PING timed out");
                false
            }
        }
    }

    async fn indirect_ping(&self, target: &NodeId) -> bool {
        let helpers = {
            let mut state = self.state.lock();
            let exclude: HashSet<NodeId> = [target.clone()].into_iter().collect();
            let GossipState { registry, rng, .. } = &mut *state;
            let helpers = registry.random_alive(self.config.ping_req_members, &exclude, rng);
            state.stats.ping_reqs_sent += helpers.len() as u64;
            helpers
        };
        if helpers.is_empty() {
            return false;
        }

        let calls = helpers.iter().map(|helper| {
            let request = GossipRequest::PingReq {
                target: target.clone(),
                from: self.id.clone(),
            };
            timeout(
                self.config.ping_req_timeout(),
                self.transport.send(&helper.id, request),
            )
        });
        join_all(calls)
            .await
            .into_iter()
            .any(|r| matches!(r, Ok(Ok(GossipResponse::PingReqAck { alive: true }))))
    }

    fn record_probe_result(&self, target: &NodeId, alive: bool) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let address = state.registry.get(target).map(|m| m.address.clone());

        if alive {
            let change = state.registry.set_status(target, MemberStatus::Alive, now);
            if let Some(change) = change {
                state.queue.queue_update(MembershipUpdate::alive(
                    target.clone(),
                    change.incarnation,
                    address,
                ));
                drop(state);
                info!(node = %self.id, peer = %target, from = %change.from, "Peer recovered");
                self.events.publish(MeshEvent::PeerRecovered {
                    peer: target.clone(),
                    incarnation: change.incarnation,
                });
            }
            return;
        }

        if !state.registry.is_alive(target) {
            return;
        }
        if let Some(change) = state.registry.set_status(target, MemberStatus::Suspect, now) {
            state
                .queue
                .queue_update(MembershipUpdate::suspect(target.clone(), change.incarnation));
            state.stats.members_suspected += 1;
            drop(state);
            warn!(node = %self.id, peer = %target, incarnation = change.incarnation, "Peer suspected");
            metrics::record_suspected();
            self.events.publish(MeshEvent::PeerSuspected {
                peer: target.clone(),
                incarnation: change.incarnation,
            });
        }
    }

    // === Dissemination ===

    /// Send pending updates and rumors to `fanout` random ALIVE or SUSPECT
    /// members. Returns the number of recipients.
    pub async fn disseminate(&self) -> usize {
        let (recipients, batch) = {
            let mut state = self.state.lock();
            if state.queue.is_empty() {
                return 0;
            }
            let GossipState { registry, rng, .. } = &mut *state;
            let alive = registry.alive().len();
            let count = fanout(self.config.dissemination_multiplier, alive);
            let recipients = registry.random_reachable(count, &HashSet::new(), rng);
            if recipients.is_empty() {
                return 0;
            }
            let batch = state.queue.next_batch();
            state.stats.updates_disseminated += (batch.len() * recipients.len()) as u64;
            (recipients, batch)
        };

        metrics::record_disseminated((batch.len() * recipients.len()) as u64);
        debug!(
            node = %self.id,
            updates = batch.updates.len(),
            rumors = batch.rumors.len(),
            recipients = recipients.len(),
            "Disseminating"
        );

        let request = GossipRequest::Gossip {
            updates: batch.updates,
            rumors: batch.rumors,
        };
        let sends = recipients.iter().map(|member| {
            timeout(
                self.config.ping_timeout(),
                self.transport.send(&member.id, request.clone()),
            )
        });
        join_all(sends).await;
        recipients.len()
    }

    /// Spread `rumor` now.
    pub async fn broadcast_rumor(&self, rumor: Rumor) -> usize {
        {
            let mut state = self.state.lock();
            state.seen.insert(&rumor.id);
            state.queue.queue_rumor(rumor);
        }
        self.disseminate().await
    }

    // === Inbound ===

    pub async fn handle_request(&self, from: &NodeId, request: GossipRequest) -> GossipResponse {
        match request {
            GossipRequest::Ping { from: sender } => {
                let now = self.clock.now();
                self.state.lock().registry.mark_seen(&sender, now);
                GossipResponse::Pong {
                    from: self.id.clone(),
                }
            }
            GossipRequest::PingReq { target, .. } => {
                let alive = self.direct_ping(&target).await;
                GossipResponse::PingReqAck { alive }
            }
            GossipRequest::Gossip { updates, rumors } => {
                self.apply_updates(updates);
                self.receive_rumors(from, rumors);
                GossipResponse::Ack
            }
        }
    }

    fn apply_updates(&self, updates: Vec<MembershipUpdate>) {
        let now = self.clock.now();
        let mut events = Vec::new();
        let mut refuted = None;

        {
            let mut state = self.state.lock();
            for update in updates {
                if update.peer_id == self.id {
                    if update.is_accusation() && update.incarnation >= state.incarnation && !state.left {
                        state.incarnation = update.incarnation + 1;
                        let alive = MembershipUpdate::alive(
                            self.id.clone(),
                            state.incarnation,
                            Some(self.address.clone()),
                        );
                        state.queue.queue_update(alive);
                        refuted = Some((update.kind, state.incarnation));
                    }
                    continue;
                }

                match state.registry.apply_update(&update, now) {
                    UpdateOutcome::Ignored => continue,
                    UpdateOutcome::Added => events.push(MeshEvent::PeerJoined {
                        peer: update.peer_id.clone(),
                        address: update.address.clone().unwrap_or_default(),
                    }),
                    UpdateOutcome::Refreshed => {}
                    UpdateOutcome::Changed(change) => {
                        events.push(status_event(&update.peer_id, change));
                    }
                }
                // Accepted news keeps spreading.
                state.queue.queue_update(update);
            }
        }

        if let Some((kind, incarnation)) = refuted {
            warn!(node = %self.id, accusation = ?kind, incarnation, "Refuting accusation about self");
        }
        for event in events {
            debug!(node = %self.id, event = ?event, "Membership change from gossip");
            self.events.publish(event);
        }
    }

    fn receive_rumors(&self, from: &NodeId, rumors: Vec<Rumor>) {
        let fresh: Vec<Rumor> = {
            let mut state = self.state.lock();
            rumors.into_iter().filter(|r| state.seen.insert(&r.id)).collect()
        };

        for rumor in fresh {
            let handlers: Vec<Arc<dyn RumorHandler>> = self
                .handlers
                .read()
                .iter()
                .filter(|h| h.topic() == rumor.topic)
                .cloned()
                .collect();

            let mut accepted = false;
            for handler in &handlers {
                accepted |= handler.on_rumor(from, &rumor);
            }
            debug!(node = %self.id, rumor = %rumor.id, topic = %rumor.topic, accepted, "Received rumor");

            if accepted {
                let mut state = self.state.lock();
                state.stats.rumors_delivered += 1;
                state.queue.queue_rumor(rumor);
            }
        }
    }

    // === Loops ===

    /// Probe every `protocol_period` until `shutdown` flips to `true`.
    pub async fn run_protocol_loop(&self, shutdown: watch::Receiver<bool>) {
        let period = self.config.protocol_period();
        self.run_every(period, shutdown, "protocol", || async {
            self.probe_round().await;
        })
        .await;
    }

    /// Sweep suspects every `suspicion_check_interval` until shutdown.
    pub async fn run_suspicion_loop(&self, shutdown: watch::Receiver<bool>) {
        let period = self.config.suspicion_check_interval();
        self.run_every(period, shutdown, "suspicion", || async {
            self.sweep_suspects();
        })
        .await;
    }

    async fn run_every<F, Fut>(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
        name: &'static str,
        mut task: F,
    ) where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(node = %self.id, loop_name = name, period_ms = period.as_millis() as u64, "Gossip loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => task().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(node = %self.id, loop_name = name, "Gossip loop shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn status_event(peer: &NodeId, change: StatusChange) -> MeshEvent {
    let peer = peer.clone();
    let incarnation = change.incarnation;
    match change.to {
        MemberStatus::Alive => MeshEvent::PeerRecovered { peer, incarnation },
        MemberStatus::Suspect => MeshEvent::PeerSuspected { peer, incarnation },
        MemberStatus::Dead => MeshEvent::PeerFailed { peer, incarnation },
        MemberStatus::Left => MeshEvent::PeerLeft { peer },
    }
}

#[async_trait]
impl<N> RpcHandler<GossipRequest, GossipResponse> for GossipService<N>
where
    N: RpcTransport<GossipRequest, GossipResponse> + 'static,
{
    async fn handle(&self, from: &NodeId, request: GossipRequest) -> Option<GossipResponse> {
        Some(self.handle_request(from, request).await)
    }
}

#[async_trait]
impl<N> GossipApi for GossipService<N>
where
    N: RpcTransport<GossipRequest, GossipResponse> + 'static,
{
    async fn broadcast_rumor(&self, rumor: Rumor) -> usize {
        GossipService::broadcast_rumor(self, rumor).await
    }

    fn members(&self) -> Vec<Member> {
        self.state.lock().registry.all().into_iter().cloned().collect()
    }

    fn is_alive(&self, peer: &NodeId) -> bool {
        self.state.lock().registry.is_alive(peer)
    }

    fn membership_hash(&self) -> String {
        self.state.lock().registry.membership_hash()
    }
}
