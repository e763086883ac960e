//! Consensus Service - async shell around the Raft core
//!
//! # Architecture
//! - The [`RaftNode`] core sits behind a mutex that is never held across an
//!   await point.
//! - Outbound RPCs are sent concurrently, each bounded by `rpc_timeout`.
//!   A failed or late call is treated as a negative answer.
//! - Responses are fed back to the core, which may produce follow-up
//!   requests (log catch-up); those are sent in further rounds.

use crate::domain::{
    ConsensusConfig, ConsensusError, ConsensusResult, ConsensusStatus, Outbound, RaftNode,
    RaftRequest, RaftResponse,
};
use crate::metrics;
use crate::ports::{ConsensusApi, MembershipView};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use shared_types::{NodeId, RpcHandler, RpcTransport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Upper bound on response/follow-up rounds for one dispatch. Anything left
/// over is picked up by the next heartbeat.
const MAX_DISPATCH_ROUNDS: usize = 64;

/// Consensus Service
pub struct ConsensusService<T>
where
    T: RpcTransport<RaftRequest, RaftResponse>,
{
    id: NodeId,
    core: Mutex<RaftNode>,
    transport: Arc<T>,
    membership: Option<Arc<dyn MembershipView>>,
    rpc_timeout: Duration,
    tick_interval: Duration,
}

impl<T> ConsensusService<T>
where
    T: RpcTransport<RaftRequest, RaftResponse> + 'static,
{
    pub fn new(core: RaftNode, transport: Arc<T>, config: &ConsensusConfig) -> Self {
        Self {
            id: core.id().clone(),
            core: Mutex::new(core),
            transport,
            membership: None,
            rpc_timeout: config.rpc_timeout(),
            tick_interval: config.tick_interval(),
        }
    }

    /// Report live voters from a membership source in [`status`](Self::status).
    pub fn with_membership(mut self, membership: Arc<dyn MembershipView>) -> Self {
        self.membership = Some(membership);
        self
    }

    pub fn node_id(&self) -> &NodeId {
        &self.id
    }

    /// Read-only access to the core, for inspection.
    pub fn with_core<R>(&self, f: impl FnOnce(&RaftNode) -> R) -> R {
        f(&self.core.lock())
    }

    /// Advance one tick and deliver whatever the core wants sent.
    pub async fn tick(&self) -> ConsensusResult<()> {
        let outbound = self.core.lock().tick()?;
        self.dispatch(outbound).await;
        Ok(())
    }

    /// Start an election now instead of waiting for the timeout.
    pub async fn start_election(&self) -> ConsensusResult<()> {
        let outbound = self.core.lock().start_election()?;
        self.dispatch(outbound).await;
        Ok(())
    }

    /// Serve one inbound RPC. `None` means no reply may be sent.
    pub fn handle_rpc(&self, request: &RaftRequest) -> Option<RaftResponse> {
        let result = self.core.lock().handle_request(request);
        match result {
            Ok(response) => Some(response),
            Err(ConsensusError::Halted) => None,
            Err(e) => {
                warn!(node = %self.id, method = request.method(), error = %e, "Dropping RPC reply");
                None
            }
        }
    }

    /// Drive the tick loop until `shutdown` flips to `true` or the engine halts.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(node = %self.id, tick_ms = self.tick_interval.as_millis() as u64, "Consensus loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(node = %self.id, error = %e, "Consensus loop stopped");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(node = %self.id, "Consensus loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, mut outbound: Vec<Outbound>) {
        for _ in 0..MAX_DISPATCH_ROUNDS {
            if outbound.is_empty() {
                return;
            }

            let calls = outbound.into_iter().map(|msg| self.call(msg));
            let responses = join_all(calls).await;

            let mut follow_ups = Vec::new();
            {
                let mut core = self.core.lock();
                for response in responses.into_iter().flatten() {
                    match core.handle_response(&response) {
                        Ok(more) => follow_ups.extend(more),
                        Err(e) => {
                            debug!(node = %self.id, error = %e, "Abandoning dispatch");
                            return;
                        }
                    }
                }
            }
            outbound = follow_ups;
        }
        debug!(node = %self.id, pending = outbound.len(), "Dispatch round limit reached");
    }

    async fn call(&self, msg: Outbound) -> Option<RaftResponse> {
        let method = msg.request.method();
        match timeout(self.rpc_timeout, self.transport.send(&msg.to, msg.request)).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                metrics::record_rpc_failure(failure_kind(&e));
                debug!(node = %self.id, peer = %msg.to, method, error = %e, "RPC failed");
                None
            }
            Err(_) => {
                metrics::record_rpc_failure("timeout");
                debug!(node = %self.id, peer = %msg.to, method, "RPC timed out");
                None
            }
        }
    }

    fn live_voters(&self, core: &RaftNode) -> Option<usize> {
        let view = self.membership.as_ref()?;
        Some(1 + core.peers().iter().filter(|p| view.is_live(p)).count())
    }
}

fn failure_kind(e: &TransportError) -> &'static str {
    match e {
        TransportError::Unreachable(_) => "unreachable",
        TransportError::Timeout(_) => "timeout",
        TransportError::NoReply(_) => "no_reply",
        TransportError::Rejected { .. } => "rejected",
        TransportError::Protocol(_) => "protocol",
    }
}

#[async_trait]
impl<T> RpcHandler<RaftRequest, RaftResponse> for ConsensusService<T>
where
    T: RpcTransport<RaftRequest, RaftResponse> + 'static,
{
    async fn handle(&self, _from: &NodeId, request: RaftRequest) -> Option<RaftResponse> {
        self.handle_rpc(&request)
    }
}

#[async_trait]
impl<T> ConsensusApi for ConsensusService<T>
where
    T: RpcTransport<RaftRequest, RaftResponse> + 'static,
{
    async fn propose(&self, command: serde_json::Value) -> ConsensusResult<u64> {
        let (index, outbound) = self.core.lock().propose(command)?;
        self.dispatch(outbound).await;
        Ok(index)
    }

    fn status(&self) -> ConsensusStatus {
        let core = self.core.lock();
        core.status(self.live_voters(&core))
    }

    fn is_leader(&self) -> bool {
        self.core.lock().is_leader()
    }

    fn leader_id(&self) -> Option<NodeId> {
        self.core.lock().leader_id().cloned()
    }
}
