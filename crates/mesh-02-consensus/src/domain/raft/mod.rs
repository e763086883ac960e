//! # Raft State Machine
//!
//! Synchronous core of the consensus engine. It never performs I/O other than
//! the durable [`StateStore`] write; every message it wants sent is returned
//! as an [`Outbound`] for the service to deliver.
//!
//! ```text
//!            timeout                majority
//! FOLLOWER ───────────→ CANDIDATE ───────────→ LEADER
//!    ↑                      │                     │
//!    └──────────────────────┴─────────────────────┘
//!              higher term seen (any role)
//! ```
//!
//! ## Durability
//!
//! Term, vote and log changes are saved before the method that made them
//! returns. If a save fails the engine halts: the pending call returns
//! [`ConsensusError::Persistence`] (so no reply is sent) and every later call
//! returns [`ConsensusError::Halted`].

use super::config::ConsensusConfig;
use super::error::{ConsensusError, ConsensusResult};
use super::log::{LogEntry, RaftLog};
use super::messages::{
    AppendEntriesRequest, AppendEntriesResponse, Outbound, RaftRequest, RaftResponse,
    RequestVoteRequest, RequestVoteResponse,
};
use super::state::{quorum_size, ConsensusStatus, PersistentState, Role};
use crate::metrics;
use crate::ports::{CommitHandler, StateStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_bus::{EventPublisher, MeshEvent};
use shared_types::{NodeId, TimeSource};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Collaborators the engine drives.
pub struct RaftPorts {
    pub store: Box<dyn StateStore>,
    pub commit_handler: Arc<dyn CommitHandler>,
    pub events: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn TimeSource>,
}

pub struct RaftNode {
    id: NodeId,
    peers: Vec<NodeId>,
    config: ConsensusConfig,
    persistent: PersistentState,
    ports: RaftPorts,

    role: Role,
    leader_id: Option<NodeId>,
    commit_index: u64,
    last_applied: u64,

    // Leader only
    next_index: HashMap<NodeId, u64>,
    match_index: HashMap<NodeId, u64>,

    // Candidate only
    votes_received: HashSet<NodeId>,

    election_elapsed: u32,
    election_timeout: u32,
    heartbeat_elapsed: u32,
    rng: StdRng,
    halted: bool,
}

impl RaftNode {
    /// Build an engine for `id` with the static voter set `peers`, restoring
    /// term, vote and log from the store.
    pub fn new(
        id: NodeId,
        peers: Vec<NodeId>,
        config: ConsensusConfig,
        ports: RaftPorts,
    ) -> ConsensusResult<Self> {
        config.validate()?;

        let mut unique = HashSet::new();
        let peers: Vec<NodeId> = peers
            .into_iter()
            .filter(|p| p != &id && unique.insert(p.clone()))
            .collect();

        let persistent = ports
            .store
            .load()
            .map_err(ConsensusError::Persistence)?
            .unwrap_or_default();

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ seed_salt(&id)),
            None => StdRng::from_entropy(),
        };

        if persistent.current_term > 0 || !persistent.log.is_empty() {
            info!(
                node = %id,
                term = persistent.current_term,
                log_length = persistent.log.len(),
                "Restored consensus state"
            );
        }

        let mut node = Self {
            id,
            peers,
            config,
            persistent,
            ports,
            role: Role::Follower,
            leader_id: None,
            commit_index: 0,
            last_applied: 0,
            next_index: HashMap::new(),
            match_index: HashMap::new(),
            votes_received: HashSet::new(),
            election_elapsed: 0,
            election_timeout: 0,
            heartbeat_elapsed: 0,
            rng,
            halted: false,
        };
        node.reset_election_timer();
        Ok(node)
    }

    // === Accessors ===

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn peers(&self) -> &[NodeId] {
        &self.peers
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub fn current_term(&self) -> u64 {
        self.persistent.current_term
    }

    pub fn voted_for(&self) -> Option<&NodeId> {
        self.persistent.voted_for.as_ref()
    }

    pub fn leader_id(&self) -> Option<&NodeId> {
        self.leader_id.as_ref()
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    pub fn log(&self) -> &RaftLog {
        &self.persistent.log
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn cluster_size(&self) -> usize {
        self.peers.len() + 1
    }

    pub fn quorum_size(&self) -> usize {
        quorum_size(self.cluster_size())
    }

    pub fn status(&self, live_voters: Option<usize>) -> ConsensusStatus {
        ConsensusStatus {
            node_id: self.id.clone(),
            role: self.role,
            term: self.persistent.current_term,
            leader: self.leader_id.clone(),
            voted_for: self.persistent.voted_for.clone(),
            commit_index: self.commit_index,
            last_applied: self.last_applied,
            log_length: self.persistent.log.last_index(),
            cluster_size: self.cluster_size(),
            quorum_size: self.quorum_size(),
            halted: self.halted,
            live_voters,
        }
    }

    // === Driving operations ===

    /// Advance logical time by one tick.
    pub fn tick(&mut self) -> ConsensusResult<Vec<Outbound>> {
        self.ensure_running()?;

        if self.role == Role::Leader {
            self.heartbeat_elapsed += 1;
            if self.heartbeat_elapsed >= self.config.heartbeat_interval_ticks {
                return Ok(self.broadcast_append());
            }
            return Ok(Vec::new());
        }

        self.election_elapsed += 1;
        if self.election_elapsed >= self.election_timeout {
            return self.start_election();
        }
        Ok(Vec::new())
    }

    /// Become a candidate for the next term and solicit votes.
    pub fn start_election(&mut self) -> ConsensusResult<Vec<Outbound>> {
        self.ensure_running()?;

        self.persistent.current_term += 1;
        self.persistent.voted_for = Some(self.id.clone());
        self.persist()?;

        self.set_role(Role::Candidate);
        self.leader_id = None;
        self.votes_received.clear();
        self.votes_received.insert(self.id.clone());
        self.reset_election_timer();
        metrics::record_election_started();

        info!(
            node = %self.id,
            term = self.persistent.current_term,
            "Starting election"
        );

        if self.votes_received.len() >= self.quorum_size() {
            self.become_leader();
            return Ok(self.broadcast_append());
        }

        let request = RequestVoteRequest {
            term: self.persistent.current_term,
            candidate_id: self.id.clone(),
            last_log_index: self.persistent.log.last_index(),
            last_log_term: self.persistent.log.last_term(),
        };
        Ok(self
            .peers
            .iter()
            .map(|peer| Outbound {
                to: peer.clone(),
                request: RaftRequest::RequestVote(request.clone()),
            })
            .collect())
    }

    /// Append a command as leader. Returns its index and the replication
    /// messages to send immediately.
    pub fn propose(
        &mut self,
        command: serde_json::Value,
    ) -> ConsensusResult<(u64, Vec<Outbound>)> {
        self.ensure_running()?;
        if self.role != Role::Leader {
            return Err(ConsensusError::NotLeader {
                leader: self.leader_id.clone(),
            });
        }

        let index = self.persistent.log.last_index() + 1;
        self.persistent.log.push(LogEntry {
            index,
            term: self.persistent.current_term,
            command,
            timestamp: self.ports.clock.now(),
        });
        self.persist()?;

        debug!(node = %self.id, index, term = self.persistent.current_term, "Proposed entry");

        // Single-node clusters commit on append.
        self.advance_commit_index();
        Ok((index, self.broadcast_append()))
    }

    // === Inbound RPCs ===

    pub fn handle_request(&mut self, request: &RaftRequest) -> ConsensusResult<RaftResponse> {
        match request {
            RaftRequest::RequestVote(req) => {
                self.handle_request_vote(req).map(RaftResponse::RequestVote)
            }
            RaftRequest::AppendEntries(req) => {
                self.handle_append_entries(req).map(RaftResponse::AppendEntries)
            }
        }
    }

    pub fn handle_request_vote(
        &mut self,
        req: &RequestVoteRequest,
    ) -> ConsensusResult<RequestVoteResponse> {
        self.ensure_running()?;

        let mut dirty = false;
        if req.term > self.persistent.current_term {
            self.adopt_term(req.term);
            dirty = true;
        }

        let log_ok = self
            .persistent
            .log
            .is_up_to_date(req.last_log_index, req.last_log_term);
        let vote_free = match &self.persistent.voted_for {
            None => true,
            Some(v) => v == &req.candidate_id,
        };
        let granted = req.term == self.persistent.current_term && vote_free && log_ok;

        if granted && self.persistent.voted_for.as_ref() != Some(&req.candidate_id) {
            self.persistent.voted_for = Some(req.candidate_id.clone());
            dirty = true;
        }
        if dirty {
            self.persist()?;
        }
        if granted {
            self.reset_election_timer();
        }

        debug!(
            node = %self.id,
            candidate = %req.candidate_id,
            term = req.term,
            granted,
            "Handled RequestVote"
        );

        Ok(RequestVoteResponse {
            term: self.persistent.current_term,
            vote_granted: granted,
            voter_id: self.id.clone(),
        })
    }

    pub fn handle_append_entries(
        &mut self,
        req: &AppendEntriesRequest,
    ) -> ConsensusResult<AppendEntriesResponse> {
        self.ensure_running()?;

        if req.term < self.persistent.current_term {
            return Ok(self.append_response(false, self.persistent.log.last_index()));
        }

        let mut dirty = false;
        if req.term > self.persistent.current_term {
            self.adopt_term(req.term);
            dirty = true;
        }
        if self.role != Role::Follower {
            self.set_role(Role::Follower);
        }
        if self.leader_id.as_ref() != Some(&req.leader_id) {
            self.leader_id = Some(req.leader_id.clone());
        }
        self.reset_election_timer();

        let continuous = self.persistent.log.term_at(req.prev_log_index) == Some(req.prev_log_term);
        if !continuous {
            if dirty {
                self.persist()?;
            }
            debug!(
                node = %self.id,
                prev_log_index = req.prev_log_index,
                prev_log_term = req.prev_log_term,
                "Log continuity check failed"
            );
            return Ok(self.append_response(false, self.persistent.log.last_index()));
        }

        if self.persistent.log.merge(&req.entries) {
            dirty = true;
        }
        if dirty {
            self.persist()?;
        }

        // Only the prefix up to the last entry in this request is known to
        // match the leader.
        let last_new = req.prev_log_index + req.entries.len() as u64;
        let new_commit = req.leader_commit.min(last_new);
        if new_commit > self.commit_index {
            self.commit_index = new_commit;
            self.apply_committed();
        }

        Ok(self.append_response(true, last_new))
    }

    // === Responses to our own RPCs ===

    pub fn handle_response(&mut self, response: &RaftResponse) -> ConsensusResult<Vec<Outbound>> {
        match response {
            RaftResponse::RequestVote(resp) => self.handle_vote_response(resp),
            RaftResponse::AppendEntries(resp) => self.handle_append_response(resp),
        }
    }

    pub fn handle_vote_response(
        &mut self,
        resp: &RequestVoteResponse,
    ) -> ConsensusResult<Vec<Outbound>> {
        self.ensure_running()?;

        if resp.term > self.persistent.current_term {
            self.adopt_term(resp.term);
            self.persist()?;
            return Ok(Vec::new());
        }
        if self.role != Role::Candidate
            || resp.term != self.persistent.current_term
            || !resp.vote_granted
            || !self.peers.contains(&resp.voter_id)
        {
            return Ok(Vec::new());
        }

        self.votes_received.insert(resp.voter_id.clone());
        if self.votes_received.len() >= self.quorum_size() {
            self.become_leader();
            return Ok(self.broadcast_append());
        }
        Ok(Vec::new())
    }

    pub fn handle_append_response(
        &mut self,
        resp: &AppendEntriesResponse,
    ) -> ConsensusResult<Vec<Outbound>> {
        self.ensure_running()?;

        if resp.term > self.persistent.current_term {
            self.adopt_term(resp.term);
            self.persist()?;
            return Ok(Vec::new());
        }
        if self.role != Role::Leader
            || resp.term != self.persistent.current_term
            || !self.peers.contains(&resp.follower_id)
        {
            return Ok(Vec::new());
        }

        let peer = resp.follower_id.clone();
        let last_index = self.persistent.log.last_index();

        if resp.success {
            let matched = self.match_index.entry(peer.clone()).or_insert(0);
            if resp.match_index > *matched {
                *matched = resp.match_index;
            }
            let matched = *matched;
            self.next_index.insert(peer.clone(), matched + 1);
            self.advance_commit_index();

            if matched < last_index {
                return Ok(vec![self.append_for(&peer)]);
            }
            return Ok(Vec::new());
        }

        let next = self.next_index.entry(peer.clone()).or_insert(last_index + 1);
        let backed_off = next.saturating_sub(1).min(resp.match_index + 1).max(1);
        *next = backed_off;
        debug!(node = %self.id, peer = %peer, next_index = backed_off, "Follower rejected append, backing off");
        Ok(vec![self.append_for(&peer)])
    }

    // === Internals ===

    fn ensure_running(&self) -> ConsensusResult<()> {
        if self.halted {
            return Err(ConsensusError::Halted);
        }
        Ok(())
    }

    fn persist(&mut self) -> ConsensusResult<()> {
        if let Err(e) = self.ports.store.save(&self.persistent) {
            self.halted = true;
            error!(node = %self.id, error = %e, "Durable write failed, halting consensus engine");
            self.ports.events.publish(MeshEvent::ConsensusHalted {
                node: self.id.clone(),
                reason: e.to_string(),
            });
            return Err(ConsensusError::Persistence(e));
        }
        Ok(())
    }

    /// Move to a newer term as follower. The caller persists.
    fn adopt_term(&mut self, term: u64) {
        debug!(node = %self.id, old_term = self.persistent.current_term, new_term = term, "Observed higher term");
        self.persistent.current_term = term;
        self.persistent.voted_for = None;
        self.leader_id = None;
        if self.role != Role::Follower {
            self.set_role(Role::Follower);
        }
    }

    fn set_role(&mut self, role: Role) {
        if self.role == role {
            return;
        }
        info!(
            node = %self.id,
            from = %self.role,
            to = %role,
            term = self.persistent.current_term,
            "Role changed"
        );
        self.role = role;
        if role != Role::Leader {
            self.next_index.clear();
            self.match_index.clear();
        }
        self.ports.events.publish(MeshEvent::RoleChanged {
            node: self.id.clone(),
            role: role.to_string(),
            term: self.persistent.current_term,
        });
    }

    fn become_leader(&mut self) {
        self.set_role(Role::Leader);
        self.leader_id = Some(self.id.clone());
        let next = self.persistent.log.last_index() + 1;
        self.next_index = self.peers.iter().map(|p| (p.clone(), next)).collect();
        self.match_index = self.peers.iter().map(|p| (p.clone(), 0)).collect();
        self.heartbeat_elapsed = 0;
        metrics::record_leader_elected();
        info!(node = %self.id, term = self.persistent.current_term, "Became leader");
    }

    fn reset_election_timer(&mut self) {
        self.election_elapsed = 0;
        self.election_timeout = self.rng.gen_range(
            self.config.election_timeout_min_ticks..=self.config.election_timeout_max_ticks,
        );
    }

    fn broadcast_append(&mut self) -> Vec<Outbound> {
        self.heartbeat_elapsed = 0;
        let peers = self.peers.clone();
        peers.iter().map(|peer| self.append_for(peer)).collect()
    }

    fn append_for(&self, peer: &NodeId) -> Outbound {
        let last_index = self.persistent.log.last_index();
        let next = self
            .next_index
            .get(peer)
            .copied()
            .unwrap_or(last_index + 1)
            .clamp(1, last_index + 1);
        let prev_log_index = next - 1;
        let prev_log_term = self.persistent.log.term_at(prev_log_index).unwrap_or(0);

        Outbound {
            to: peer.clone(),
            request: RaftRequest::AppendEntries(AppendEntriesRequest {
                term: self.persistent.current_term,
                leader_id: self.id.clone(),
                prev_log_index,
                prev_log_term,
                entries: self
                    .persistent
                    .log
                    .entries_from(next, self.config.max_entries_per_append),
                leader_commit: self.commit_index,
            }),
        }
    }

    fn append_response(&self, success: bool, match_index: u64) -> AppendEntriesResponse {
        AppendEntriesResponse {
            term: self.persistent.current_term,
            success,
            follower_id: self.id.clone(),
            match_index,
        }
    }

    /// Commit the highest current-term index stored on a quorum.
    fn advance_commit_index(&mut self) {
        let term = self.persistent.current_term;
        let mut n = self.persistent.log.last_index();

        while n > self.commit_index {
            match self.persistent.log.term_at(n) {
                Some(t) if t == term => {
                    let replicas = 1 + self.match_index.values().filter(|&&m| m >= n).count();
                    if replicas >= self.quorum_size() {
                        debug!(node = %self.id, commit_index = n, replicas, "Advanced commit index");
                        self.commit_index = n;
                        self.apply_committed();
                        return;
                    }
                }
                // Terms never decrease along the log, so nothing earlier can
                // carry the current term.
                _ => return,
            }
            n -= 1;
        }
    }

    fn apply_committed(&mut self) {
        while self.last_applied < self.commit_index {
            let index = self.last_applied + 1;
            let Some(entry) = self.persistent.log.get(index) else {
                break;
            };
            self.ports.commit_handler.apply(entry);
            self.ports.events.publish(MeshEvent::EntryCommitted {
                node: self.id.clone(),
                index,
                term: entry.term,
            });
            metrics::record_entry_committed();
            self.last_applied = index;
        }
    }
}

fn seed_salt(id: &NodeId) -> u64 {
    id.as_str()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x1000_0000_01b3))
}

#[cfg(test)]
mod tests;
