//! # Peer Registry
//!
//! The membership list of one node. The local node is never stored here; the
//! service tracks its own incarnation separately.
//!
//! ## Incarnation rules
//!
//! - A locally observed status change bumps the member's incarnation.
//! - A remote update applies only when its incarnation is strictly greater
//!   than the local copy's.
//! - `suspect` applies only to an ALIVE member.
//! - `alive` about an unknown member carrying an address adds it. Other
//!   updates about unknown members are ignored.

use super::member::{Member, MemberStatus};
use super::update::{MembershipUpdate, UpdateKind};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared_types::{NodeId, Timestamp};
use std::collections::{BTreeMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryEventKind {
    Discovered,
    Joined,
    Left,
    Suspected,
    Failed,
    Recovered,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    pub kind: DiscoveryEventKind,
    pub peer: NodeId,
    pub at: Timestamp,
    pub incarnation: u64,
}

/// Result of [`PeerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    New,
    Updated,
    Stale,
}

/// A status transition that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: MemberStatus,
    pub to: MemberStatus,
    pub incarnation: u64,
}

/// Result of [`PeerRegistry::apply_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Stale, inapplicable, or about an unknown member without an address.
    Ignored,
    /// Unknown member learned from an `alive` update.
    Added,
    /// Newer incarnation accepted without a status change.
    Refreshed,
    Changed(StatusChange),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, UpdateOutcome::Ignored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologySnapshot {
    pub total_members: usize,
    pub alive_count: usize,
    pub suspect_count: usize,
    pub dead_count: usize,
    pub left_count: usize,
    pub members: Vec<Member>,
    pub taken_at: Timestamp,
}

pub struct PeerRegistry {
    local: NodeId,
    members: BTreeMap<NodeId, Member>,
    events: VecDeque<DiscoveryEvent>,
    max_event_log: usize,
}

impl PeerRegistry {
    pub fn new(local: NodeId, max_event_log: usize) -> Self {
        Self {
            local,
            members: BTreeMap::new(),
            events: VecDeque::new(),
            max_event_log: max_event_log.max(1),
        }
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Insert a member, or replace the known copy when `member` is at least
    /// as new.
    pub fn add(&mut self, member: Member, now: Timestamp) -> AddOutcome {
        if member.id == self.local {
            return AddOutcome::Stale;
        }
        match self.members.get_mut(&member.id) {
            Some(existing) if member.incarnation >= existing.incarnation => {
                *existing = member;
                AddOutcome::Updated
            }
            Some(_) => AddOutcome::Stale,
            None => {
                self.log(DiscoveryEventKind::Discovered, &member.id, member.incarnation, now);
                self.members.insert(member.id.clone(), member);
                AddOutcome::New
            }
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.members.contains_key(id)
    }

    pub fn remove(&mut self, id: &NodeId, now: Timestamp) -> Option<Member> {
        let removed = self.members.remove(id)?;
        self.log(DiscoveryEventKind::Removed, id, removed.incarnation, now);
        Some(removed)
    }

    pub fn all(&self) -> Vec<&Member> {
        self.members.values().collect()
    }

    pub fn alive(&self) -> Vec<&Member> {
        self.with_status(MemberStatus::Alive)
    }

    pub fn suspects(&self) -> Vec<&Member> {
        self.with_status(MemberStatus::Suspect)
    }

    fn with_status(&self, status: MemberStatus) -> Vec<&Member> {
        self.members.values().filter(|m| m.status == status).collect()
    }

    pub fn is_alive(&self, id: &NodeId) -> bool {
        self.members.get(id).is_some_and(Member::is_alive)
    }

    /// Up to `k` distinct ALIVE members chosen uniformly, skipping `exclude`.
    pub fn random_alive<R: Rng + ?Sized>(
        &self,
        k: usize,
        exclude: &HashSet<NodeId>,
        rng: &mut R,
    ) -> Vec<Member> {
        self.sample(k, exclude, rng, Member::is_alive)
    }

    /// Like [`random_alive`](Self::random_alive) but SUSPECT members are
    /// eligible too: they are still probed and still hear gossip, which is
    /// how they learn of an accusation and refute it.
    pub fn random_reachable<R: Rng + ?Sized>(
        &self,
        k: usize,
        exclude: &HashSet<NodeId>,
        rng: &mut R,
    ) -> Vec<Member> {
        self.sample(k, exclude, rng, |m| m.is_alive() || m.is_suspect())
    }

    fn sample<R, F>(&self, k: usize, exclude: &HashSet<NodeId>, rng: &mut R, eligible: F) -> Vec<Member>
    where
        R: Rng + ?Sized,
        F: Fn(&Member) -> bool,
    {
        let candidates: Vec<&Member> = self
            .members
            .values()
            .filter(|m| eligible(*m) && !exclude.contains(&m.id))
            .collect();
        candidates
            .choose_multiple(rng, k.min(candidates.len()))
            .map(|m| (*m).clone())
            .collect()
    }

    /// Refresh `last_seen` after direct contact.
    pub fn mark_seen(&mut self, id: &NodeId, now: Timestamp) {
        if let Some(member) = self.members.get_mut(id) {
            member.last_seen = now;
        }
    }

    /// Locally observed transition. Bumps the incarnation when the status
    /// actually changes.
    pub fn set_status(
        &mut self,
        id: &NodeId,
        status: MemberStatus,
        now: Timestamp,
    ) -> Option<StatusChange> {
        let member = self.members.get_mut(id)?;
        if status == MemberStatus::Alive {
            member.last_seen = now;
        }
        if member.status == status {
            return None;
        }
        let change = StatusChange {
            from: member.status,
            to: status,
            incarnation: member.incarnation + 1,
        };
        member.status = status;
        member.incarnation = change.incarnation;
        member.status_changed = now;
        self.log_change(id, change, now);
        Some(change)
    }

    /// Apply an update received over gossip. Updates about the local node
    /// are the caller's business and are ignored here.
    pub fn apply_update(&mut self, update: &MembershipUpdate, now: Timestamp) -> UpdateOutcome {
        if update.peer_id == self.local {
            return UpdateOutcome::Ignored;
        }

        if !self.members.contains_key(&update.peer_id) {
            return match (&update.kind, &update.address) {
                (UpdateKind::Alive, Some(address)) => {
                    let member = Member::new(update.peer_id.clone(), address.clone(), now)
                        .with_incarnation(update.incarnation);
                    self.log(DiscoveryEventKind::Joined, &update.peer_id, update.incarnation, now);
                    self.members.insert(update.peer_id.clone(), member);
                    UpdateOutcome::Added
                }
                _ => UpdateOutcome::Ignored,
            };
        }
        let Some(member) = self.members.get_mut(&update.peer_id) else {
            return UpdateOutcome::Ignored;
        };

        if update.incarnation <= member.incarnation {
            return UpdateOutcome::Ignored;
        }

        let target = match update.kind {
            UpdateKind::Alive => MemberStatus::Alive,
            UpdateKind::Suspect if member.is_alive() => MemberStatus::Suspect,
            UpdateKind::Suspect => return UpdateOutcome::Ignored,
            UpdateKind::Dead => MemberStatus::Dead,
            UpdateKind::Left => MemberStatus::Left,
        };

        member.incarnation = update.incarnation;
        if let Some(address) = &update.address {
            member.address = address.clone();
        }
        if target == MemberStatus::Alive {
            member.last_seen = now;
        }
        if member.status == target {
            return UpdateOutcome::Refreshed;
        }

        let change = StatusChange {
            from: member.status,
            to: target,
            incarnation: update.incarnation,
        };
        member.status = target;
        member.status_changed = now;
        self.log_change(&update.peer_id, change, now);
        UpdateOutcome::Changed(change)
    }

    /// First 16 hex chars of SHA-256 over the sorted ALIVE ids, the local
    /// node included, joined by `:`. Converged nodes report the same value.
    pub fn membership_hash(&self) -> String {
        let mut ids: Vec<&str> = self
            .members
            .values()
            .filter(|m| m.is_alive())
            .map(|m| m.id.as_str())
            .chain(std::iter::once(self.local.as_str()))
            .collect();
        ids.sort_unstable();
        shared_crypto::sha256(ids.join(":").as_bytes()).short_hex(16)
    }

    pub fn topology(&self, now: Timestamp) -> TopologySnapshot {
        let count = |s: MemberStatus| self.members.values().filter(|m| m.status == s).count();
        TopologySnapshot {
            total_members: self.members.len(),
            alive_count: count(MemberStatus::Alive),
            suspect_count: count(MemberStatus::Suspect),
            dead_count: count(MemberStatus::Dead),
            left_count: count(MemberStatus::Left),
            members: self.members.values().cloned().collect(),
            taken_at: now,
        }
    }

    /// Most recent events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<DiscoveryEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    fn log_change(&mut self, id: &NodeId, change: StatusChange, now: Timestamp) {
        let kind = match (change.from, change.to) {
            (_, MemberStatus::Suspect) => DiscoveryEventKind::Suspected,
            (_, MemberStatus::Dead) => DiscoveryEventKind::Failed,
            (_, MemberStatus::Left) => DiscoveryEventKind::Left,
            (_, MemberStatus::Alive) => DiscoveryEventKind::Recovered,
        };
        self.log(kind, id, change.incarnation, now);
    }

    fn log(&mut self, kind: DiscoveryEventKind, peer: &NodeId, incarnation: u64, at: Timestamp) {
        self.events.push_back(DiscoveryEvent {
            kind,
            peer: peer.clone(),
            at,
            incarnation,
        });
        while self.events.len() > self.max_event_log {
            self.events.pop_front();
        }
    }
}
