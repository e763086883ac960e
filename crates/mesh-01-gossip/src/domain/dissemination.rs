//! Piggyback queue for membership updates and rumors.
//!
//! At most one pending update per peer: a newer update about the same peer
//! replaces the older one and restarts its transmission count. Every item is
//! handed out at most `max_transmissions` times.

use super::update::{MembershipUpdate, Rumor};
use shared_types::NodeId;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Number of recipients per dissemination round for `alive` known members.
pub fn fanout(multiplier: usize, alive: usize) -> usize {
    let n = alive as u64 + 1;
    let bit_length = (u64::BITS - n.leading_zeros()) as usize;
    multiplier * bit_length.max(1)
}

#[derive(Debug, Clone)]
struct Pending<T> {
    item: T,
    transmissions: u32,
}

#[derive(Debug, Default)]
pub struct DisseminationQueue {
    max_transmissions: u32,
    updates: BTreeMap<NodeId, Pending<MembershipUpdate>>,
    rumors: Vec<Pending<Rumor>>,
}

/// Items to piggyback on one round of GOSSIP messages.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GossipBatch {
    pub updates: Vec<MembershipUpdate>,
    pub rumors: Vec<Rumor>,
}

impl GossipBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.rumors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len() + self.rumors.len()
    }
}

impl DisseminationQueue {
    pub fn new(max_transmissions: u32) -> Self {
        Self {
            max_transmissions,
            ..Default::default()
        }
    }

    pub fn queue_update(&mut self, update: MembershipUpdate) {
        if let Some(pending) = self.updates.get(&update.peer_id) {
            if pending.item.incarnation > update.incarnation {
                return;
            }
        }
        self.updates.insert(
            update.peer_id.clone(),
            Pending {
                item: update,
                transmissions: 0,
            },
        );
    }

    pub fn queue_rumor(&mut self, rumor: Rumor) {
        if self.rumors.iter().any(|p| p.item.id == rumor.id) {
            return;
        }
        self.rumors.push(Pending {
            item: rumor,
            transmissions: 0,
        });
    }

    pub fn pending_updates(&self) -> usize {
        self.updates.len()
    }

    pub fn pending_rumors(&self) -> usize {
        self.rumors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.rumors.is_empty()
    }

    /// Take one round's worth of items, counting a transmission for each and
    /// dropping those that reach the limit.
    pub fn next_batch(&mut self) -> GossipBatch {
        let max = self.max_transmissions;
        let mut batch = GossipBatch::default();

        self.updates.retain(|_, pending| {
            batch.updates.push(pending.item.clone());
            pending.transmissions += 1;
            pending.transmissions < max
        });
        self.rumors.retain_mut(|pending| {
            batch.rumors.push(pending.item.clone());
            pending.transmissions += 1;
            pending.transmissions < max
        });
        batch
    }
}

/// Bounded set of rumor ids already seen, oldest evicted first.
#[derive(Debug)]
pub struct RumorCache {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RumorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Record `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
