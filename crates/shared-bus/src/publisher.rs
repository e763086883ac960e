//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{EventFilter, MeshEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Trait for publishing events to the bus.
///
/// Publishing never blocks, so subsystems may call it while holding their own
/// state lock.
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of subscribers that received it.
    fn publish(&self, event: MeshEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// One bus per node; nodes never share a bus.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<MeshEvent>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    events_published: AtomicU64,

    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}", filter.topics);

        *self
            .subscriptions
            .write()
            .entry(topic_key.clone())
            .or_insert(0) += 1;

        trace!(topics = ?filter.topics, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: MeshEvent) -> usize {
        let topic = event.topic();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                trace!(topic = ?topic, receivers = receiver_count, "Event published");
                receiver_count
            }
            // No receivers; the event is dropped.
            Err(_) => 0,
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NodeId;

    fn left(id: &str) -> MeshEvent {
        MeshEvent::PeerLeft {
            peer: NodeId::from(id),
        }
    }

    #[test]
    fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::new();

        assert_eq!(bus.publish(left("n1")), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::new();
        let _sub = bus.subscribe(EventFilter::all());

        assert_eq!(bus.publish(left("n1")), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_subscription_count_drops_with_handle() {
        let bus = InMemoryEventBus::new();
        {
            let _a = bus.subscribe(EventFilter::all());
            let _b = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.subscriptions.read().is_empty());
    }
}
