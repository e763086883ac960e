//! # Shared Bus
//!
//! Two in-process plumbing pieces every mesh node uses.
//!
//! ## Event Bus
//!
//! Subsystems announce what they did (a peer failed, a leader was elected, a
//! ban was applied) without knowing who listens.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Gossip     │                    │   Runtime    │
//! │              │    publish()       │  governance  │
//! │              │ ──────┐            │     loop     │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │ (per node)   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## In-Memory Router
//!
//! [`InMemoryRouter`] implements the `RpcTransport` port without sockets so a
//! whole cluster can run inside one test. It can isolate nodes and sever
//! individual links to simulate partitions.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod router;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, MeshEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use router::{InMemoryRouter, RouterEndpoint, RouterStats};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
