//! # mesh-01-gossip
//!
//! SWIM-style membership for the mesh: failure detection, a peer registry,
//! and epidemic dissemination of membership updates and opaque rumors.
//!
//! ## Architecture
//!
//! ```text
//!          probe_round()                 sweep_suspects()
//!   ALIVE ──── no ack ────→ SUSPECT ──── timeout ────→ DEAD
//!     ↑                        │
//!     └──── ack / refutation ──┘
//!
//!   leave() ──→ LEFT
//! ```
//!
//! - `PeerRegistry` is plain data; the service owns it behind one mutex.
//! - Every status change is versioned by an incarnation number. Remote
//!   updates apply only when strictly newer.
//! - A node that hears it is suspected or dead raises its own incarnation
//!   and gossips `alive`.
//! - Rumors (`{id, topic, payload}`) ride along with updates. Registered
//!   [`RumorHandler`](ports::RumorHandler)s decide whether a rumor keeps
//!   spreading; ban proofs travel this way.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mesh_01_gossip::{GossipConfig, GossipService, Member};
//!
//! let gossip = Arc::new(GossipService::new(id, "10.0.0.1:7000", GossipConfig::default(),
//!     transport, events, clock)?);
//! gossip.join(Member::new(seed_id, "10.0.0.2:7000", clock.now()));
//! gossip.announce();
//!
//! tokio::spawn({ let g = gossip.clone(); let rx = shutdown.clone();
//!     async move { g.run_protocol_loop(rx).await } });
//! tokio::spawn({ let g = gossip.clone();
//!     async move { g.run_suspicion_loop(shutdown).await } });
//! ```

pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use domain::{
    GossipConfig, GossipError, GossipRequest, GossipResponse, GossipResult, Member, MemberStatus,
    MembershipUpdate, PeerRegistry, Rumor, UpdateKind,
};
pub use ports::{GossipApi, RumorHandler};
pub use service::{GossipService, GossipStats, ProbeOutcome};
