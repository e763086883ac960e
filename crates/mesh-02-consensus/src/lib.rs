//! # mesh-02-consensus
//!
//! Raft consensus for the mesh control plane.
//!
//! ## Architecture
//!
//! The crate is split into a synchronous core and an async shell:
//!
//! ```text
//!   tick / propose / inbound RPC
//!              │
//!              ↓
//!   ┌─────────────────────┐   save()    ┌──────────────┐
//!   │ RaftNode (domain)   │───────────→ │ StateStore   │
//!   │  role, term, vote,  │             └──────────────┘
//!   │  log, commit index  │   apply()   ┌──────────────┐
//!   │                     │───────────→ │ CommitHandler│
//!   └─────────┬───────────┘             └──────────────┘
//!             │ Vec<Outbound>
//!             ↓
//!   ┌─────────────────────┐  send()     ┌──────────────┐
//!   │ ConsensusService    │───────────→ │ RpcTransport │
//!   └─────────────────────┘             └──────────────┘
//! ```
//!
//! Guarantees:
//! - at most one leader per term,
//! - a vote or log change is durable before any reply that depends on it,
//! - only entries of the leader's current term are committed by counting
//!   replicas; earlier entries commit with them,
//! - committed entries reach the [`CommitHandler`](ports::CommitHandler)
//!   exactly once, in index order.
//!
//! The voter set is static and supplied at construction.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mesh_02_consensus::{ConsensusConfig, ConsensusService, RaftNode, RaftPorts};
//! use mesh_02_consensus::adapters::{FileStateStore, KeyValueStateMachine};
//!
//! let core = RaftNode::new(node_id.clone(), peers, config.clone(), RaftPorts {
//!     store: Box::new(FileStateStore::new(&data_dir, &node_id)),
//!     commit_handler: Arc::new(KeyValueStateMachine::new()),
//!     events,
//!     clock,
//! })?;
//! let service = Arc::new(ConsensusService::new(core, transport, &config));
//! tokio::spawn({ let s = service.clone(); async move { s.run(shutdown).await } });
//!
//! let index = service.propose(json!({"action": "SET", "key": "x", "value": 42})).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use domain::{
    ConsensusConfig, ConsensusError, ConsensusResult, ConsensusStatus, LogEntry, PersistentState,
    RaftLog, RaftNode, RaftPorts, RaftRequest, RaftResponse, Role, StoreError,
};
pub use ports::{CommitHandler, ConsensusApi, MembershipView, StateStore};
pub use service::ConsensusService;
