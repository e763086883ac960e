//! # Node Runtime Library
//!
//! Assembles one mesh node out of the subsystem crates. The `main.rs`
//! binary is a thin shell over [`MeshNode`]; tests and embedders build
//! nodes directly on any [`shared_types::RpcTransport`].
//!
//! ## Modules
//!
//! - `wire` - the `MeshRequest` / `MeshResponse` envelope every RPC travels in
//! - `transport` - per-subsystem views of one envelope transport
//! - `admission` - ban and expulsion checks in front of every inbound RPC
//! - `config` - TOML node configuration with `MESH_*` overrides
//! - `node` - the object graph, governance reactions and task loops

#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_lines)]

pub mod admission;
pub mod config;
pub mod error;
pub mod node;
pub mod transport;
pub mod wire;

pub use admission::{AdmissionGate, Refusal};
pub use config::{ConfigError, NodeConfig, NodeSection, PeerEntry};
pub use error::{NodeError, NodeResult};
pub use node::MeshNode;
pub use transport::MeshTransport;
pub use wire::{GovernanceRequest, GovernanceResponse, MeshRequest, MeshResponse};
