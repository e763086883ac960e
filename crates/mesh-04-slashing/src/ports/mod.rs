//! Ports (hexagonal architecture)
//!
//! The engine's only driven port is the federation's
//! [`NodeRegistry`](mesh_03_federation::NodeRegistry).

pub mod inbound;

pub use inbound::SlashingApi;
