//! Ports (hexagonal architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::ConsensusApi;
pub use outbound::{CommitHandler, MembershipView, StateStore};
