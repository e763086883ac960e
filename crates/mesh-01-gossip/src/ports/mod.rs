//! Ports (hexagonal architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::GossipApi;
pub use outbound::RumorHandler;
