//! Ports (hexagonal architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::TrustView;
pub use outbound::TrustStore;
