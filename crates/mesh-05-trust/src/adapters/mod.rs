//! Adapters for trust ports

pub mod file_store;
pub mod gossip;
pub mod memory_store;

pub use file_store::JsonFileTrustStore;
pub use gossip::{ban_rumor, BanRumorHandler, BAN_TOPIC};
pub use memory_store::InMemoryTrustStore;
