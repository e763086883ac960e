//! Adapters for consensus ports

pub mod file_store;
pub mod kv_state;
pub mod memory_store;

pub use file_store::FileStateStore;
pub use kv_state::KeyValueStateMachine;
pub use memory_store::InMemoryStateStore;
