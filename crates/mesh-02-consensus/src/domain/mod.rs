//! Domain layer: pure Raft logic, no async, no I/O beyond the state store port.

pub mod config;
pub mod error;
pub mod log;
pub mod messages;
pub mod raft;
pub mod state;

pub use config::*;
pub use error::*;
pub use log::*;
pub use messages::*;
pub use raft::*;
pub use state::*;
