//! Domain layer: admission rules, node registry and governance, no I/O.

pub mod config;
pub mod contract;
pub mod error;
pub mod node;
pub mod policy;
pub mod proposal;
pub mod quorum;

pub use config::*;
pub use contract::*;
pub use error::*;
pub use node::*;
pub use policy::*;
pub use proposal::*;
pub use quorum::*;
