//! # Integration Scenarios
//!
//! Multi-node flows over the full node runtime: the admission gate, the
//! mesh wire envelope and every subsystem are in the path.

pub mod consensus;
pub mod governance;
pub mod membership;
