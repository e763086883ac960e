//! # Shared Types Crate
//!
//! Types and ports every mesh subsystem agrees on.
//!
//! ## Design Principles
//!
//! - **Per-node ownership**: nothing here is global. Each node builds its own
//!   registries and hands them the ports defined below.
//! - **Opaque identity**: keys and signatures are byte blobs. Subsystems sign
//!   and verify through [`Signer`] and [`SignatureVerifier`] and never touch a
//!   concrete algorithm.
//! - **Pluggable transport**: [`RpcTransport`] / [`RpcHandler`] are the only way
//!   nodes talk to each other, so the in-memory router used by tests and a
//!   socket transport are interchangeable.

pub mod entities;
pub mod errors;
pub mod identity;
pub mod time;
pub mod transport;

pub use entities::*;
pub use errors::*;
pub use identity::{SignatureVerifier, Signer};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use transport::{RpcHandler, RpcTransport, TransportError};
