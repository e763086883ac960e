//! # Mesh Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # In-process clusters of full mesh nodes
//! └── integration/      # Cross-subsystem scenarios
//!     ├── consensus.rs  # Election, replication, partition recovery
//!     ├── governance.rs # Slashing, ban propagation, policy votes
//!     └── membership.rs # Probing, failure detection, graceful leave
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p mesh-tests
//!
//! # By category
//! cargo test -p mesh-tests integration::consensus
//! cargo test -p mesh-tests integration::governance
//! cargo test -p mesh-tests integration::membership
//!
//! # Benchmarks
//! cargo bench -p mesh-tests
//! ```

pub mod harness;
pub mod integration;
