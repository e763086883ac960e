//! # mesh-03-federation
//!
//! Admission and governance for the federated mesh.
//!
//! ## Responsibilities
//!
//! - **Admission**: peering contracts are checked for duplicate ids and
//!   keys, minimum stake, endpoint shape and (optionally) signature, then
//!   become ACTIVE [`NodeRecord`](domain::NodeRecord)s.
//! - **Status registry**: the canonical view of every member. BANNED is
//!   terminal; warnings escalate to PROBATION.
//! - **Governance**: any ACTIVE member may propose a parameter change. It
//!   passes at `floor(active * policy_quorum) + 1` votes and bumps the config
//!   version.
//! - **Unbonding**: a voluntary exit locks stake for `unbonding_period`.
//!
//! ## Constitutional rigidity
//!
//! `policy_quorum > tx_quorum` holds at construction and after every applied
//! proposal. A proposal that would break it is refused before it exists.
//!
//! ```text
//!   PeeringContract ──admit──→ ACTIVE ──warn x3──→ PROBATION
//!                                │  \
//!                  start_unbonding   ban (slashing)
//!                                ↓      ↓
//!                           UNBONDING  BANNED (terminal)
//!                                │
//!                     finalize (after period) → removed
//! ```

pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types
pub use domain::{
    validate_endpoint, FederationPolicy, FederationStatus, NodeRecord, NodeStatus,
    PeeringContract, PolicyChanges, PolicyConfig, PolicyError, PolicyProposal, PolicyResult,
    PolicyUpdateRecord, PolicyUpdateType, ProposalStatus, QuorumFraction, UnbondingState,
    VoteOutcome, WarningOutcome,
};
pub use ports::NodeRegistry;
pub use service::FederationService;
