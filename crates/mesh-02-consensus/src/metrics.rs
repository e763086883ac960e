//! # Consensus Metrics
//!
//! Prometheus metrics for monitoring elections and replication.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! mesh-02-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `consensus_elections_started_total` - Elections this node started
//! - `consensus_leader_elected_total` - Times this node won an election
//! - `consensus_entries_committed_total` - Entries applied to the state machine
//! - `consensus_rpc_failures_total` - Outbound RPCs that failed or timed out

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref ELECTIONS_STARTED: IntCounter = register_int_counter!(
        "consensus_elections_started_total",
        "Total number of elections started by this node"
    )
    .expect("Failed to create ELECTIONS_STARTED metric");

    pub static ref LEADER_ELECTED: IntCounter = register_int_counter!(
        "consensus_leader_elected_total",
        "Total number of elections won by this node"
    )
    .expect("Failed to create LEADER_ELECTED metric");

    pub static ref ENTRIES_COMMITTED: IntCounter = register_int_counter!(
        "consensus_entries_committed_total",
        "Total number of log entries applied"
    )
    .expect("Failed to create ENTRIES_COMMITTED metric");

    pub static ref RPC_FAILURES: IntCounterVec = register_int_counter_vec!(
        "consensus_rpc_failures_total",
        "Outbound consensus RPCs that failed or timed out",
        &["kind"]
    )
    .expect("Failed to create RPC_FAILURES metric");
}

#[cfg(feature = "metrics")]
pub fn record_election_started() {
    ELECTIONS_STARTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_leader_elected() {
    LEADER_ELECTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_entry_committed() {
    ENTRIES_COMMITTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_rpc_failure(kind: &str) {
    RPC_FAILURES.with_label_values(&[kind]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_election_started() {}

#[cfg(not(feature = "metrics"))]
pub fn record_leader_elected() {}

#[cfg(not(feature = "metrics"))]
pub fn record_entry_committed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_rpc_failure(_kind: &str) {}
