//! # Gossip Metrics
//!
//! Enable with the `metrics` feature.
//!
//! - `gossip_probes_total{result}` - Probe rounds by outcome (`direct`, `indirect`, `failed`)
//! - `gossip_members_suspected_total` - Members this node marked SUSPECT
//! - `gossip_members_failed_total` - Members this node declared DEAD
//! - `gossip_items_disseminated_total` - Updates and rumors sent, per recipient

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref PROBES: IntCounterVec = register_int_counter_vec!(
        "gossip_probes_total",
        "Probe rounds by outcome",
        &["result"]
    )
    .expect("Failed to create PROBES metric");

    pub static ref MEMBERS_SUSPECTED: IntCounter = register_int_counter!(
        "gossip_members_suspected_total",
        "Members marked SUSPECT by this node"
    )
    .expect("Failed to create MEMBERS_SUSPECTED metric");

    pub static ref MEMBERS_FAILED: IntCounter = register_int_counter!(
        "gossip_members_failed_total",
        "Members declared DEAD by this node"
    )
    .expect("Failed to create MEMBERS_FAILED metric");

    pub static ref ITEMS_DISSEMINATED: IntCounter = register_int_counter!(
        "gossip_items_disseminated_total",
        "Updates and rumors sent, counted per recipient"
    )
    .expect("Failed to create ITEMS_DISSEMINATED metric");
}

#[cfg(feature = "metrics")]
pub fn record_probe(result: &str) {
    PROBES.with_label_values(&[result]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_suspected() {
    MEMBERS_SUSPECTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_failed() {
    MEMBERS_FAILED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_disseminated(items: u64) {
    ITEMS_DISSEMINATED.inc_by(items);
}

#[cfg(not(feature = "metrics"))]
pub fn record_probe(_result: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_suspected() {}

#[cfg(not(feature = "metrics"))]
pub fn record_failed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_disseminated(_items: u64) {}
