//! Node-level Prometheus gauges and text export.
//!
//! Subsystem counters (consensus, gossip) register themselves on the default
//! registry behind their own `metrics` feature; [`gather_metrics`] exports
//! all of them together with the gauges below.
//!
//! All metrics follow the naming convention: `mesh_<area>_<metric>`

use lazy_static::lazy_static;
use prometheus::{register_int_gauge, Encoder, IntGauge, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Members the local gossip view currently considers alive
    pub static ref LIVE_PEERS: IntGauge = register_int_gauge!(
        "mesh_membership_live_peers",
        "Members currently considered alive by gossip"
    )
    .expect("metric creation failed");

    /// Bans currently in force in the trust registry
    pub static ref ACTIVE_BANS: IntGauge = register_int_gauge!(
        "mesh_trust_active_bans",
        "Bans currently in force"
    )
    .expect("metric creation failed");

    /// Nodes with ACTIVE status in the federation registry
    pub static ref ACTIVE_MEMBERS: IntGauge = register_int_gauge!(
        "mesh_federation_active_members",
        "Federation members with ACTIVE status"
    )
    .expect("metric creation failed");
}

/// Point-in-time node health figures published as gauges.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthGauges {
    pub live_peers: i64,
    pub active_bans: i64,
    pub active_members: i64,
}

pub fn record_health(gauges: HealthGauges) {
    LIVE_PEERS.set(gauges.live_peers);
    ACTIVE_BANS.set(gauges.active_bans);
    ACTIVE_MEMBERS.set(gauges.active_members);
}

/// Encode everything on the default registry in Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_gauges_exported() {
        record_health(HealthGauges {
            live_peers: 4,
            active_bans: 1,
            active_members: 5,
        });

        let text = gather_metrics().unwrap();
        assert!(text.contains("mesh_membership_live_peers 4"));
        assert!(text.contains("mesh_trust_active_bans 1"));
    }
}
