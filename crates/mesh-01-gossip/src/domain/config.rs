//! Gossip timing and fan-out parameters.

use super::error::{GossipError, GossipResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Interval between probe rounds.
    pub protocol_period_ms: u64,
    /// Deadline for a direct PING.
    pub ping_timeout_ms: u64,
    /// Deadline for the indirect PING-REQ fan-out.
    pub ping_req_timeout_ms: u64,
    /// How long a member may stay SUSPECT before it is declared DEAD.
    pub suspect_timeout_ms: u64,
    /// Interval of the suspicion sweep.
    pub suspicion_check_interval_ms: u64,
    /// Helpers asked to probe a target indirectly (k).
    pub ping_req_members: usize,
    /// Fan-out is `multiplier * max(1, bit_length(n))`.
    pub dissemination_multiplier: usize,
    /// Times each queued update or rumor is sent before it is dropped.
    pub max_transmissions: u32,
    /// Bound on the discovery event log.
    pub max_event_log: usize,
    /// Bound on remembered rumor ids.
    pub rumor_cache_size: usize,
    /// Fixed seed for target selection. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            protocol_period_ms: 1000,
            ping_timeout_ms: 500,
            ping_req_timeout_ms: 1000,
            suspect_timeout_ms: 5000,
            suspicion_check_interval_ms: 1000,
            ping_req_members: 3,
            dissemination_multiplier: 3,
            max_transmissions: 10,
            max_event_log: 1000,
            rumor_cache_size: 4096,
            rng_seed: None,
        }
    }
}

impl GossipConfig {
    pub fn validate(&self) -> GossipResult<()> {
        let periods = [
            ("protocol_period_ms", self.protocol_period_ms),
            ("ping_timeout_ms", self.ping_timeout_ms),
            ("ping_req_timeout_ms", self.ping_req_timeout_ms),
            ("suspect_timeout_ms", self.suspect_timeout_ms),
            ("suspicion_check_interval_ms", self.suspicion_check_interval_ms),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, v)| *v == 0) {
            return Err(GossipError::InvalidConfig(format!("{name} must be positive")));
        }
        if self.dissemination_multiplier == 0 || self.max_transmissions == 0 {
            return Err(GossipError::InvalidConfig(
                "dissemination_multiplier and max_transmissions must be positive".into(),
            ));
        }
        if self.max_event_log == 0 || self.rumor_cache_size == 0 {
            return Err(GossipError::InvalidConfig(
                "max_event_log and rumor_cache_size must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn protocol_period(&self) -> Duration {
        Duration::from_millis(self.protocol_period_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn ping_req_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_req_timeout_ms)
    }

    pub fn suspect_timeout(&self) -> Duration {
        Duration::from_millis(self.suspect_timeout_ms)
    }

    pub fn suspicion_check_interval(&self) -> Duration {
        Duration::from_millis(self.suspicion_check_interval_ms)
    }
}
