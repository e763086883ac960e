//! Consensus timing configuration.
//!
//! The engine counts logical ticks. The service turns ticks into wall time
//! with `tick_interval_ms`, so the defaults below give a 150ms heartbeat and a
//! 300-500ms randomized election timeout.

use super::error::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Wall-clock length of one tick.
    pub tick_interval_ms: u64,
    /// Leader sends AppendEntries (possibly empty) every this many ticks.
    pub heartbeat_interval_ticks: u32,
    /// Lower bound of the randomized election timeout, inclusive.
    pub election_timeout_min_ticks: u32,
    /// Upper bound of the randomized election timeout, inclusive.
    pub election_timeout_max_ticks: u32,
    /// Deadline for a single RequestVote / AppendEntries call.
    pub rpc_timeout_ms: u64,
    /// Cap on entries carried by one AppendEntries.
    pub max_entries_per_append: usize,
    /// Fixed seed for election jitter. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            heartbeat_interval_ticks: 3,
            election_timeout_min_ticks: 6,
            election_timeout_max_ticks: 10,
            rpc_timeout_ms: 100,
            max_entries_per_append: 64,
            rng_seed: None,
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> ConsensusResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(ConsensusError::InvalidConfig(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if self.heartbeat_interval_ticks == 0 {
            return Err(ConsensusError::InvalidConfig(
                "heartbeat_interval_ticks must be positive".into(),
            ));
        }
        if self.election_timeout_min_ticks <= self.heartbeat_interval_ticks {
            return Err(ConsensusError::InvalidConfig(format!(
                "election timeout ({} ticks) must exceed heartbeat interval ({} ticks)",
                self.election_timeout_min_ticks, self.heartbeat_interval_ticks
            )));
        }
        if self.election_timeout_max_ticks < self.election_timeout_min_ticks {
            return Err(ConsensusError::InvalidConfig(
                "election_timeout_max_ticks must be >= election_timeout_min_ticks".into(),
            ));
        }
        if self.max_entries_per_append == 0 || self.rpc_timeout_ms == 0 {
            return Err(ConsensusError::InvalidConfig(
                "max_entries_per_append and rpc_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConsensusConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval() * config.heartbeat_interval_ticks, Duration::from_millis(150));
    }

    #[test]
    fn test_election_timeout_must_exceed_heartbeat() {
        let config = ConsensusConfig {
            election_timeout_min_ticks: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConsensusError::InvalidConfig(_))));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let config = ConsensusConfig {
            election_timeout_min_ticks: 10,
            election_timeout_max_ticks: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
