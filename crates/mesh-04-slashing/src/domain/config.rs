//! Slashing engine configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingConfig {
    /// Shortest outage that counts as slashable downtime.
    pub min_downtime_secs: u64,
    /// Verdicts kept in the audit log; 0 keeps everything.
    pub audit_log_limit: usize,
}

impl Default for SlashingConfig {
    fn default() -> Self {
        Self {
            min_downtime_secs: 3600,
            audit_log_limit: 10_000,
        }
    }
}
