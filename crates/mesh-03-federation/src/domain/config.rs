//! Federation parameters and proposed changes to them.

use super::error::{PolicyError, PolicyResult};
use super::quorum::QuorumFraction;
use serde::{Deserialize, Serialize};
use shared_types::{ContentHash, Timestamp};
use std::time::Duration;

const DAY_SECS: u64 = 86_400;

/// Governance parameters in force for one federation.
///
/// `version`, `last_updated` and `update_hash` are maintained by
/// [`FederationPolicy`](super::FederationPolicy); values supplied in a config
/// file are overwritten when the policy is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum stake a peering contract must commit.
    pub min_stake: u64,
    /// Uptime a member must sustain, in percent.
    pub min_uptime_percent: f64,
    /// Stake lock after voluntary exit.
    pub unbonding_period_secs: u64,
    /// Observation window after probation.
    pub probation_period_secs: u64,
    /// Fraction of ACTIVE members needed to change policy.
    pub policy_quorum: QuorumFraction,
    /// Fraction of ACTIVE members needed for ordinary decisions.
    pub tx_quorum: QuorumFraction,
    /// Warnings after which an ACTIVE node is put on probation.
    pub warning_threshold: u32,
    /// Lifetime of an open proposal.
    pub proposal_ttl_secs: u64,
    pub version: u64,
    pub last_updated: Timestamp,
    pub update_hash: ContentHash,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_stake: 10_000,
            min_uptime_percent: 99.9,
            unbonding_period_secs: 7 * DAY_SECS,
            probation_period_secs: 3 * DAY_SECS,
            policy_quorum: QuorumFraction::TWO_THIRDS,
            tx_quorum: QuorumFraction::ONE_HALF,
            warning_threshold: 3,
            proposal_ttl_secs: 7 * DAY_SECS,
            version: 1,
            last_updated: Timestamp::default(),
            update_hash: ContentHash::ZERO,
        }
    }
}

/// Hashed view of the config; bookkeeping timestamps stay out.
#[derive(Serialize)]
struct HashedParameters<'a> {
    min_stake: u64,
    min_uptime_percent: f64,
    unbonding_period_secs: u64,
    probation_period_secs: u64,
    policy_quorum: &'a QuorumFraction,
    tx_quorum: &'a QuorumFraction,
    warning_threshold: u32,
    proposal_ttl_secs: u64,
    version: u64,
}

impl PolicyConfig {
    /// Check every invariant the federation relies on.
    ///
    /// Policy changes must need strictly more agreement than ordinary
    /// decisions.
    pub fn validate(&self) -> PolicyResult<()> {
        self.policy_quorum.validate()?;
        self.tx_quorum.validate()?;

        if self.policy_quorum <= self.tx_quorum {
            return Err(PolicyError::InvalidConfig(format!(
                "policy_quorum ({}) must exceed tx_quorum ({})",
                self.policy_quorum, self.tx_quorum
            )));
        }
        if !(0.0..=100.0).contains(&self.min_uptime_percent) {
            return Err(PolicyError::InvalidConfig(format!(
                "min_uptime_percent must be within 0-100, got {}",
                self.min_uptime_percent
            )));
        }
        if self.warning_threshold == 0 {
            return Err(PolicyError::InvalidConfig(
                "warning_threshold must be positive".into(),
            ));
        }
        if self.proposal_ttl_secs == 0 {
            return Err(PolicyError::InvalidConfig(
                "proposal_ttl_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// SHA-256 over the governance parameters and version.
    pub fn compute_hash(&self) -> PolicyResult<ContentHash> {
        let params = HashedParameters {
            min_stake: self.min_stake,
            min_uptime_percent: self.min_uptime_percent,
            unbonding_period_secs: self.unbonding_period_secs,
            probation_period_secs: self.probation_period_secs,
            policy_quorum: &self.policy_quorum,
            tx_quorum: &self.tx_quorum,
            warning_threshold: self.warning_threshold,
            proposal_ttl_secs: self.proposal_ttl_secs,
            version: self.version,
        };
        Ok(shared_crypto::hash_canonical(&params)?)
    }

    /// This config with `changes` applied. Version and hash are untouched.
    pub fn with_changes(&self, changes: &PolicyChanges) -> PolicyConfig {
        let mut next = self.clone();
        if let Some(v) = changes.min_stake {
            next.min_stake = v;
        }
        if let Some(v) = changes.min_uptime_percent {
            next.min_uptime_percent = v;
        }
        if let Some(v) = changes.unbonding_period_secs {
            next.unbonding_period_secs = v;
        }
        if let Some(v) = changes.probation_period_secs {
            next.probation_period_secs = v;
        }
        if let Some(v) = changes.policy_quorum {
            next.policy_quorum = v;
        }
        if let Some(v) = changes.tx_quorum {
            next.tx_quorum = v;
        }
        if let Some(v) = changes.warning_threshold {
            next.warning_threshold = v;
        }
        if let Some(v) = changes.proposal_ttl_secs {
            next.proposal_ttl_secs = v;
        }
        next
    }

    pub fn unbonding_period(&self) -> Duration {
        Duration::from_secs(self.unbonding_period_secs)
    }

    pub fn probation_period(&self) -> Duration {
        Duration::from_secs(self.probation_period_secs)
    }

    pub fn proposal_ttl(&self) -> Duration {
        Duration::from_secs(self.proposal_ttl_secs)
    }
}

/// Parameter changes carried by a proposal. Unset fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stake: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_uptime_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unbonding_period_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probation_period_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_quorum: Option<QuorumFraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_quorum: Option<QuorumFraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_ttl_secs: Option<u64>,
}

impl PolicyChanges {
    pub fn min_stake(value: u64) -> Self {
        Self {
            min_stake: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
