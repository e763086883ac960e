//! Trust levels and ban reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a node is trusted. Ordered: every level grants what the levels
/// below it grant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustLevel {
    /// Rejected everywhere. Only reachable through a ban proof.
    Banned = 0,
    #[default]
    Unknown = 1,
    Pending = 2,
    Peer = 3,
    /// May co-sign quorum bans.
    Trusted = 4,
    /// May issue single-signer bans and revoke bans.
    Admin = 5,
    Founder = 6,
}

impl TrustLevel {
    pub const ALL: [TrustLevel; 7] = [
        TrustLevel::Banned,
        TrustLevel::Unknown,
        TrustLevel::Pending,
        TrustLevel::Peer,
        TrustLevel::Trusted,
        TrustLevel::Admin,
        TrustLevel::Founder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Banned => "BANNED",
            TrustLevel::Unknown => "UNKNOWN",
            TrustLevel::Pending => "PENDING",
            TrustLevel::Peer => "PEER",
            TrustLevel::Trusted => "TRUSTED",
            TrustLevel::Admin => "ADMIN",
            TrustLevel::Founder => "FOUNDER",
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BanReason {
    ProtocolViolation,
    DoubleSpend,
    /// Equivocation proven by the slashing engine
    DoubleSign,
    SybilAttack,
    Spam,
    MaliciousGossip,
    KeyCompromise,
    ManualBan,
    QuorumBan,
    FederationExpulsion,
}

impl BanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BanReason::ProtocolViolation => "PROTOCOL_VIOLATION",
            BanReason::DoubleSpend => "DOUBLE_SPEND",
            BanReason::DoubleSign => "DOUBLE_SIGN",
            BanReason::SybilAttack => "SYBIL_ATTACK",
            BanReason::Spam => "SPAM",
            BanReason::MaliciousGossip => "MALICIOUS_GOSSIP",
            BanReason::KeyCompromise => "KEY_COMPROMISE",
            BanReason::ManualBan => "MANUAL_BAN",
            BanReason::QuorumBan => "QUORUM_BAN",
            BanReason::FederationExpulsion => "FEDERATION_EXPULSION",
        }
    }
}

impl fmt::Display for BanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(TrustLevel::Banned < TrustLevel::Unknown);
        assert!(TrustLevel::Trusted < TrustLevel::Admin);
        assert!(TrustLevel::Admin < TrustLevel::Founder);
        for (value, level) in TrustLevel::ALL.iter().enumerate() {
            assert_eq!(usize::from(level.value()), value);
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&TrustLevel::Founder).unwrap(), "\"FOUNDER\"");
        assert_eq!(
            serde_json::to_string(&BanReason::QuorumBan).unwrap(),
            "\"QUORUM_BAN\""
        );
        assert_eq!(BanReason::DoubleSign.to_string(), "DOUBLE_SIGN");
    }
}
