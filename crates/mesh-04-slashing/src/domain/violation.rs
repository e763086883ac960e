//! Slashable offenses and the fixed punishment table.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Signed two different blocks at the same height
    DoubleSign,
    /// Voted for two different proposals in the same round
    DoubleVote,
    /// Extended unavailability
    Downtime,
    /// Refused to include valid transactions
    Censorship,
    /// Block produced outside its window
    LateBlock,
    /// Bad signature, possibly a software bug
    InvalidSignature,
}

impl ViolationType {
    pub const ALL: [ViolationType; 6] = [
        ViolationType::DoubleSign,
        ViolationType::DoubleVote,
        ViolationType::Downtime,
        ViolationType::Censorship,
        ViolationType::LateBlock,
        ViolationType::InvalidSignature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::DoubleSign => "DOUBLE_SIGN",
            ViolationType::DoubleVote => "DOUBLE_VOTE",
            ViolationType::Downtime => "DOWNTIME",
            ViolationType::Censorship => "CENSORSHIP",
            ViolationType::LateBlock => "LATE_BLOCK",
            ViolationType::InvalidSignature => "INVALID_SIGNATURE",
        }
    }

    /// Offenses proven by two conflicting signed headers.
    pub fn is_equivocation(&self) -> bool {
        matches!(self, ViolationType::DoubleSign | ViolationType::DoubleVote)
    }

    pub fn rule(&self) -> SlashingRule {
        rule_for(*self)
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status consequence of a proven offense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlashingAction {
    Warn,
    Probation,
    Ban,
}

impl fmt::Display for SlashingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlashingAction::Warn => "WARN",
            SlashingAction::Probation => "PROBATION",
            SlashingAction::Ban => "BAN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashingRule {
    pub action: SlashingAction,
    /// Share of the accused's current stake removed, 0-100.
    pub slash_percent: u8,
    pub description: &'static str,
}

impl SlashingRule {
    /// Stake removed from `stake` under this rule, rounded down.
    pub fn slash_amount(&self, stake: u64) -> u64 {
        let amount = u128::from(stake) * u128::from(self.slash_percent) / 100;
        amount as u64
    }
}

/// The punishment table. Equivocation is never forgiven: full slash and a
/// permanent ban, no probation.
pub const fn rule_for(violation: ViolationType) -> SlashingRule {
    match violation {
        ViolationType::DoubleSign => SlashingRule {
            action: SlashingAction::Ban,
            slash_percent: 100,
            description: "Signed conflicting blocks",
        },
        ViolationType::DoubleVote => SlashingRule {
            action: SlashingAction::Ban,
            slash_percent: 100,
            description: "Voted for conflicting proposals",
        },
        ViolationType::Downtime => SlashingRule {
            action: SlashingAction::Probation,
            slash_percent: 10,
            description: "Extended downtime affecting consensus",
        },
        ViolationType::Censorship => SlashingRule {
            action: SlashingAction::Probation,
            slash_percent: 25,
            description: "Transaction censorship detected",
        },
        ViolationType::LateBlock => SlashingRule {
            action: SlashingAction::Warn,
            slash_percent: 0,
            description: "Block produced late",
        },
        ViolationType::InvalidSignature => SlashingRule {
            action: SlashingAction::Warn,
            slash_percent: 0,
            description: "Invalid signature (possible software bug)",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivocation_is_full_slash_and_ban() {
        for violation in [ViolationType::DoubleSign, ViolationType::DoubleVote] {
            let rule = violation.rule();
            assert_eq!(rule.action, SlashingAction::Ban);
            assert_eq!(rule.slash_percent, 100);
            assert!(violation.is_equivocation());
        }
    }

    #[test]
    fn test_minor_violations_never_slash() {
        for violation in [ViolationType::LateBlock, ViolationType::InvalidSignature] {
            let rule = violation.rule();
            assert_eq!(rule.action, SlashingAction::Warn);
            assert_eq!(rule.slash_amount(1_000_000), 0);
        }
    }

    #[test]
    fn test_partial_slash_rounds_down() {
        assert_eq!(ViolationType::Downtime.rule().slash_amount(50_005), 5_000);
        assert_eq!(ViolationType::Censorship.rule().slash_amount(10_001), 2_500);
        assert_eq!(ViolationType::DoubleSign.rule().slash_amount(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_wire_names() {
        for violation in ViolationType::ALL {
            assert_eq!(
                serde_json::to_string(&violation).unwrap(),
                format!("\"{violation}\"")
            );
        }
    }
}
