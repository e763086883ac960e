//! Exact quorum fractions.
//!
//! Thresholds are rationals so `floor(N * q) + 1` is computed in integers.

use super::error::{PolicyError, PolicyResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A fraction in `(0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuorumFraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl QuorumFraction {
    /// Two thirds, the default policy quorum.
    pub const TWO_THIRDS: QuorumFraction = QuorumFraction {
        numerator: 2,
        denominator: 3,
    };

    /// One half, the default transaction quorum.
    pub const ONE_HALF: QuorumFraction = QuorumFraction {
        numerator: 1,
        denominator: 2,
    };

    pub fn new(numerator: u32, denominator: u32) -> PolicyResult<Self> {
        let fraction = Self {
            numerator,
            denominator,
        };
        fraction.validate()?;
        Ok(fraction)
    }

    pub fn validate(&self) -> PolicyResult<()> {
        if self.denominator == 0 {
            return Err(PolicyError::InvalidConfig(format!(
                "quorum {self} has a zero denominator"
            )));
        }
        if self.numerator == 0 || self.numerator > self.denominator {
            return Err(PolicyError::InvalidConfig(format!(
                "quorum {self} must lie in (0, 1]"
            )));
        }
        Ok(())
    }

    /// Votes needed among `members`: `floor(members * q) + 1`, capped at
    /// `members` so a unanimous fraction stays reachable.
    pub fn required(&self, members: usize) -> usize {
        if self.denominator == 0 || members == 0 {
            return 0;
        }
        let members = members as u64;
        let floor = members * u64::from(self.numerator) / u64::from(self.denominator);
        (floor + 1).min(members) as usize
    }

    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl PartialEq for QuorumFraction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QuorumFraction {}

impl PartialOrd for QuorumFraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QuorumFraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.numerator) * u64::from(other.denominator);
        let rhs = u64::from(other.numerator) * u64::from(self.denominator);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for QuorumFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
