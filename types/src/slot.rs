//! Chain slot type.
//!
//! Slots are a monotonically increasing position on the chain timeline,
//! used as a proxy for block height/time when computing sync drift.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position on the chain timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot(u64);

impl Slot {
    /// The chain origin (slot zero).
    pub const GENESIS: Self = Self(0);

    pub fn new(slot: u64) -> Self {
        Self(slot)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Signed slot difference `self - other`.
    ///
    /// The tracked source can transiently be ahead of the reference source,
    /// so the result may be negative.
    pub fn signed_diff(&self, other: Slot) -> i64 {
        self.0 as i64 - other.0 as i64
    }
}

impl From<u64> for Slot {
    fn from(slot: u64) -> Self {
        Self(slot)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_diff_positive() {
        assert_eq!(Slot::new(1000).signed_diff(Slot::new(995)), 5);
    }

    #[test]
    fn signed_diff_negative_when_other_is_ahead() {
        assert_eq!(Slot::new(995).signed_diff(Slot::new(1000)), -5);
    }

    #[test]
    fn signed_diff_zero() {
        assert_eq!(Slot::new(42).signed_diff(Slot::new(42)), 0);
    }

    #[test]
    fn genesis_is_zero() {
        assert_eq!(Slot::GENESIS.as_u64(), 0);
    }

    #[test]
    fn ordering_follows_position() {
        assert!(Slot::new(1) < Slot::new(2));
    }
}
