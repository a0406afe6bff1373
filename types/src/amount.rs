//! TIA amount type.
//!
//! Amounts are fixed-point integers (u64) in the smallest unit (utia) to
//! avoid floating-point errors. 1 TIA = 1_000_000 utia.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A TIA amount in utia (micro-TIA).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TiaAmount(u64);

/// Number of utia in one TIA.
pub const UTIA_PER_TIA: u64 = 1_000_000;

impl TiaAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(utia: u64) -> Self {
        Self(utia)
    }

    /// Construct from whole TIA. Saturates on overflow.
    pub fn from_tia(tia: u64) -> Self {
        Self(tia.saturating_mul(UTIA_PER_TIA))
    }

    pub fn utia(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Sum an iterator of amounts, returning `None` on overflow.
    pub fn checked_sum(amounts: impl Iterator<Item = Self>) -> Option<Self> {
        let mut total = Self::ZERO;
        for a in amounts {
            total = total.checked_add(a)?;
        }
        Some(total)
    }
}

impl Add for TiaAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TiaAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for TiaAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} utia", self.0)
    }
}
