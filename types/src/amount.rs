//! Settlement-asset amount and basis-point arithmetic.
//!
//! Amounts are fixed-point integers (`u128`) in the smallest unit of the
//! settlement asset. All protocol arithmetic is integer multiply/add/sub;
//! there is no floating point anywhere in the accounting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// 10000 basis points = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// An amount of the settlement asset, in raw (smallest) units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
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

    pub fn checked_mul(self, factor: u128) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// The given basis-point fraction of this amount, rounded down.
    ///
    /// `bps` must already be validated to at most [`BPS_DENOMINATOR`], so the
    /// result never exceeds `self` and the multiply cannot overflow for any
    /// realistic asset supply.
    pub fn bps(self, bps: Bps) -> Self {
        Self(self.0 * bps.0 as u128 / BPS_DENOMINATOR as u128)
    }

    /// `self × numerator / denominator`, rounded down. Returns `None` on a
    /// zero denominator or multiply overflow.
    pub fn mul_div(self, numerator: Amount, denominator: Amount) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        self.0
            .checked_mul(numerator.0)
            .map(|p| Self(p / denominator.0))
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| Self(acc.0 + a.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A basis-point fraction, guaranteed ≤ 10000 at construction.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Bps(u32);

impl Bps {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(BPS_DENOMINATOR);

    /// Construct a validated fraction. Returns `None` above 10000 bps.
    pub fn new(bps: u32) -> Option<Self> {
        (bps <= BPS_DENOMINATOR).then_some(Self(bps))
    }

    /// Construct a known-good constant fraction.
    ///
    /// # Panics
    /// Panics above 10000 bps. Intended for literals in parameter defaults.
    pub const fn from_const(bps: u32) -> Self {
        assert!(bps <= BPS_DENOMINATOR);
        Self(bps)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The complementary fraction (`10000 − self`).
    pub fn complement(self) -> Self {
        Self(BPS_DENOMINATOR - self.0)
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}
