//! Points - Non-negative integer wrapper for ledger amounts
//!
//! Balances can never go below zero. Debits that would overdraw an
//! account are floored with `saturating_sub`.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// A non-negative point amount.
///
/// # Example
/// ```
/// use cleancredit_core::Points;
///
/// let balance = Points::new(40);
/// assert_eq!(balance.saturating_sub(Points::new(50)), Points::ZERO);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Points(u64);

impl Points {
    /// Zero points
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Addition that reports overflow instead of wrapping
    pub fn checked_add(&self, other: Points) -> Result<Points, CoreError> {
        self.0
            .checked_add(other.0)
            .map(Points)
            .ok_or(CoreError::PointsOverflow)
    }

    /// Subtraction floored at zero
    pub fn saturating_sub(&self, other: Points) -> Points {
        Points(self.0.saturating_sub(other.0))
    }

    /// Convert from the signed representation used by SQLite
    pub fn from_i64(value: i64) -> Result<Points, CoreError> {
        u64::try_from(value)
            .map(Points)
            .map_err(|_| CoreError::NegativePoints(value))
    }

    /// Convert to the signed representation used by SQLite
    pub fn to_i64(&self) -> Result<i64, CoreError> {
        i64::try_from(self.0).map_err(|_| CoreError::PointsOverflow)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Points {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Points> for u64 {
    fn from(points: Points) -> Self {
        points.0
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Self {
        Points(iter.map(|p| p.0).sum())
    }
}
