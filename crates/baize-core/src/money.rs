//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                          │
//! │                                                                      │
//! │  In floating point:                                                  │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                        │
//! │                                                                      │
//! │  OUR SOLUTION: i64 whole currency units                              │
//! │    Hall tariffs are quoted in whole units (a game is 1000, a snack   │
//! │    is 500) - there is no sub-unit anywhere in the tariff sheet, so   │
//! │    one unit IS the smallest denomination.                            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use baize_core::money::Money;
//!
//! let game = Money::from_units(1000);
//! let total = game * 5 + Money::from_units(500);
//! assert_eq!(total.units(), 5500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: settlement deltas and corrections can go negative
/// - **Single-field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support, serialized as a bare number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use baize_core::money::Money;
    ///
    /// let price = Money::from_units(1000);
    /// assert_eq!(price.units(), 1000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Subtraction clamped at zero.
    ///
    /// Expected totals never go below zero even when a configured discount
    /// exceeds the bill.
    ///
    /// ## Example
    /// ```rust
    /// use baize_core::money::Money;
    ///
    /// let bill = Money::from_units(400);
    /// let discount = Money::from_units(500);
    /// assert_eq!(bill.saturating_sub(discount), Money::zero());
    /// ```
    #[inline]
    pub const fn saturating_sub(&self, other: Self) -> Self {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }

    /// Returns the smaller of two values.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// Multiplies by a quantity (games played, item count).
    ///
    /// ## Example
    /// ```rust
    /// use baize_core::money::Money;
    ///
    /// let per_game = Money::from_units(1000);
    /// assert_eq!(per_game.multiply_quantity(5).units(), 5000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug/log formatting. The frontend formats for display; this is for
/// tracing fields and test assertions.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summing line totals and group balances.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
