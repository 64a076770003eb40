//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  GST extraction divides by (1 + rate), so every line produces a        │
//! │  fraction of a paisa that must be rounded exactly once.                │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    ₹1180.00 = 118000 paise                                              │
//! │    118000 × 10000 / 11800 = 100000 paise exactly                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Boundary
//! The SQLite columns hold `REAL` rupees so that database files written by
//! earlier releases stay readable. [`Money::from_decimal`] and
//! [`Money::to_decimal`] are the only places a float touches a `Money`.
//! JSON payloads and backup dumps use the same decimal rupee form, so a
//! `Money` serializes as `1180.0`, not `118000`.
//!
//! ## Usage
//! ```rust
//! use dukaan_core::money::Money;
//!
//! let price = Money::from_paise(4_999); // ₹49.99
//! let line = price.multiply_quantity(3); // ₹149.97
//! assert_eq!(line.paise(), 14_997);
//! assert_eq!(line.to_string(), "₹149.97");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: allows negative values for adjustments
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serde**: decimal rupees on the wire, see the module docs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_rupees(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Converts a decimal rupee amount read from storage or JSON.
    ///
    /// Rounds half away from zero to the nearest paisa. Non-finite input
    /// maps to zero.
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(1180.0).paise(), 118_000);
    /// assert_eq!(Money::from_decimal(12.345).paise(), 1_235);
    /// ```
    pub fn from_decimal(rupees: f64) -> Self {
        if !rupees.is_finite() {
            return Money::zero();
        }
        // Nudge by a tiny epsilon so that binary representations such as
        // 12.345 (really 12.3449999...) round the way a cashier expects.
        let scaled = rupees * 100.0;
        let nudged = scaled + scaled.signum() * 1e-7;
        Money(nudged.round() as i64)
    }

    /// Returns the value as decimal rupees for storage.
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
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

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(2_000); // ₹20.00
    /// assert_eq!(unit_price.multiply_quantity(3).paise(), 6_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Splits the amount in two, rounding half away from zero.
    ///
    /// Both halves of a GST amount use this, so an odd paisa produces two
    /// equal halves whose sum exceeds the original by one paisa.
    ///
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(18_000).half().paise(), 9_000);
    /// assert_eq!(Money::from_paise(181).half().paise(), 91);
    /// ```
    #[inline]
    pub fn half(&self) -> Money {
        Money(div_round_half_up(self.0 as i128, 2) as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (1000 = 10%)
    ///
    /// ## Example
    /// ```rust
    /// use dukaan_core::money::Money;
    ///
    /// let mrp = Money::from_paise(10_000); // ₹100.00
    /// assert_eq!(mrp.apply_percentage_discount(1000).paise(), 9_000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let discount = div_round_half_up(self.0 as i128 * discount_bps as i128, 10_000);
        Money(self.0 - discount as i64)
    }
}

/// Integer division rounding half away from zero. `denom` must be positive.
pub(crate) fn div_round_half_up(numer: i128, denom: i128) -> i128 {
    debug_assert!(denom > 0);
    if numer >= 0 {
        (2 * numer + denom) / (2 * denom)
    } else {
        -((-2 * numer + denom) / (2 * denom))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `₹12.34`. Locale-specific grouping (lakh/crore)
/// is left to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rupees = f64::deserialize(deserializer)?;
        Ok(Money::from_decimal(rupees))
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
