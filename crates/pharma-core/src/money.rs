//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    ₹10.00 / 3 = ₹3.33 (×3 = ₹9.99)  → Lost ₹0.01!                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    1000 paise / 3 = 333 paise (×3 = 999 paise)                         │
//! │    We KNOW we lost 1 paisa, and handle it explicitly                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every MRP, net rate, and purchase/sale amount in the system flows
//! through this type; the database stores the raw paise value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use pharma_core::money::Money;
    ///
    /// let mrp = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(mrp.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rupees) portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 250 bps = 2.5% (a common pharmacy trade discount)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountRate(i32);

impl DiscountRate {
    /// Creates a discount rate from basis points.
    #[inline]
    pub const fn from_bps(bps: i32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round() as i32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> i32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Applies the discount to an MRP, rounding half-up to the paisa.
    ///
    /// A non-positive rate leaves the MRP unchanged; the pricing record
    /// may carry 0 (or a bad import may carry a negative value) and the
    /// sale price is then simply the MRP.
    ///
    /// ## Example
    /// ```rust
    /// use pharma_core::money::{DiscountRate, Money};
    ///
    /// let mrp = Money::from_paise(10_000); // ₹100.00
    /// let rate = DiscountRate::from_bps(250); // 2.5%
    /// assert_eq!(rate.apply(mrp), Money::from_paise(9_750));
    /// ```
    pub fn apply(&self, mrp: Money) -> Money {
        if self.0 <= 0 {
            return mrp;
        }
        let off = (mrp.paise() * self.0 as i64 + 5_000) / 10_000;
        Money::from_paise(mrp.paise() - off)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_paise(1099);
        let b = Money::from_paise(500);
        assert_eq!((a + b).paise(), 1599);
        assert_eq!((a - b).paise(), 599);
        assert_eq!((b * 3).paise(), 1500);
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [100, 250, 50].iter().map(|p| Money::from_paise(*p)).sum();
        assert_eq!(total.paise(), 400);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "10.99");
        assert_eq!(Money::from_paise(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_discount_apply() {
        let mrp = Money::from_paise(10_000);

        // 2.5% off ₹100.00 = ₹97.50
        assert_eq!(DiscountRate::from_bps(250).apply(mrp), Money::from_paise(9_750));

        // 10% off ₹10.99 = ₹9.89 (109.9 paise off, rounded to 110)
        let odd = Money::from_paise(1_099);
        assert_eq!(DiscountRate::from_bps(1_000).apply(odd), Money::from_paise(989));
    }

    #[test]
    fn test_non_positive_discount_leaves_mrp() {
        let mrp = Money::from_paise(1_234);
        assert_eq!(DiscountRate::zero().apply(mrp), mrp);
        assert_eq!(DiscountRate::from_bps(-100).apply(mrp), mrp);
    }

    #[test]
    fn test_discount_from_percentage() {
        assert_eq!(DiscountRate::from_percentage(2.5).bps(), 250);
    }
}
