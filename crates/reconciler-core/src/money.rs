//! # Money Module
//!
//! Provides the `Money` type for handling budget amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    1.005 × 100 = 100.49999999999999  → $1.005 rounds DOWN  ❌           │
//! │                                                                         │
//! │  The reconciler already rounds every category field on purpose.        │
//! │  Float artifacts on top of that make the residual unpredictable.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + exact ratios                             │
//! │    Every amount is an i64 count of cents.                               │
//! │    Every product with a rate or a scaling factor is an exact           │
//! │    rational, rounded exactly once into cents.                          │
//! │    Products are computed in i128 and checked on the way back to i64.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use reconciler_core::money::Money;
//!
//! let drywall = Money::from_cents(125_050); // $1,250.50
//! let paint = Money::from_major_minor(480, 0);
//!
//! let subtotal = drywall + paint;
//! assert_eq!(subtotal.cents(), 173_050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator / denominator` and rounds half up (toward +infinity).
///
/// `denominator` must be positive. Negative halves round toward zero,
/// positive halves away from it: `-0.5 → 0`, `0.5 → 1`, `2.5 → 3`.
/// Never overflows: the remainder is compared against `denominator - rem`
/// instead of being doubled.
#[inline]
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let quotient = numerator.div_euclid(denominator);
    let remainder = numerator.rem_euclid(denominator);
    if remainder >= denominator - remainder {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A currency amount in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: residual adjustments are negative more often than not
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as cents**: `{"materialPre": 125050}` is $1,250.50
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  definitive_total ──► O&P ──► scaling factor                            │
/// │                                                                         │
/// │  material_pre ──► material_scaled ──┬──► total_scaled ──► subtotal     │
/// │  labor_pre    ──► labor_scaled   ───┘                                   │
/// │                                                                         │
/// │  Σ material_scaled ──► material_tax                                     │
/// │                                                                         │
/// │  subtotal + material_tax + O&P ──► grand_total                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::money::Money;
    ///
    /// let amount = Money::from_cents(500_000); // $5,000.00
    /// assert_eq!(amount.cents(), 500_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dollars and cents.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -$5.50.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(852, 62).cents(), 85_262);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Checked addition. `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Checked subtraction. `None` on i64 overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, `None` if any partial sum overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Multiplies by a rate and rounds to the cent, using the rate's exact
    /// fraction. `None` when the result does not fit in i64 cents.
    ///
    /// This is the only way a rate touches money: O&P on the definitive
    /// total and sales tax on the scaled material subtotal both go through
    /// here, so both share one rounding rule.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::money::Money;
    /// use reconciler_core::types::Rate;
    ///
    /// // 7% of $1,278.93 = $89.5251 → $89.53
    /// let materials = Money::from_cents(127_893);
    /// assert_eq!(materials.apply_rate(Rate::from_bps(700)), Some(Money::from_cents(8_953)));
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Option<Money> {
        // i64 × u64 always fits in i128.
        self.mul_ratio(rate.numerator() as i128, rate.denominator() as i128)
    }

    /// Multiplies by the exact ratio `numerator / denominator` and rounds to
    /// the cent. `denominator` must be positive. `None` on overflow.
    pub(crate) fn mul_ratio(&self, numerator: i128, denominator: i128) -> Option<Money> {
        let product = (self.0 as i128).checked_mul(numerator)?;
        let cents = div_round_half_up(product, denominator);
        i64::try_from(cents).ok().map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. Use the session's currency formatter for UI text.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
