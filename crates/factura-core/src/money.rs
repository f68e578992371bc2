//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  The SAT validates every amount on a CFDI to the centavo. A sum that   │
//! │  drifts by 0.000000001 prints fine but a subtotal rebuilt from floats  │
//! │  can round the other way and the document is rejected.                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    Every amount is rounded to 2 decimals ONCE, when it is derived,     │
//! │    and stored as an integer. Sums of those integers are exact.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities and tax rates are not money: they are exact decimals
//! ([`rust_decimal::Decimal`]) and only become `Money` through
//! [`Money::multiply_quantity`] and [`Money::calculate_tax`], which round.
//!
//! ## Usage
//! ```rust
//! use factura_core::money::Money;
//!
//! // Create from centavos (preferred)
//! let price = Money::from_cents(1099); // $10.99
//!
//! // Arithmetic operations
//! let total = price + Money::from_cents(500); // $15.99
//! assert_eq!(total.cents(), 1599);
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding
// =============================================================================

/// Rounds a decimal to 2 places, half away from zero.
///
/// ## Examples
/// ```text
/// 0.825  → 0.83
/// 0.824  → 0.82
/// -0.825 → -0.83
/// ```
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in centavos.
///
/// ## Design Decisions
/// - **i64 (signed)**: Negative values are representable so the validator
///   can reject them, not so the engine can produce them
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  LineItem.unit_price ──► × quantity ──► LineItem.amount                 │
/// │                                              │                          │
/// │                                              ├──► × rate ──► TaxCharge  │
/// │                                              ▼                          │
/// │  Invoice.subtotal  +  Invoice.total_tax  =  Invoice.total              │
/// │                                                                         │
/// │  EVERY amount on the CFDI flows through this type                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a decimal amount, rounding to centavos.
    ///
    /// Saturates at `i64::MIN`/`i64::MAX` centavos instead of wrapping.
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let amount = Money::from_decimal(Decimal::new(8255, 3)); // 8.255
    /// assert_eq!(amount.cents(), 826);
    /// ```
    pub fn from_decimal(value: Decimal) -> Self {
        let mut rounded = round2(value);
        let limit = Decimal::from(i64::MAX) / Decimal::ONE_HUNDRED;
        if rounded.abs() > limit {
            return Money::saturated(rounded.is_sign_negative());
        }
        rounded.rescale(2);
        let cents = rounded.mantissa();
        Money(i64::try_from(cents).unwrap_or(if cents < 0 { i64::MIN } else { i64::MAX }))
    }

    /// Returns the exact decimal value with a scale of 2 (e.g. `16.00`).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-peso portion.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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

    /// Calculates a tax charge on this amount.
    ///
    /// `round2(self × rate / 100)`. The result is the value used downstream;
    /// document totals are sums of these already-rounded charges.
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::money::Money;
    /// use factura_core::types::TaxRate;
    ///
    /// let base = Money::from_cents(1000); // $10.00
    /// let tax = base.calculate_tax(TaxRate::from_percent(16));
    /// assert_eq!(tax.cents(), 160);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.to_decimal()
            .checked_mul(rate.fraction())
            .map(Money::from_decimal)
            .unwrap_or_else(|| Money::saturated(self.is_negative() != rate.is_negative()))
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// let amount = unit_price.multiply_quantity(Decimal::new(15, 1)); // × 1.5
    /// assert_eq!(amount.cents(), 449); // 4.485 → 4.49
    /// ```
    pub fn multiply_quantity(&self, quantity: Decimal) -> Money {
        self.to_decimal()
            .checked_mul(quantity)
            .map(Money::from_decimal)
            .unwrap_or_else(|| Money::saturated(self.is_negative() != quantity.is_sign_negative()))
    }

    /// Checks if the value hit an `i64` bound while being derived.
    ///
    /// Such a value no longer equals the product or sum it stands for.
    #[inline]
    pub const fn is_saturated(&self) -> bool {
        self.0 == i64::MAX || self.0 == i64::MIN
    }

    fn saturated(negative: bool) -> Money {
        if negative {
            Money(i64::MIN)
        } else {
            Money(i64::MAX)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs. The CFDI markup uses [`Money::to_decimal`] instead,
/// which never carries a currency sign.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.pesos().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    /// Saturates at the `i64` bounds, so a saturated line never wraps a total.
    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.pesos(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_to_decimal_keeps_two_places() {
        assert_eq!(Money::from_cents(1600).to_decimal().to_string(), "16.00");
        assert_eq!(Money::from_cents(5).to_decimal().to_string(), "0.05");
    }

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(Decimal::new(825, 3)).cents(), 83);
        assert_eq!(Money::from_decimal(Decimal::new(824, 3)).cents(), 82);
        assert_eq!(Money::from_decimal(Decimal::new(-825, 3)).cents(), -83);
        assert_eq!(Money::from_decimal(Decimal::new(16, 0)).cents(), 1600);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_tax_calculation_basic() {
        let amount = Money::from_cents(10000);
        let tax = amount.calculate_tax(TaxRate::from_percent(16));
        assert_eq!(tax.cents(), 1600);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // $10.00 at 8.25% = $0.825 → $0.83
        let amount = Money::from_cents(1000);
        let tax = amount.calculate_tax(TaxRate::new(Decimal::new(825, 2)));
        assert_eq!(tax.cents(), 83);
    }

    #[test]
    fn test_tax_calculation_six_decimal_rate() {
        // ISR retention at 10.6667% on $1,000.00 = 106.667 → 106.67
        let amount = Money::from_cents(100_000);
        let tax = amount.calculate_tax(TaxRate::new(Decimal::new(106667, 4)));
        assert_eq!(tax.cents(), 10667);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.multiply_quantity(Decimal::from(3)).cents(), 897);
        assert_eq!(
            unit_price.multiply_quantity(Decimal::new(333, 3)).cents(),
            100 // 0.99567 → 1.00
        );
    }

    #[test]
    fn test_multiply_quantity_saturates() {
        let huge = Money::from_cents(i64::MAX);
        assert_eq!(huge.multiply_quantity(Decimal::MAX).cents(), i64::MAX);
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let huge = Money::from_cents(i64::MAX);
        let tax = Money::from_cents(1_600);

        assert_eq!((huge + tax).cents(), i64::MAX);
        assert!((huge + tax).is_saturated());
        assert_eq!((Money::from_cents(i64::MIN) - tax).cents(), i64::MIN);

        let mut total = huge;
        total += tax;
        assert_eq!(total, huge);

        let sum: Money = [huge, huge, tax].iter().sum();
        assert!(sum.is_saturated());
        assert!(!tax.is_saturated());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
    }
}
