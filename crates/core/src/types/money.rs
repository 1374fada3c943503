//! Kenyan shilling amounts using decimal arithmetic.
//!
//! Every price shown by the storefront is a snapshot of what the AutoParts
//! API returned. The API emits decimals either as JSON numbers or as strings
//! (`"1500.00"`), so deserialization accepts both.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in Kenyan shillings (KES).
///
/// ## Examples
///
/// ```
/// use autoparts_core::Ksh;
///
/// let brake_pads = Ksh::from_shillings(1_500);
/// assert_eq!(brake_pads.times(2).display(), "KSh 3,000");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ksh(Decimal);

impl Ksh {
    /// Currency symbol used on every customer-facing surface.
    pub const SYMBOL: &'static str = "KSh";

    /// Create an amount from a decimal number of shillings.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Zero shillings.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Create an amount from whole shillings.
    #[must_use]
    pub fn from_shillings(shillings: i64) -> Self {
        Self(Decimal::from(shillings))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Line total for `quantity` units at this unit price.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Price after a percentage discount.
    ///
    /// Discounts outside `(0, 100]` leave the price unchanged.
    #[must_use]
    pub fn discounted(&self, percent: Decimal) -> Self {
        if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return *self;
        }
        let factor = Decimal::ONE - percent / Decimal::ONE_HUNDRED;
        Self((self.0 * factor).round_dp(2))
    }

    /// Whole shillings, rounded half away from zero.
    ///
    /// M-Pesa only accepts integer amounts.
    #[must_use]
    pub fn rounded_shillings(&self) -> i64 {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0)
    }

    /// Format with the `KSh` symbol, e.g. `KSh 1,499.5`.
    #[must_use]
    pub fn display(&self) -> String {
        let body = self.display_plain();
        body.strip_prefix('-').map_or_else(
            || format!("{} {body}", Self::SYMBOL),
            |unsigned| format!("-{} {unsigned}", Self::SYMBOL),
        )
    }

    /// Format without the symbol, e.g. `1,499.5`.
    ///
    /// Uses zero to two fraction digits and comma thousands separators.
    #[must_use]
    pub fn display_plain(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        let text = rounded.abs().to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        if fraction.is_empty() {
            format!("{sign}{grouped}")
        } else {
            format!("{sign}{grouped}.{fraction}")
        }
    }
}

impl fmt::Display for Ksh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Ksh {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Ksh {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Ksh {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Ksh {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Self> for Ksh {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn ksh(s: &str) -> Ksh {
        Ksh::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_display_whole_amounts() {
        assert_eq!(Ksh::from_shillings(0).display(), "KSh 0");
        assert_eq!(Ksh::from_shillings(950).display(), "KSh 950");
        assert_eq!(Ksh::from_shillings(1_500).display(), "KSh 1,500");
        assert_eq!(Ksh::from_shillings(1_250_000).display(), "KSh 1,250,000");
    }

    #[test]
    fn test_display_fractional_amounts() {
        assert_eq!(ksh("1499.50").display(), "KSh 1,499.5");
        assert_eq!(ksh("12.345").display(), "KSh 12.35");
        assert_eq!(ksh("1500.00").display(), "KSh 1,500");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(Ksh::from_shillings(-2_500).display(), "-KSh 2,500");
    }

    #[test]
    fn test_display_plain_has_no_symbol() {
        assert_eq!(Ksh::from_shillings(3_000).display_plain(), "3,000");
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [Ksh::from_shillings(500).times(3), ksh("99.99").times(2)];
        let total: Ksh = lines.iter().sum();
        assert_eq!(total, ksh("1699.98"));
    }

    #[test]
    fn test_discounted() {
        let price = Ksh::from_shillings(2_000);
        assert_eq!(price.discounted(Decimal::from(15)), Ksh::from_shillings(1_700));
        assert_eq!(price.discounted(Decimal::ZERO), price);
        assert_eq!(price.discounted(Decimal::from(150)), price);
    }

    #[test]
    fn test_rounded_shillings() {
        assert_eq!(ksh("16500.49").rounded_shillings(), 16_500);
        assert_eq!(ksh("16500.50").rounded_shillings(), 16_501);
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Ksh = serde_json::from_str("1500").unwrap();
        let from_string: Ksh = serde_json::from_str("\"1500.00\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
