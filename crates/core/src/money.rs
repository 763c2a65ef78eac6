use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A currency amount held as an exact decimal.
///
/// Addition and subtraction saturate at the `Decimal` bounds instead of
/// panicking.
///
/// Serialized to JSON as a plain number (`4.5`, not `"4.50"`) so API clients
/// can do arithmetic on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    /// Largest amount, in currency units, accepted from text. Sums of many
    /// such amounts still fit in `i64` cents.
    pub const MAX_PARSED_UNITS: i64 = 1_000_000_000_000;

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Whole cents, or `None` when the amount does not fit in an `i64`.
    pub fn to_cents(self) -> Option<i64> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    /// Round to cents, halves away from zero (`2.345` → `2.35`).
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Parse a plain decimal literal such as `"4.29"`. Thousands separators
    /// and currency symbols are not accepted, nor are amounts whose magnitude
    /// exceeds [`Money::MAX_PARSED_UNITS`].
    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str(s.trim())
            .ok()
            .filter(|d| d.abs() <= Decimal::from(Self::MAX_PARSED_UNITS))
            .map(Money)
    }

    /// Split an amount evenly across `qty` units, rounded to cents.
    /// A zero quantity leaves the amount unchanged.
    pub fn per_unit(self, qty: u32) -> Self {
        if qty == 0 {
            return Money::from_decimal(self.0);
        }
        Money::from_decimal(self.0 / Decimal::from(qty))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
