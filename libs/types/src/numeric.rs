//! Tick-based numeric types for prices and quantities
//!
//! Prices and quantities are unsigned 64-bit tick counts. Integer ticks keep
//! every computation exact and deterministic; scaling to display units is a
//! presentation concern outside this library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Price in integer ticks.
///
/// `Price::MAX` is the unbounded sentinel used for market-order slippage
/// limits. Market and stop orders carry `Price::ZERO` in their price field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);
    /// Unbounded sentinel (no slippage limit).
    pub const MAX: Price = Price(u64::MAX);

    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Price {
    fn from(ticks: u64) -> Self {
        Self(ticks)
    }
}

/// Quantity in integer units.
///
/// `Quantity::MAX` is the unbounded sentinel used for the max-visible
/// quantity of regular (non-iceberg) orders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    /// Unbounded sentinel (no visibility cap).
    pub const MAX: Quantity = Quantity(u64::MAX);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn min(self, other: Quantity) -> Quantity {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    pub const fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_sub(other.0))
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Quantity {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_ordering() {
        assert!(Price::new(100) < Price::new(200));
        assert!(Price::ZERO < Price::MAX);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let mut q = Quantity::new(100);
        q += Quantity::new(50);
        assert_eq!(q, Quantity::new(150));
        q -= Quantity::new(150);
        assert!(q.is_zero());
    }

    #[test]
    fn test_quantity_min_and_saturating_sub() {
        assert_eq!(Quantity::new(3).min(Quantity::new(7)), Quantity::new(3));
        assert_eq!(
            Quantity::new(3).saturating_sub(Quantity::new(7)),
            Quantity::ZERO
        );
    }
}
