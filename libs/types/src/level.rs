//! Price-level aggregates
//!
//! A level is the aggregate of all orders resting at one side and one price
//! of a book. The engine keeps the per-level volume counters in sync with
//! the FIFO order list it maintains internally; this type is the public,
//! copyable view handed to event handlers.

use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the book a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelSide {
    Bid,
    Ask,
}

/// Aggregate state of one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub side: LevelSide,
    pub price: Price,
    /// Sum of the leaves quantities of all orders on the level.
    pub total_volume: Quantity,
    /// Sum of the hidden quantities of all orders on the level.
    pub hidden_volume: Quantity,
    /// Sum of the visible quantities of all orders on the level.
    pub visible_volume: Quantity,
    /// Number of orders on the level.
    pub orders: u64,
}

impl Level {
    pub fn new(side: LevelSide, price: Price) -> Self {
        Self {
            side,
            price,
            total_volume: Quantity::ZERO,
            hidden_volume: Quantity::ZERO,
            visible_volume: Quantity::ZERO,
            orders: 0,
        }
    }

    pub fn is_bid(&self) -> bool {
        self.side == LevelSide::Bid
    }

    pub fn is_ask(&self) -> bool {
        self.side == LevelSide::Ask
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Level(side={:?}, price={}, volume={}, hidden={}, visible={}, orders={})",
            self.side, self.price, self.total_volume, self.hidden_volume, self.visible_volume, self.orders,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_level_is_empty() {
        let level = Level::new(LevelSide::Bid, Price::new(10_000));
        assert!(level.is_bid());
        assert_eq!(level.total_volume, Quantity::ZERO);
        assert_eq!(level.orders, 0);
    }
}
