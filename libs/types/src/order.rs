//! Order lifecycle types
//!
//! The `Order` value is the public command unit: it is what callers submit,
//! what the journal persists, and what snapshots carry. The engine tracks
//! execution progress in the `executed_quantity` / `leaves_quantity` pair,
//! which always sums to `quantity`.

use crate::ids::{OrderId, SymbolId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum OrderSide {
    Buy = 0,
    Sell = 1,
}

impl OrderSide {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OrderSide::Buy),
            1 => Some(OrderSide::Sell),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum OrderType {
    /// Executed at the best available price.
    Market = 0,
    /// Executed at a specific price or better.
    Limit = 1,
    /// Becomes a market order when the stop price is reached.
    Stop = 2,
    /// Becomes a limit order when the stop price is reached.
    StopLimit = 3,
    /// Stop order whose trigger price tracks the market.
    TrailingStop = 4,
    /// Stop-limit order whose trigger price tracks the market.
    TrailingStopLimit = 5,
}

impl OrderType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OrderType::Market),
            1 => Some(OrderType::Limit),
            2 => Some(OrderType::Stop),
            3 => Some(OrderType::StopLimit),
            4 => Some(OrderType::TrailingStop),
            5 => Some(OrderType::TrailingStopLimit),
            _ => None,
        }
    }
}

/// Time-in-force lifecycle policy.
///
/// Only the GTC semantics are enforced by the matching loop today; the other
/// variants are accepted and recorded but match as GTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum TimeInForce {
    /// Good-Till-Cancelled.
    Gtc = 0,
    /// Immediate-Or-Cancel.
    Ioc = 1,
    /// Fill-Or-Kill.
    Fok = 2,
    /// All-Or-None.
    Aon = 3,
}

impl TimeInForce {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TimeInForce::Gtc),
            1 => Some(TimeInForce::Ioc),
            2 => Some(TimeInForce::Fok),
            3 => Some(TimeInForce::Aon),
            _ => None,
        }
    }
}

/// A trading order.
///
/// Quantity bookkeeping invariant: `executed_quantity + leaves_quantity ==
/// quantity` at all times. The derived visible/hidden split supports iceberg
/// orders: `max_visible_quantity` of `Quantity::MAX` means fully visible,
/// zero means fully hidden, and anything below `leaves_quantity` caps the
/// displayed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol_id: SymbolId,
    pub order_type: OrderType,
    pub side: OrderSide,
    /// Limit price; zero for market and stop orders.
    pub price: Price,
    /// Trigger price; zero unless this is a stop variant.
    pub stop_price: Price,

    /// Total quantity, fixed at admission.
    pub quantity: Quantity,
    /// Quantity executed so far.
    pub executed_quantity: Quantity,
    /// Remaining quantity to be executed.
    pub leaves_quantity: Quantity,

    pub time_in_force: TimeInForce,

    /// Visibility cap for iceberg/hidden orders.
    pub max_visible_quantity: Quantity,
    /// Price tolerance for market orders; `Price::MAX` means unbounded.
    pub slippage: Price,

    /// Trailing distance for trailing stops. Positive values are absolute
    /// tick distances; negative values are percentages in 0.01% steps
    /// (-10000 = 100%).
    pub trailing_distance: i64,
    /// Minimum favourable move before the trailing stop price is updated.
    pub trailing_step: i64,
}

impl Order {
    /// Create an order with default GTC / fully-visible / unbounded-slippage
    /// settings. Execution state starts empty: `leaves == quantity`.
    pub fn new(
        id: OrderId,
        symbol_id: SymbolId,
        order_type: OrderType,
        side: OrderSide,
        price: Price,
        stop_price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            symbol_id,
            order_type,
            side,
            price,
            stop_price,
            quantity,
            executed_quantity: Quantity::ZERO,
            leaves_quantity: quantity,
            time_in_force: TimeInForce::Gtc,
            max_visible_quantity: Quantity::MAX,
            slippage: Price::MAX,
            trailing_distance: 0,
            trailing_step: 0,
        }
    }

    /// Create a limit order.
    pub fn limit(
        id: OrderId,
        symbol_id: SymbolId,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self::new(id, symbol_id, OrderType::Limit, side, price, Price::ZERO, quantity)
    }

    /// Create a market order.
    pub fn market(id: OrderId, symbol_id: SymbolId, side: OrderSide, quantity: Quantity) -> Self {
        Self::new(
            id,
            symbol_id,
            OrderType::Market,
            side,
            Price::ZERO,
            Price::ZERO,
            quantity,
        )
    }

    /// Create a stop order.
    pub fn stop(
        id: OrderId,
        symbol_id: SymbolId,
        side: OrderSide,
        stop_price: Price,
        quantity: Quantity,
    ) -> Self {
        Self::new(id, symbol_id, OrderType::Stop, side, Price::ZERO, stop_price, quantity)
    }

    /// Create a stop-limit order.
    pub fn stop_limit(
        id: OrderId,
        symbol_id: SymbolId,
        side: OrderSide,
        price: Price,
        stop_price: Price,
        quantity: Quantity,
    ) -> Self {
        Self::new(id, symbol_id, OrderType::StopLimit, side, price, stop_price, quantity)
    }

    /// Create a trailing stop order.
    pub fn trailing_stop(
        id: OrderId,
        symbol_id: SymbolId,
        side: OrderSide,
        stop_price: Price,
        quantity: Quantity,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        let mut order = Self::new(
            id,
            symbol_id,
            OrderType::TrailingStop,
            side,
            Price::ZERO,
            stop_price,
            quantity,
        );
        order.trailing_distance = trailing_distance;
        order.trailing_step = trailing_step;
        order
    }

    /// Create a trailing stop-limit order.
    pub fn trailing_stop_limit(
        id: OrderId,
        symbol_id: SymbolId,
        side: OrderSide,
        price: Price,
        stop_price: Price,
        quantity: Quantity,
        trailing_distance: i64,
        trailing_step: i64,
    ) -> Self {
        let mut order = Self::new(
            id,
            symbol_id,
            OrderType::TrailingStopLimit,
            side,
            price,
            stop_price,
            quantity,
        );
        order.trailing_distance = trailing_distance;
        order.trailing_step = trailing_step;
        order
    }

    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == OrderSide::Sell
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    pub fn is_stop(&self) -> bool {
        self.order_type == OrderType::Stop
    }

    pub fn is_stop_limit(&self) -> bool {
        self.order_type == OrderType::StopLimit
    }

    pub fn is_trailing_stop(&self) -> bool {
        self.order_type == OrderType::TrailingStop
    }

    pub fn is_trailing_stop_limit(&self) -> bool {
        self.order_type == OrderType::TrailingStopLimit
    }

    /// Hidden portion of the remaining quantity.
    pub fn hidden_quantity(&self) -> Quantity {
        self.leaves_quantity.saturating_sub(self.max_visible_quantity)
    }

    /// Displayed portion of the remaining quantity.
    pub fn visible_quantity(&self) -> Quantity {
        self.leaves_quantity.min(self.max_visible_quantity)
    }

    /// True when the order exposes no quantity at all.
    pub fn is_hidden(&self) -> bool {
        self.max_visible_quantity.is_zero()
    }

    /// True when the order caps its displayed size below its remainder.
    pub fn is_iceberg(&self) -> bool {
        !self.max_visible_quantity.is_zero() && self.max_visible_quantity < self.leaves_quantity
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order(id={}, symbol={}, type={:?}, side={:?}, price={}, stop={}, qty={}, executed={}, leaves={})",
            self.id,
            self.symbol_id,
            self.order_type,
            self.side,
            self.price,
            self.stop_price,
            self.quantity,
            self.executed_quantity,
            self.leaves_quantity,
        )
    }
}
