//! Order book for a single symbol
//!
//! Six level indexes per book: bids and asks for resting limit orders,
//! buy/sell stop ladders, and buy/sell trailing-stop ladders. Each index
//! carries a cached best pointer so top-of-book reads are O(1).
//!
//! Stop and trailing-stop orders are routed by trigger price and rest on
//! their ladders; activation is not performed here.

use crate::pool::{NodeIndex, NodePool, NIL};
use crate::tree::LevelTree;
use types::prelude::*;

/// Per-symbol order book.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,

    best_bid: NodeIndex,
    best_ask: NodeIndex,
    bids: LevelTree,
    asks: LevelTree,

    best_buy_stop: NodeIndex,
    best_sell_stop: NodeIndex,
    buy_stops: LevelTree,
    sell_stops: LevelTree,

    best_trailing_buy_stop: NodeIndex,
    best_trailing_sell_stop: NodeIndex,
    trailing_buy_stops: LevelTree,
    trailing_sell_stops: LevelTree,

    last_bid_price: Price,
    last_ask_price: Price,
    matching_price: Price,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            best_bid: NIL,
            best_ask: NIL,
            bids: LevelTree::new(true),
            asks: LevelTree::new(false),
            best_buy_stop: NIL,
            best_sell_stop: NIL,
            buy_stops: LevelTree::new(false),
            sell_stops: LevelTree::new(true),
            best_trailing_buy_stop: NIL,
            best_trailing_sell_stop: NIL,
            trailing_buy_stops: LevelTree::new(false),
            trailing_sell_stops: LevelTree::new(true),
            last_bid_price: Price::ZERO,
            last_ask_price: Price::ZERO,
            matching_price: Price::ZERO,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Total number of price levels across all six indexes.
    pub fn size(&self) -> usize {
        self.bids.len()
            + self.asks.len()
            + self.buy_stops.len()
            + self.sell_stops.len()
            + self.trailing_buy_stops.len()
            + self.trailing_sell_stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn best_bid(&self) -> NodeIndex {
        self.best_bid
    }

    pub fn best_ask(&self) -> NodeIndex {
        self.best_ask
    }

    pub fn best_buy_stop(&self) -> NodeIndex {
        self.best_buy_stop
    }

    pub fn best_sell_stop(&self) -> NodeIndex {
        self.best_sell_stop
    }

    pub fn best_trailing_buy_stop(&self) -> NodeIndex {
        self.best_trailing_buy_stop
    }

    pub fn best_trailing_sell_stop(&self) -> NodeIndex {
        self.best_trailing_sell_stop
    }

    pub fn bids(&self) -> &LevelTree {
        &self.bids
    }

    pub fn asks(&self) -> &LevelTree {
        &self.asks
    }

    /// Bid level at an exact price, or `NIL`.
    pub fn bid_level(&self, pool: &NodePool, price: Price) -> NodeIndex {
        self.bids.find(pool, price)
    }

    /// Ask level at an exact price, or `NIL`.
    pub fn ask_level(&self, pool: &NodePool, price: Price) -> NodeIndex {
        self.asks.find(pool, price)
    }

    pub fn best_bid_price(&self, pool: &NodePool) -> Option<Price> {
        (self.best_bid != NIL).then(|| pool.level(self.best_bid).level.price)
    }

    pub fn best_ask_price(&self, pool: &NodePool) -> Option<Price> {
        (self.best_ask != NIL).then(|| pool.level(self.best_ask).level.price)
    }

    /// Bid-ask spread in ticks; zero when either side is empty.
    pub fn spread(&self, pool: &NodePool) -> Price {
        match (self.best_bid_price(pool), self.best_ask_price(pool)) {
            (Some(bid), Some(ask)) if ask > bid => Price::new(ask.as_u64() - bid.as_u64()),
            _ => Price::ZERO,
        }
    }

    /// Mid price in ticks; zero when either side is empty.
    pub fn mid_price(&self, pool: &NodePool) -> Price {
        match (self.best_bid_price(pool), self.best_ask_price(pool)) {
            (Some(bid), Some(ask)) => Price::new((bid.as_u64() + ask.as_u64()) / 2),
            _ => Price::ZERO,
        }
    }

    /// Bid price of the most recent match.
    pub fn last_bid_price(&self) -> Price {
        self.last_bid_price
    }

    /// Ask price of the most recent match.
    pub fn last_ask_price(&self) -> Price {
        self.last_ask_price
    }

    /// Execution price of the most recent match.
    pub fn matching_price(&self) -> Price {
        self.matching_price
    }

    /// Record the prices of a match execution.
    pub(crate) fn record_match(&mut self, bid: Price, ask: Price, execution: Price) {
        self.last_bid_price = bid;
        self.last_ask_price = ask;
        self.matching_price = execution;
    }

    // ── Levels ──────────────────────────────────────────────────────────

    /// Create the level an order routes to and seat it in its index,
    /// updating the cached best pointer when the new level improves it.
    fn add_level(&mut self, pool: &mut NodePool, order: &Order) -> NodeIndex {
        if order.is_trailing_stop() || order.is_trailing_stop_limit() {
            let price = order.stop_price;
            if order.is_buy() {
                let level = pool.acquire_level(LevelSide::Bid, price);
                self.trailing_buy_stops.insert(pool, level);
                if self.best_trailing_buy_stop == NIL
                    || price < pool.level(self.best_trailing_buy_stop).level.price
                {
                    self.best_trailing_buy_stop = level;
                }
                level
            } else {
                let level = pool.acquire_level(LevelSide::Ask, price);
                self.trailing_sell_stops.insert(pool, level);
                if self.best_trailing_sell_stop == NIL
                    || price > pool.level(self.best_trailing_sell_stop).level.price
                {
                    self.best_trailing_sell_stop = level;
                }
                level
            }
        } else if order.is_stop() || order.is_stop_limit() {
            let price = order.stop_price;
            if order.is_buy() {
                let level = pool.acquire_level(LevelSide::Bid, price);
                self.buy_stops.insert(pool, level);
                if self.best_buy_stop == NIL || price < pool.level(self.best_buy_stop).level.price {
                    self.best_buy_stop = level;
                }
                level
            } else {
                let level = pool.acquire_level(LevelSide::Ask, price);
                self.sell_stops.insert(pool, level);
                if self.best_sell_stop == NIL || price > pool.level(self.best_sell_stop).level.price
                {
                    self.best_sell_stop = level;
                }
                level
            }
        } else if order.is_buy() {
            let price = order.price;
            let level = pool.acquire_level(LevelSide::Bid, price);
            self.bids.insert(pool, level);
            if self.best_bid == NIL || price > pool.level(self.best_bid).level.price {
                self.best_bid = level;
            }
            level
        } else {
            let price = order.price;
            let level = pool.acquire_level(LevelSide::Ask, price);
            self.asks.insert(pool, level);
            if self.best_ask == NIL || price < pool.level(self.best_ask).level.price {
                self.best_ask = level;
            }
            level
        }
    }

    /// Remove an emptied level from its index, re-seating the cached best
    /// pointer from the tree minimum.
    fn delete_level(&mut self, pool: &mut NodePool, order_index: NodeIndex) {
        let order = pool.order(order_index).order;
        let level = pool.order(order_index).level;

        if order.is_trailing_stop() || order.is_trailing_stop_limit() {
            if order.is_buy() {
                self.trailing_buy_stops.remove(pool, level);
                if self.best_trailing_buy_stop == level {
                    self.best_trailing_buy_stop = self.trailing_buy_stops.first(pool);
                }
            } else {
                self.trailing_sell_stops.remove(pool, level);
                if self.best_trailing_sell_stop == level {
                    self.best_trailing_sell_stop = self.trailing_sell_stops.first(pool);
                }
            }
        } else if order.is_stop() || order.is_stop_limit() {
            if order.is_buy() {
                self.buy_stops.remove(pool, level);
                if self.best_buy_stop == level {
                    self.best_buy_stop = self.buy_stops.first(pool);
                }
            } else {
                self.sell_stops.remove(pool, level);
                if self.best_sell_stop == level {
                    self.best_sell_stop = self.sell_stops.first(pool);
                }
            }
        } else if order.is_buy() {
            self.bids.remove(pool, level);
            if self.best_bid == level {
                self.best_bid = self.bids.first(pool);
            }
        } else {
            self.asks.remove(pool, level);
            if self.best_ask == level {
                self.best_ask = self.asks.first(pool);
            }
        }
    }

    // ── Orders ──────────────────────────────────────────────────────────

    /// Seat an order on its routing level, creating the level if this is
    /// the first order at that price.
    pub fn add_order(&mut self, pool: &mut NodePool, order_index: NodeIndex) {
        let order = pool.order(order_index).order;

        let level = if order.is_trailing_stop() || order.is_trailing_stop_limit() {
            if order.is_buy() {
                self.trailing_buy_stops.find(pool, order.stop_price)
            } else {
                self.trailing_sell_stops.find(pool, order.stop_price)
            }
        } else if order.is_stop() || order.is_stop_limit() {
            if order.is_buy() {
                self.buy_stops.find(pool, order.stop_price)
            } else {
                self.sell_stops.find(pool, order.stop_price)
            }
        } else if order.is_buy() {
            self.bids.find(pool, order.price)
        } else {
            self.asks.find(pool, order.price)
        };
        let level = if level == NIL {
            self.add_level(pool, &order)
        } else {
            level
        };

        pool.list_push_back(level, order_index);

        let node = pool.level_mut(level);
        node.level.total_volume += order.leaves_quantity;
        node.level.hidden_volume += order.hidden_quantity();
        node.level.visible_volume += order.visible_quantity();
        node.level.orders += 1;
    }

    /// Shrink the level counters after an order's leaves quantity dropped.
    /// The order stays in place on its level's list.
    pub fn reduce_order(
        &mut self,
        pool: &mut NodePool,
        order_index: NodeIndex,
        quantity: Quantity,
        hidden: Quantity,
        visible: Quantity,
    ) {
        let level = pool.order(order_index).level;
        let node = pool.level_mut(level);
        node.level.total_volume -= quantity;
        node.level.hidden_volume -= hidden;
        node.level.visible_volume -= visible;
    }

    /// Unlink an order from its level; destroys the level when it empties.
    pub fn delete_order(&mut self, pool: &mut NodePool, order_index: NodeIndex) {
        let order = pool.order(order_index).order;
        let level = pool.order(order_index).level;

        pool.list_unlink(level, order_index);
        {
            let node = pool.level_mut(level);
            node.level.total_volume -= order.leaves_quantity;
            node.level.hidden_volume -= order.hidden_quantity();
            node.level.visible_volume -= order.visible_quantity();
            node.level.orders -= 1;
        }

        if pool.level(level).head == NIL {
            self.delete_level(pool, order_index);
        }
        pool.order_mut(order_index).level = NIL;
    }
}
