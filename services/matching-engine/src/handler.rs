//! Market event handler interface
//!
//! The engine reports every observable state change through this trait.
//! Callbacks run synchronously on the mutating thread, after the state
//! transition has completed and invariants are re-established, so handlers
//! always observe a consistent book. Handlers must not re-enter the engine.
//!
//! Every method has a no-op default body; implement only what you observe.

use crate::book::OrderBook;
use types::prelude::*;

/// Kind of change applied to a price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Add,
    Update,
    Delete,
}

/// Sink for market events.
pub trait MarketHandler: Send {
    // Symbols
    fn on_add_symbol(&mut self, _symbol: &Symbol) {}
    fn on_delete_symbol(&mut self, _symbol: &Symbol) {}

    // Order books
    fn on_add_order_book(&mut self, _book: &OrderBook) {}
    fn on_update_order_book(&mut self, _book: &OrderBook, _top: bool) {}
    fn on_delete_order_book(&mut self, _book: &OrderBook) {}

    // Price levels
    fn on_add_level(&mut self, _book: &OrderBook, _level: Level, _top: bool) {}
    fn on_update_level(&mut self, _book: &OrderBook, _level: Level, _top: bool) {}
    fn on_delete_level(&mut self, _book: &OrderBook, _level: Level, _top: bool) {}

    // Orders
    fn on_add_order(&mut self, _order: &Order) {}
    fn on_update_order(&mut self, _order: &Order) {}
    fn on_delete_order(&mut self, _order: &Order) {}

    // Executions
    fn on_execute_order(&mut self, _order: &Order, _price: Price, _quantity: Quantity) {}
}

/// No-op handler used when no observer is desired.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMarketHandler;

impl MarketHandler for DefaultMarketHandler {}
