//! Market manager
//!
//! Owns the symbol, order-book, and order registries, validates and applies
//! every command, and runs the continuous matching loop. All mutating
//! operations run to completion on the calling thread and return an
//! `EngineError` value on failure; handler callbacks fire after the state
//! transition completes.
//!
//! Registries are `BTreeMap` so iteration (and therefore snapshot capture)
//! is deterministic.

use crate::book::OrderBook;
use crate::handler::{DefaultMarketHandler, MarketHandler, UpdateKind};
use crate::pool::{NodeIndex, NodePool, NIL};
use std::collections::BTreeMap;
use types::prelude::*;

/// The matching engine's command surface.
///
/// Automatic matching is off by default; enable it with
/// [`enable_matching`](MarketManager::enable_matching) or drive it manually
/// with [`match_orders`](MarketManager::match_orders). Not thread-safe —
/// wrap it in a lock for shared use.
pub struct MarketManager {
    handler: Box<dyn MarketHandler>,

    pool: NodePool,
    symbols: BTreeMap<SymbolId, Symbol>,
    books: BTreeMap<SymbolId, OrderBook>,
    orders: BTreeMap<OrderId, NodeIndex>,

    matching: bool,
}

impl MarketManager {
    /// Create a manager with the given node pool and no observer.
    pub fn new(pool: NodePool) -> Self {
        Self::with_handler(pool, Box::new(DefaultMarketHandler))
    }

    /// Create a manager with a custom event handler.
    pub fn with_handler(pool: NodePool, handler: Box<dyn MarketHandler>) -> Self {
        Self {
            handler,
            pool,
            symbols: BTreeMap::new(),
            books: BTreeMap::new(),
            orders: BTreeMap::new(),
            matching: false,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn order_book(&self, id: SymbolId) -> Option<&OrderBook> {
        self.books.get(&id)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id).map(|&index| &self.pool.order(index).order)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().map(|&index| &self.pool.order(index).order)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// The node pool backing this engine; needed to resolve level indices
    /// read off an [`OrderBook`].
    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    pub fn is_matching_enabled(&self) -> bool {
        self.matching
    }

    pub fn enable_matching(&mut self) {
        self.matching = true;
    }

    pub fn disable_matching(&mut self) {
        self.matching = false;
    }

    // ── Symbols and books ───────────────────────────────────────────────

    /// Register a symbol. Does not create an order book.
    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<(), EngineError> {
        if self.symbols.contains_key(&symbol.id) {
            return Err(EngineError::SymbolDuplicate);
        }
        self.symbols.insert(symbol.id, symbol.clone());
        self.handler.on_add_symbol(&symbol);
        Ok(())
    }

    /// Remove a symbol, cancelling its order book (and every resting order)
    /// first when one exists.
    pub fn delete_symbol(&mut self, id: SymbolId) -> Result<(), EngineError> {
        if !self.symbols.contains_key(&id) {
            return Err(EngineError::SymbolNotFound);
        }
        if self.books.contains_key(&id) {
            self.delete_order_book(id)?;
        }
        if let Some(symbol) = self.symbols.remove(&id) {
            self.handler.on_delete_symbol(&symbol);
        }
        Ok(())
    }

    /// Create an empty order book for a symbol.
    pub fn add_order_book(&mut self, symbol: Symbol) -> Result<(), EngineError> {
        if self.books.contains_key(&symbol.id) {
            return Err(EngineError::OrderBookDuplicate);
        }
        let id = symbol.id;
        self.books.insert(id, OrderBook::new(symbol));
        if let Some(book) = self.books.get(&id) {
            self.handler.on_add_order_book(book);
        }
        Ok(())
    }

    /// Remove an order book, cancelling every order resting on it.
    pub fn delete_order_book(&mut self, id: SymbolId) -> Result<(), EngineError> {
        if !self.books.contains_key(&id) {
            return Err(EngineError::OrderBookNotFound);
        }

        // Snapshot the ids first: deleting mutates the registry.
        let doomed: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|&(_, &index)| self.pool.order(index).order.symbol_id == id)
            .map(|(&order_id, _)| order_id)
            .collect();
        for order_id in doomed {
            let _ = self.delete_order(order_id);
        }

        if let Some(book) = self.books.remove(&id) {
            self.handler.on_delete_order_book(&book);
        }
        Ok(())
    }

    // ── Orders ──────────────────────────────────────────────────────────

    /// Admit a new order: validate, register, seat on the book, then run
    /// the matching loop if automatic matching is enabled.
    pub fn add_order(&mut self, order: Order) -> Result<(), EngineError> {
        Self::validate(&order)?;
        if self.orders.contains_key(&order.id) {
            return Err(EngineError::OrderDuplicate);
        }
        if !self.books.contains_key(&order.symbol_id) {
            return Err(EngineError::OrderBookNotFound);
        }

        let mut order = order;
        order.executed_quantity = Quantity::ZERO;
        order.leaves_quantity = order.quantity;

        let index = self.pool.acquire_order(order);
        self.orders.insert(order.id, index);
        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.add_order(&mut self.pool, index);
        }

        self.handler.on_add_order(&order);
        self.dispatch_level_event(order.symbol_id, index, UpdateKind::Add);

        if self.matching {
            self.match_book(order.symbol_id);
        }
        Ok(())
    }

    /// Re-insert an order recovered from a snapshot. Execution state is
    /// preserved and the matching loop is never run.
    pub fn restore_order(&mut self, order: Order) -> Result<(), EngineError> {
        Self::validate(&order)?;
        if self.orders.contains_key(&order.id) {
            return Err(EngineError::OrderDuplicate);
        }
        if !self.books.contains_key(&order.symbol_id) {
            return Err(EngineError::OrderBookNotFound);
        }

        let index = self.pool.acquire_order(order);
        self.orders.insert(order.id, index);
        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.add_order(&mut self.pool, index);
        }

        self.handler.on_add_order(&order);
        self.dispatch_level_event(order.symbol_id, index, UpdateKind::Add);
        Ok(())
    }

    /// Cancel an order.
    pub fn delete_order(&mut self, id: OrderId) -> Result<(), EngineError> {
        let Some(&index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        self.remove_order_node(index);
        Ok(())
    }

    /// Reduce an order's remaining quantity in place. Reducing by at least
    /// the leaves quantity degenerates to a cancel.
    pub fn reduce_order(&mut self, id: OrderId, quantity: Quantity) -> Result<(), EngineError> {
        let Some(&index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        if quantity.is_zero() {
            return Err(EngineError::OrderQuantityInvalid);
        }
        if quantity >= self.pool.order(index).order.leaves_quantity {
            return self.delete_order(id);
        }

        let (order, hidden_delta, visible_delta) = {
            let node = self.pool.order_mut(index);
            let old_hidden = node.order.hidden_quantity();
            let old_visible = node.order.visible_quantity();
            node.order.leaves_quantity -= quantity;
            (
                node.order,
                old_hidden - node.order.hidden_quantity(),
                old_visible - node.order.visible_quantity(),
            )
        };
        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.reduce_order(&mut self.pool, index, quantity, hidden_delta, visible_delta);
        }

        self.handler.on_update_order(&order);
        self.dispatch_level_event(order.symbol_id, index, UpdateKind::Update);
        Ok(())
    }

    /// Re-price and re-size an order. The order loses time priority and its
    /// execution progress: quantity and leaves are reset to `new_quantity`,
    /// executed to zero.
    pub fn modify_order(
        &mut self,
        id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Result<(), EngineError> {
        let Some(&index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        if new_quantity.is_zero() {
            return Err(EngineError::OrderQuantityInvalid);
        }

        self.unbook_order(index);
        let order = {
            let node = self.pool.order_mut(index);
            node.order.price = new_price;
            node.order.quantity = new_quantity;
            node.order.leaves_quantity = new_quantity;
            node.order.executed_quantity = Quantity::ZERO;
            node.order
        };
        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.add_order(&mut self.pool, index);
        }

        self.handler.on_update_order(&order);
        self.dispatch_level_event(order.symbol_id, index, UpdateKind::Add);

        if self.matching {
            self.match_book(order.symbol_id);
        }
        Ok(())
    }

    /// In-flight mitigation: like [`modify_order`](MarketManager::modify_order)
    /// but execution progress is preserved. When the new quantity is already
    /// covered by executions the order is cancelled instead.
    pub fn mitigate_order(
        &mut self,
        id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Result<(), EngineError> {
        let Some(&index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        if new_quantity <= self.pool.order(index).order.executed_quantity {
            return self.delete_order(id);
        }

        self.unbook_order(index);
        let order = {
            let node = self.pool.order_mut(index);
            node.order.price = new_price;
            node.order.quantity = new_quantity;
            node.order.leaves_quantity = new_quantity - node.order.executed_quantity;
            node.order
        };
        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.add_order(&mut self.pool, index);
        }

        self.handler.on_update_order(&order);
        self.dispatch_level_event(order.symbol_id, index, UpdateKind::Add);

        if self.matching {
            self.match_book(order.symbol_id);
        }
        Ok(())
    }

    /// Atomically cancel an order and submit a replacement under a new id,
    /// inheriting the old order's type, side, time-in-force, visibility,
    /// slippage, and trailing parameters.
    pub fn replace_order(
        &mut self,
        id: OrderId,
        new_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Result<(), EngineError> {
        let Some(&old_index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        if new_quantity.is_zero() {
            return Err(EngineError::OrderQuantityInvalid);
        }
        if self.orders.contains_key(&new_id) {
            return Err(EngineError::OrderDuplicate);
        }

        let old = self.pool.order(old_index).order;
        self.remove_order_node(old_index);

        let new_order = Order {
            id: new_id,
            symbol_id: old.symbol_id,
            order_type: old.order_type,
            side: old.side,
            price: new_price,
            stop_price: old.stop_price,
            quantity: new_quantity,
            executed_quantity: Quantity::ZERO,
            leaves_quantity: new_quantity,
            time_in_force: old.time_in_force,
            max_visible_quantity: old.max_visible_quantity,
            slippage: old.slippage,
            trailing_distance: old.trailing_distance,
            trailing_step: old.trailing_step,
        };

        let index = self.pool.acquire_order(new_order);
        self.orders.insert(new_id, index);
        if let Some(book) = self.books.get_mut(&new_order.symbol_id) {
            book.add_order(&mut self.pool, index);
        }

        self.handler.on_add_order(&new_order);
        self.dispatch_level_event(new_order.symbol_id, index, UpdateKind::Add);

        if self.matching {
            self.match_book(new_order.symbol_id);
        }
        Ok(())
    }

    /// Inject an execution against an order at its own price.
    pub fn execute_order(&mut self, id: OrderId, quantity: Quantity) -> Result<(), EngineError> {
        let Some(&index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        let order = self.pool.order(index).order;
        if quantity.is_zero() || quantity > order.leaves_quantity {
            return Err(EngineError::OrderQuantityInvalid);
        }
        self.fill_order(index, order.price, quantity);
        Ok(())
    }

    /// Inject an execution against an order at an explicit price.
    pub fn execute_order_at(
        &mut self,
        id: OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Result<(), EngineError> {
        let Some(&index) = self.orders.get(&id) else {
            return Err(EngineError::OrderNotFound);
        };
        if quantity.is_zero() || quantity > self.pool.order(index).order.leaves_quantity {
            return Err(EngineError::OrderQuantityInvalid);
        }
        self.fill_order(index, price, quantity);
        Ok(())
    }

    // ── Matching ────────────────────────────────────────────────────────

    /// Run one matching pass over a book, regardless of the automatic
    /// matching flag.
    pub fn match_orders(&mut self, symbol_id: SymbolId) -> Result<(), EngineError> {
        if !self.books.contains_key(&symbol_id) {
            return Err(EngineError::OrderBookNotFound);
        }
        self.match_book(symbol_id);
        Ok(())
    }

    /// The continuous matching loop: while the book is crossed, execute the
    /// oldest orders at the best bid and best ask against each other. The
    /// resting ask's price wins, reflecting that it rested first; within a
    /// level the FIFO list gives strict time priority.
    fn match_book(&mut self, symbol_id: SymbolId) {
        loop {
            let Some(book) = self.books.get(&symbol_id) else {
                return;
            };
            let bid_level = book.best_bid();
            let ask_level = book.best_ask();
            if bid_level == NIL || ask_level == NIL {
                break;
            }

            let bid_price = self.pool.level(bid_level).level.price;
            let ask_price = self.pool.level(ask_level).level.price;
            if bid_price < ask_price {
                break;
            }

            let bid = self.pool.list_front(bid_level);
            let ask = self.pool.list_front(ask_level);
            if bid == NIL || ask == NIL {
                break;
            }

            let quantity = self
                .pool
                .order(bid)
                .order
                .leaves_quantity
                .min(self.pool.order(ask).order.leaves_quantity);
            let price = self.pool.order(ask).order.price;

            if let Some(book) = self.books.get_mut(&symbol_id) {
                book.record_match(bid_price, ask_price, price);
            }

            self.fill_order(bid, price, quantity);
            self.fill_order(ask, price, quantity);
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn validate(order: &Order) -> Result<(), EngineError> {
        if !order.id.is_valid() {
            return Err(EngineError::OrderIdInvalid);
        }
        if order.quantity.is_zero() {
            return Err(EngineError::OrderQuantityInvalid);
        }
        match order.order_type {
            OrderType::Market => {}
            OrderType::Limit => {
                if order.price.is_zero() {
                    return Err(EngineError::OrderParameterInvalid);
                }
            }
            OrderType::Stop => {
                if order.stop_price.is_zero() {
                    return Err(EngineError::OrderParameterInvalid);
                }
            }
            OrderType::StopLimit => {
                if order.price.is_zero() || order.stop_price.is_zero() {
                    return Err(EngineError::OrderParameterInvalid);
                }
            }
            OrderType::TrailingStop => {
                if order.trailing_distance == 0 {
                    return Err(EngineError::OrderParameterInvalid);
                }
            }
            OrderType::TrailingStopLimit => {
                if order.price.is_zero() || order.trailing_distance == 0 {
                    return Err(EngineError::OrderParameterInvalid);
                }
            }
        }
        Ok(())
    }

    /// Apply an execution to a resting order: adjust quantities and level
    /// volumes, notify, and remove the order when fully filled.
    fn fill_order(&mut self, index: NodeIndex, price: Price, quantity: Quantity) {
        let (order, hidden_delta, visible_delta) = {
            let node = self.pool.order_mut(index);
            let old_hidden = node.order.hidden_quantity();
            let old_visible = node.order.visible_quantity();
            node.order.executed_quantity += quantity;
            node.order.leaves_quantity -= quantity;
            (
                node.order,
                old_hidden - node.order.hidden_quantity(),
                old_visible - node.order.visible_quantity(),
            )
        };
        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.reduce_order(&mut self.pool, index, quantity, hidden_delta, visible_delta);
        }

        self.handler.on_execute_order(&order, price, quantity);

        if order.leaves_quantity.is_zero() {
            self.remove_order_node(index);
        } else {
            self.handler.on_update_order(&order);
            self.dispatch_level_event(order.symbol_id, index, UpdateKind::Update);
        }
    }

    /// Take an order off its book, dispatching the resulting level event.
    /// Registry entry and pool slot are left to the caller.
    fn unbook_order(&mut self, index: NodeIndex) {
        let order = self.pool.order(index).order;
        let level_index = self.pool.order(index).level;
        if level_index == NIL {
            return;
        }

        let top = self.is_top_of_book(order.symbol_id, index);
        let pre_level = self.pool.level(level_index).level;
        let empties = pre_level.orders == 1;

        if let Some(book) = self.books.get_mut(&order.symbol_id) {
            book.delete_order(&mut self.pool, index);
        }

        let (kind, level) = if empties {
            (UpdateKind::Delete, pre_level)
        } else {
            (UpdateKind::Update, self.pool.level(level_index).level)
        };
        self.emit_level_event(order.symbol_id, kind, level, top);
    }

    /// Full removal: unbook, unregister, notify, release the node.
    fn remove_order_node(&mut self, index: NodeIndex) {
        let order = self.pool.order(index).order;
        self.unbook_order(index);
        self.orders.remove(&order.id);
        self.handler.on_delete_order(&order);
        self.pool.release_order(index);
    }

    /// Whether the order's level currently is the top of its side of the
    /// limit book.
    fn is_top_of_book(&self, symbol_id: SymbolId, index: NodeIndex) -> bool {
        let node = self.pool.order(index);
        let Some(book) = self.books.get(&symbol_id) else {
            return false;
        };
        if node.order.is_buy() {
            book.best_bid() == node.level
        } else {
            book.best_ask() == node.level
        }
    }

    /// Emit a level event for an order still seated on its level, reading
    /// the level state post-transition.
    fn dispatch_level_event(&mut self, symbol_id: SymbolId, index: NodeIndex, kind: UpdateKind) {
        let level_index = self.pool.order(index).level;
        if level_index == NIL {
            return;
        }
        let level = self.pool.level(level_index).level;
        let top = self.is_top_of_book(symbol_id, index);
        self.emit_level_event(symbol_id, kind, level, top);
    }

    fn emit_level_event(&mut self, symbol_id: SymbolId, kind: UpdateKind, level: Level, top: bool) {
        let Some(book) = self.books.get(&symbol_id) else {
            return;
        };
        match kind {
            UpdateKind::Add => self.handler.on_add_level(book, level, top),
            UpdateKind::Update => self.handler.on_update_level(book, level, top),
            UpdateKind::Delete => self.handler.on_delete_level(book, level, top),
        }
        self.handler.on_update_order_book(book, top);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_book() -> MarketManager {
        let mut manager = MarketManager::new(NodePool::new());
        let symbol = Symbol::new(SymbolId::new(1), "AAPL");
        manager.add_symbol(symbol.clone()).unwrap();
        manager.add_order_book(symbol).unwrap();
        manager
    }

    fn limit(id: u64, side: OrderSide, price: u64, qty: u64) -> Order {
        Order::limit(
            OrderId::new(id),
            SymbolId::new(1),
            side,
            Price::new(price),
            Quantity::new(qty),
        )
    }

    #[test]
    fn test_add_symbol_duplicate() {
        let mut manager = MarketManager::new(NodePool::new());
        let symbol = Symbol::new(SymbolId::new(1), "AAPL");
        manager.add_symbol(symbol.clone()).unwrap();
        assert_eq!(
            manager.add_symbol(symbol),
            Err(EngineError::SymbolDuplicate)
        );
    }

    #[test]
    fn test_delete_symbol_not_found() {
        let mut manager = MarketManager::new(NodePool::new());
        assert_eq!(
            manager.delete_symbol(SymbolId::new(9)),
            Err(EngineError::SymbolNotFound)
        );
    }

    #[test]
    fn test_add_order_book_duplicate() {
        let mut manager = manager_with_book();
        let symbol = Symbol::new(SymbolId::new(1), "AAPL");
        assert_eq!(
            manager.add_order_book(symbol),
            Err(EngineError::OrderBookDuplicate)
        );
    }

    #[test]
    fn test_add_order_requires_book() {
        let mut manager = MarketManager::new(NodePool::new());
        let order = limit(1, OrderSide::Buy, 10_000, 100);
        assert_eq!(
            manager.add_order(order),
            Err(EngineError::OrderBookNotFound)
        );
    }

    #[test]
    fn test_add_order_rests_and_registers() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();

        let order = manager.order(OrderId::new(1)).unwrap();
        assert_eq!(order.leaves_quantity, Quantity::new(100));
        assert_eq!(order.executed_quantity, Quantity::ZERO);

        let book = manager.order_book(SymbolId::new(1)).unwrap();
        assert_eq!(
            book.best_bid_price(manager.pool()),
            Some(Price::new(10_000))
        );
    }

    #[test]
    fn test_add_order_duplicate() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        assert_eq!(
            manager.add_order(limit(1, OrderSide::Buy, 9_000, 10)),
            Err(EngineError::OrderDuplicate)
        );
    }

    #[test]
    fn test_delete_order() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager.delete_order(OrderId::new(1)).unwrap();

        assert!(manager.order(OrderId::new(1)).is_none());
        assert_eq!(manager.pool().order_count(), 0);
        assert_eq!(manager.pool().level_count(), 0);
        assert_eq!(
            manager.delete_order(OrderId::new(1)),
            Err(EngineError::OrderNotFound)
        );
    }

    #[test]
    fn test_reduce_order_partial() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager
            .reduce_order(OrderId::new(1), Quantity::new(40))
            .unwrap();

        let order = manager.order(OrderId::new(1)).unwrap();
        assert_eq!(order.leaves_quantity, Quantity::new(60));
        assert_eq!(order.quantity, Quantity::new(100));
    }

    #[test]
    fn test_reduce_order_zero_quantity() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        assert_eq!(
            manager.reduce_order(OrderId::new(1), Quantity::ZERO),
            Err(EngineError::OrderQuantityInvalid)
        );
    }

    #[test]
    fn test_modify_order_resets_execution_and_moves_level() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager
            .execute_order(OrderId::new(1), Quantity::new(30))
            .unwrap();
        manager
            .modify_order(OrderId::new(1), Price::new(9_500), Quantity::new(50))
            .unwrap();

        let order = manager.order(OrderId::new(1)).unwrap();
        assert_eq!(order.price, Price::new(9_500));
        assert_eq!(order.quantity, Quantity::new(50));
        assert_eq!(order.leaves_quantity, Quantity::new(50));
        assert_eq!(order.executed_quantity, Quantity::ZERO);

        let book = manager.order_book(SymbolId::new(1)).unwrap();
        assert_eq!(book.best_bid_price(manager.pool()), Some(Price::new(9_500)));
    }

    #[test]
    fn test_mitigate_order_preserves_execution() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager
            .execute_order(OrderId::new(1), Quantity::new(30))
            .unwrap();
        manager
            .mitigate_order(OrderId::new(1), Price::new(9_500), Quantity::new(80))
            .unwrap();

        let order = manager.order(OrderId::new(1)).unwrap();
        assert_eq!(order.executed_quantity, Quantity::new(30));
        assert_eq!(order.leaves_quantity, Quantity::new(50));
        assert_eq!(order.quantity, Quantity::new(80));
    }

    #[test]
    fn test_mitigate_to_executed_quantity_cancels() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager
            .execute_order(OrderId::new(1), Quantity::new(30))
            .unwrap();
        manager
            .mitigate_order(OrderId::new(1), Price::new(9_500), Quantity::new(30))
            .unwrap();
        assert!(manager.order(OrderId::new(1)).is_none());
    }

    #[test]
    fn test_replace_order_inherits_parameters() {
        let mut manager = manager_with_book();
        let mut order = limit(1, OrderSide::Sell, 10_000, 100);
        order.max_visible_quantity = Quantity::new(10);
        manager.add_order(order).unwrap();
        manager
            .replace_order(
                OrderId::new(1),
                OrderId::new(2),
                Price::new(10_100),
                Quantity::new(60),
            )
            .unwrap();

        assert!(manager.order(OrderId::new(1)).is_none());
        let replacement = manager.order(OrderId::new(2)).unwrap();
        assert_eq!(replacement.price, Price::new(10_100));
        assert_eq!(replacement.quantity, Quantity::new(60));
        assert_eq!(replacement.side, OrderSide::Sell);
        assert_eq!(replacement.max_visible_quantity, Quantity::new(10));
    }

    #[test]
    fn test_replace_order_duplicate_new_id() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager.add_order(limit(2, OrderSide::Buy, 9_900, 100)).unwrap();
        assert_eq!(
            manager.replace_order(
                OrderId::new(1),
                OrderId::new(2),
                Price::new(9_800),
                Quantity::new(10)
            ),
            Err(EngineError::OrderDuplicate)
        );
    }

    #[test]
    fn test_execute_order_bounds() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        assert_eq!(
            manager.execute_order(OrderId::new(1), Quantity::ZERO),
            Err(EngineError::OrderQuantityInvalid)
        );
        assert_eq!(
            manager.execute_order(OrderId::new(1), Quantity::new(101)),
            Err(EngineError::OrderQuantityInvalid)
        );
    }

    #[test]
    fn test_execute_order_full_fill_removes_order() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager
            .execute_order(OrderId::new(1), Quantity::new(100))
            .unwrap();
        assert!(manager.order(OrderId::new(1)).is_none());
        assert_eq!(manager.pool().level_count(), 0);
    }

    #[test]
    fn test_delete_order_book_cancels_orders() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager.add_order(limit(2, OrderSide::Sell, 10_100, 100)).unwrap();

        manager.delete_order_book(SymbolId::new(1)).unwrap();
        assert!(manager.order(OrderId::new(1)).is_none());
        assert!(manager.order(OrderId::new(2)).is_none());
        assert!(manager.order_book(SymbolId::new(1)).is_none());
        assert_eq!(manager.pool().order_count(), 0);
    }

    #[test]
    fn test_delete_symbol_cascades() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Buy, 10_000, 100)).unwrap();
        manager.delete_symbol(SymbolId::new(1)).unwrap();

        assert!(manager.symbol(SymbolId::new(1)).is_none());
        assert!(manager.order_book(SymbolId::new(1)).is_none());
        assert_eq!(manager.order_count(), 0);
    }

    #[test]
    fn test_match_orders_requires_book() {
        let mut manager = MarketManager::new(NodePool::new());
        assert_eq!(
            manager.match_orders(SymbolId::new(1)),
            Err(EngineError::OrderBookNotFound)
        );
    }

    #[test]
    fn test_manual_match_pass() {
        let mut manager = manager_with_book();
        manager.add_order(limit(1, OrderSide::Sell, 10_000, 100)).unwrap();
        manager.add_order(limit(2, OrderSide::Buy, 10_000, 100)).unwrap();
        // Matching disabled: both rest crossed until a manual pass.
        assert_eq!(manager.order_count(), 2);

        manager.match_orders(SymbolId::new(1)).unwrap();
        assert_eq!(manager.order_count(), 0);
    }

    #[test]
    fn test_match_records_prices() {
        let mut manager = manager_with_book();
        manager.enable_matching();
        manager.add_order(limit(1, OrderSide::Sell, 10_000, 50)).unwrap();
        manager.add_order(limit(2, OrderSide::Buy, 10_100, 50)).unwrap();

        let book = manager.order_book(SymbolId::new(1)).unwrap();
        assert_eq!(book.matching_price(), Price::new(10_000));
        assert_eq!(book.last_bid_price(), Price::new(10_100));
        assert_eq!(book.last_ask_price(), Price::new(10_000));
    }
}
