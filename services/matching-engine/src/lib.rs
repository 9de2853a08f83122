//! Matching Engine
//!
//! In-memory limit-order matching for a single venue: per-symbol order books
//! with AVL price-level indexes, pooled node storage, and a deterministic
//! price-time priority matching loop.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced (better price first, FIFO within
//!   a level)
//! - Best-price pointers always equal the minimum of their level index
//! - Between matching cycles the book is never crossed
//! - Deterministic: same command sequence, same state

pub mod book;
pub mod handler;
pub mod manager;
pub mod pool;
pub mod tree;

pub use book::OrderBook;
pub use handler::{DefaultMarketHandler, MarketHandler, UpdateKind};
pub use manager::MarketManager;
pub use pool::{LevelNode, NodeIndex, NodePool, OrderNode, NIL};
pub use tree::LevelTree;
