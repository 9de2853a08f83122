//! Persistence layer for the matching engine
//!
//! Provides write-ahead journalling, compressed state snapshots, and crash
//! recovery for the order-book engine.
//!
//! Architecture overview:
//!
//! ```text
//! Manager                 – top-level facade; wraps MarketManager
//!   ├── Journal           – append-only binary WAL with batch flush
//!   ├── Snapshotter       – zstd-compressed periodic snapshots
//!   └── recover()         – load latest snapshot + replay journal on startup
//! ```
//!
//! The serialisation rule is journal-before-engine: a command is appended to
//! the journal under the manager's lock before the engine is invoked, so a
//! durable journal prefix always replays to the state the survivors saw.

pub mod journal;
pub mod manager;
pub mod recovery;
pub mod snapshot;
pub mod wire;

pub use journal::{read_all, Journal, JournalConfig, JournalError};
pub use manager::{Manager, PersistenceError};
pub use recovery::{recover, RecoveryError, RecoveryStats};
pub use snapshot::{Snapshot, SnapshotError, Snapshotter, SNAPSHOT_MAGIC};
pub use wire::{MatchingEvent, WireError, ORDER_WIRE_SIZE};
