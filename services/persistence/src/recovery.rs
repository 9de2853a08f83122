//! Recovery — rebuild the engine from snapshot plus journal tail
//!
//! Startup flow: load the latest snapshot (if any), restore its symbols,
//! order books, and orders, then replay every journal record whose
//! timestamp is strictly greater than the snapshot's. After recovery the
//! engine's observable state matches the pre-crash engine up to the last
//! flushed record.
//!
//! The automatic-matching flag is configuration, not recovered state: the
//! flag the caller set on the manager is preserved. It is forced off while
//! snapshot orders are restored (restore must never match), then put back
//! before the journal tail replays, so replayed commands re-derive the same
//! executions the original run produced.

use crate::journal::{self, JournalError};
use crate::snapshot::{SnapshotError, Snapshotter};
use crate::wire::MatchingEvent;
use matching_engine::MarketManager;
use std::path::Path;
use thiserror::Error;
use types::prelude::*;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("journal: {0}")]
    Journal(#[from] JournalError),

    #[error("restoring snapshot state: {0}")]
    Restore(#[source] EngineError),

    #[error("replaying event at ts={timestamp}: {source}")]
    Replay {
        timestamp: i64,
        #[source]
        source: EngineError,
    },
}

/// What recovery did, for operator visibility.
#[derive(Debug, Clone, Default)]
pub struct RecoveryStats {
    /// Timestamp of the snapshot used, if one was found.
    pub snapshot_timestamp: Option<i64>,
    pub symbols_restored: usize,
    pub orders_restored: usize,
    /// Journal records applied after the snapshot cutoff.
    pub events_replayed: usize,
    /// Journal records already folded into the snapshot.
    pub events_skipped: usize,
}

/// Restore `manager` from the snapshot directory and journal file.
///
/// Duplicate symbols, books, and orders are tolerated so recovery can run
/// against a partially pre-configured engine. A journal `NewOrder` for an
/// id that already exists and a `CancelOrder` for an absent id are likewise
/// tolerated; every other engine failure aborts recovery.
pub fn recover(
    manager: &mut MarketManager,
    journal_path: &Path,
    snapshot_dir: &Path,
) -> Result<RecoveryStats, RecoveryError> {
    let snapshotter = Snapshotter::new(snapshot_dir)?;
    let mut stats = RecoveryStats::default();

    let matching_was_enabled = manager.is_matching_enabled();
    manager.disable_matching();

    match snapshotter.load_latest()? {
        Some(snapshot) => {
            tracing::info!(
                timestamp = snapshot.timestamp,
                symbols = snapshot.symbols.len(),
                orders = snapshot.orders.len(),
                "restoring snapshot"
            );
            for symbol in &snapshot.symbols {
                match manager.add_symbol(symbol.clone()) {
                    Ok(()) | Err(EngineError::SymbolDuplicate) => {}
                    Err(error) => return Err(RecoveryError::Restore(error)),
                }
                match manager.add_order_book(symbol.clone()) {
                    Ok(()) | Err(EngineError::OrderBookDuplicate) => {}
                    Err(error) => return Err(RecoveryError::Restore(error)),
                }
            }
            stats.symbols_restored = snapshot.symbols.len();

            for order in &snapshot.orders {
                match manager.restore_order(*order) {
                    Ok(()) => stats.orders_restored += 1,
                    Err(EngineError::OrderDuplicate) => {}
                    Err(error) => return Err(RecoveryError::Restore(error)),
                }
            }
            stats.snapshot_timestamp = Some(snapshot.timestamp);
        }
        None => {
            tracing::info!("no snapshot found, replaying journal from the beginning");
        }
    }

    if matching_was_enabled {
        manager.enable_matching();
    }

    let cutoff = stats.snapshot_timestamp.unwrap_or(i64::MIN);
    for event in journal::read_all(journal_path)? {
        if event.timestamp() <= cutoff {
            stats.events_skipped += 1;
            continue;
        }
        match event {
            MatchingEvent::NewOrder { timestamp, order } => match manager.add_order(order) {
                Ok(()) | Err(EngineError::OrderDuplicate) => {}
                Err(source) => return Err(RecoveryError::Replay { timestamp, source }),
            },
            MatchingEvent::CancelOrder {
                timestamp,
                order_id,
            } => match manager.delete_order(order_id) {
                Ok(()) | Err(EngineError::OrderNotFound) => {}
                Err(source) => return Err(RecoveryError::Replay { timestamp, source }),
            },
        }
        stats.events_replayed += 1;
    }

    tracing::info!(
        replayed = stats.events_replayed,
        skipped = stats.events_skipped,
        orders = manager.order_count(),
        "recovery complete"
    );
    Ok(stats)
}
