//! Persistence manager — the durable command entry point
//!
//! Wraps a [`MarketManager`] and guarantees that every order submission or
//! cancellation is journalled before the engine is invoked, under one
//! exclusive lock. A durable journal prefix therefore always replays to a
//! state the survivors observed; a command whose journal append fails never
//! reaches the engine.
//!
//! Snapshots are two-phase: the engine state is cloned under the lock
//! (microseconds), then compressed and written in a background thread so
//! command processing never stalls on snapshot IO.

use crate::journal::{Journal, JournalError};
use crate::snapshot::{Snapshot, SnapshotError, Snapshotter};
use crate::wire::MatchingEvent;
use matching_engine::MarketManager;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use types::prelude::*;

/// Failures surfaced by the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("journal: {0}")]
    Journal(#[from] JournalError),

    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The engine rejected a command whose journal append already
    /// succeeded; recovery replay tolerates the corresponding record.
    #[error("engine: {0}")]
    Engine(#[from] EngineError),
}

/// Durable facade over the matching engine.
pub struct Manager {
    engine: Mutex<MarketManager>,
    journal: Journal,
    snapshotter: Snapshotter,
}

impl Manager {
    /// Open (or create) the journal at `journal_path`, initialise the
    /// snapshotter in `snapshot_dir`, and wrap `engine`.
    ///
    /// Run [`recover`](crate::recover) on the engine first when restoring a
    /// previous run.
    pub fn new(
        engine: MarketManager,
        journal_path: impl AsRef<Path>,
        snapshot_dir: impl AsRef<Path>,
    ) -> Result<Self, PersistenceError> {
        let journal = Journal::open(journal_path)?;
        let snapshotter = Snapshotter::new(snapshot_dir.as_ref())?;
        Ok(Self {
            engine: Mutex::new(engine),
            journal,
            snapshotter,
        })
    }

    /// Journal a new order, then submit it to the engine.
    pub fn add_order(&self, order: Order) -> Result<(), PersistenceError> {
        let event = MatchingEvent::NewOrder {
            timestamp: unix_nanos(),
            order,
        };
        let mut engine = self.lock_engine();
        self.journal.append(&event)?;
        engine.add_order(order)?;
        Ok(())
    }

    /// Journal a cancellation, then remove the order from the engine.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<(), PersistenceError> {
        let event = MatchingEvent::CancelOrder {
            timestamp: unix_nanos(),
            order_id,
        };
        let mut engine = self.lock_engine();
        self.journal.append(&event)?;
        engine.delete_order(order_id)?;
        Ok(())
    }

    /// Capture the engine state and write it to disk in the background.
    ///
    /// The engine lock is held only for the in-memory clone; the channel
    /// delivers the eventual IO result exactly once.
    pub fn take_snapshot(&self) -> Receiver<Result<PathBuf, SnapshotError>> {
        let snapshot = {
            let engine = self.lock_engine();
            Snapshot::capture(&engine, unix_nanos())
        };

        let snapshotter = self.snapshotter.clone();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let result = snapshotter.save(&snapshot);
            match &result {
                Ok(path) => tracing::debug!(path = %path.display(), "snapshot written"),
                Err(error) => tracing::warn!(%error, "background snapshot failed"),
            }
            let _ = sender.send(result);
        });
        receiver
    }

    /// Direct access to the wrapped engine. Operations performed through
    /// the returned guard are NOT journalled.
    pub fn lock_engine(&self) -> MutexGuard<'_, MarketManager> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flush the journal and release its file handle. Must be called (or
    /// the manager dropped) before process exit to guarantee the final
    /// flush.
    pub fn close(&mut self) -> Result<(), JournalError> {
        self.journal.close()
    }
}

/// Current wall clock in Unix nanoseconds.
fn unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or(0)
}
