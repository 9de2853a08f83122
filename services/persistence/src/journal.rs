//! Journal — append-only write-ahead log of accepted commands
//!
//! Events are buffered in a `BufWriter` and reach stable storage either when
//! the buffer fills, when the background timer fires (every 10 ms by
//! default), or on an explicit [`Journal::flush`]. A record is durable iff a
//! flush has returned successfully after its append.
//!
//! The journal is safe to share: appends serialise on one internal lock.

use crate::wire::{self, MatchingEvent, WireError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("journal is closed")]
    Closed,

    #[error("corrupt record: {0}")]
    Corrupt(#[from] WireError),
}

/// Journal tuning knobs.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Maximum time between automatic flushes.
    pub flush_interval: Duration,
    /// Write-buffer size; the buffer drains to the OS when full.
    pub buffer_size: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(10),
            buffer_size: 64 * 1024,
        }
    }
}

struct Core {
    writer: BufWriter<File>,
}

impl Core {
    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

struct Shared {
    core: Mutex<Option<Core>>,
}

/// Append-only write-ahead log backed by a single file.
pub struct Journal {
    shared: Arc<Shared>,
    flusher: Option<JoinHandle<()>>,
    stop: Mutex<Option<mpsc::Sender<()>>>,
}

impl Journal {
    /// Open (or create) the journal at `path` with default settings and
    /// start the background flush thread.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        Self::open_with(path, JournalConfig::default())
    }

    /// Open (or create) the journal at `path` with explicit settings.
    pub fn open_with(path: impl AsRef<Path>, config: JournalConfig) -> Result<Self, JournalError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        let shared = Arc::new(Shared {
            core: Mutex::new(Some(Core {
                writer: BufWriter::with_capacity(config.buffer_size, file),
            })),
        });

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let flusher_shared = Arc::clone(&shared);
        let interval = config.flush_interval;
        let flusher = thread::Builder::new()
            .name("journal-flush".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut guard = flusher_shared
                            .core
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        if let Some(core) = guard.as_mut() {
                            if let Err(error) = core.flush() {
                                tracing::warn!(%error, "journal flush failed");
                            }
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            })?;

        Ok(Self {
            shared,
            flusher: Some(flusher),
            stop: Mutex::new(Some(stop_tx)),
        })
    }

    /// Append an event to the journal buffer. Does not flush.
    pub fn append(&self, event: &MatchingEvent) -> Result<(), JournalError> {
        let record = wire::encode_event(event);
        let mut guard = self.lock_core();
        let core = guard.as_mut().ok_or(JournalError::Closed)?;
        core.writer.write_all(&record)?;
        Ok(())
    }

    /// Force all buffered bytes to stable storage.
    pub fn flush(&self) -> Result<(), JournalError> {
        let mut guard = self.lock_core();
        let core = guard.as_mut().ok_or(JournalError::Closed)?;
        core.flush()?;
        Ok(())
    }

    /// Flush remaining data, stop the background thread, and release the
    /// file. Idempotent.
    pub fn close(&mut self) -> Result<(), JournalError> {
        if let Some(stop) = self
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = stop.send(());
        }
        if let Some(flusher) = self.flusher.take() {
            let _ = flusher.join();
        }
        let mut guard = self.lock_core();
        if let Some(mut core) = guard.take() {
            core.flush()?;
        }
        Ok(())
    }

    fn lock_core(&self) -> std::sync::MutexGuard<'_, Option<Core>> {
        self.shared.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Read every fully-written record from the journal at `path`, in order.
///
/// A missing file reads as empty. A crash-truncated tail — a short read
/// inside a record's 4-byte length prefix — ends the scan without error;
/// structural damage anywhere else is reported.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<MatchingEvent>, JournalError> {
    let data = match fs::read(path.as_ref()) {
        Ok(data) => data,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };

    let mut events = Vec::new();
    let mut pos = 0;
    while let Some((event, consumed)) = wire::decode_event(&data[pos..])? {
        events.push(event);
        pos += consumed;
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use types::prelude::*;

    fn new_order_event(id: u64, timestamp: i64) -> MatchingEvent {
        MatchingEvent::NewOrder {
            timestamp,
            order: Order::limit(
                OrderId::new(id),
                SymbolId::new(1),
                OrderSide::Buy,
                Price::new(10_000),
                Quantity::new(100),
            ),
        }
    }

    #[test]
    fn test_append_flush_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.bin");

        let mut journal = Journal::open(&path).unwrap();
        journal.append(&new_order_event(1, 100)).unwrap();
        journal
            .append(&MatchingEvent::CancelOrder {
                timestamp: 200,
                order_id: OrderId::new(1),
            })
            .unwrap();
        journal.flush().unwrap();

        let events = read_all(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], new_order_event(1, 100));
        assert_eq!(
            events[1],
            MatchingEvent::CancelOrder {
                timestamp: 200,
                order_id: OrderId::new(1),
            }
        );
        journal.close().unwrap();
    }

    #[test]
    fn test_close_is_idempotent_and_flushes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.bin");

        let mut journal = Journal::open(&path).unwrap();
        journal.append(&new_order_event(1, 100)).unwrap();
        journal.close().unwrap();
        journal.close().unwrap();

        assert_eq!(read_all(&path).unwrap().len(), 1);
        assert!(matches!(
            journal.append(&new_order_event(2, 200)),
            Err(JournalError::Closed)
        ));
    }

    #[test]
    fn test_read_all_missing_file() {
        let tmp = TempDir::new().unwrap();
        let events = read_all(tmp.path().join("absent.bin")).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_truncated_length_prefix_tolerated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.bin");

        let mut journal = Journal::open(&path).unwrap();
        journal.append(&new_order_event(1, 100)).unwrap();
        journal.close().unwrap();

        // Simulate a crash mid-write of the next record's length prefix.
        let mut data = fs::read(&path).unwrap();
        data.extend_from_slice(&[0, 0]);
        fs::write(&path, &data).unwrap();

        let events = read_all(&path).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_truncated_payload_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.bin");

        let mut journal = Journal::open(&path).unwrap();
        journal.append(&new_order_event(1, 100)).unwrap();
        journal.append(&new_order_event(2, 200)).unwrap();
        journal.close().unwrap();

        // Cut into the second record's payload, past its length prefix.
        let data = fs::read(&path).unwrap();
        fs::write(&path, &data[..data.len() - 10]).unwrap();

        assert!(matches!(
            read_all(&path),
            Err(JournalError::Corrupt(WireError::TruncatedPayload { .. }))
        ));
    }

    #[test]
    fn test_background_timer_flushes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.bin");

        let config = JournalConfig {
            flush_interval: Duration::from_millis(5),
            ..JournalConfig::default()
        };
        let journal = Journal::open_with(&path, config).unwrap();
        journal.append(&new_order_event(1, 100)).unwrap();

        // No explicit flush: the timer must drain the buffer.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let mut contents = Vec::new();
            File::open(&path).unwrap().read_to_end(&mut contents).unwrap();
            if !contents.is_empty() {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "timer flush never happened"
            );
            thread::sleep(Duration::from_millis(10));
        }
        drop(journal);
    }

    #[test]
    fn test_drop_closes_and_flushes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.bin");
        {
            let journal = Journal::open(&path).unwrap();
            journal.append(&new_order_event(1, 100)).unwrap();
        }
        assert_eq!(read_all(&path).unwrap().len(), 1);
    }
}
