//! Snapshotter — durable full-state captures
//!
//! A snapshot is a self-contained dump of the engine's symbols and orders at
//! a single point in time; order-book topology is not serialised because
//! re-adding the orders deterministically reconstructs it.
//!
//! Files are zstd-compressed and written atomically (temp file, fsync,
//! rename), named `snapshot-<timestamp>.snap` so the latest selector is a
//! directory scan plus an integer max.
//!
//! # Uncompressed layout (all integers big-endian)
//! ```text
//!  8 bytes – magic "GTSNAP\x00\x01"
//!  8 bytes – snapshot timestamp (int64, Unix nanoseconds)
//!  4 bytes – symbol count
//!    per symbol: 4 id, 1 name length, N name bytes
//!  4 bytes – order count
//!    per order: 87 bytes (order wire layout)
//! ```

use crate::wire::{self, ORDER_WIRE_SIZE};
use matching_engine::MarketManager;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use types::prelude::*;

/// Magic bytes at the start of every snapshot file.
pub const SNAPSHOT_MAGIC: [u8; 8] = *b"GTSNAP\x00\x01";

/// zstd compression level for snapshot files.
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("invalid snapshot magic")]
    BadMagic,

    #[error("snapshot truncated reading {0}")]
    Truncated(&'static str),

    #[error("corrupt snapshot: {0}")]
    Wire(#[from] wire::WireError),
}

/// Full engine state at a single point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Unix nanosecond at which the snapshot was captured.
    pub timestamp: i64,
    /// All registered symbols; an order book exists for each.
    pub symbols: Vec<Symbol>,
    /// All live orders with their current execution state.
    pub orders: Vec<Order>,
}

impl Snapshot {
    /// Clone the recoverable state out of a market manager. Cheap relative
    /// to the disk write: symbols and orders are plain value copies.
    pub fn capture(manager: &MarketManager, timestamp: i64) -> Self {
        Self {
            timestamp,
            symbols: manager.symbols().cloned().collect(),
            orders: manager.orders().copied().collect(),
        }
    }
}

/// Manages snapshot files inside one directory.
#[derive(Debug, Clone)]
pub struct Snapshotter {
    dir: PathBuf,
}

impl Snapshotter {
    /// Create a snapshotter over `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self, timestamp: i64) -> PathBuf {
        self.dir.join(format!("snapshot-{timestamp}.snap"))
    }

    /// Serialise and write a snapshot atomically: compress into a temp file,
    /// fsync, then rename onto the final name. A crash mid-write never
    /// leaves a partial `.snap` visible.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
        let path = self.snapshot_path(snapshot.timestamp);
        let tmp = path.with_extension("snap.tmp");

        let raw = encode_snapshot(snapshot);
        let compressed = zstd::encode_all(raw.as_slice(), COMPRESSION_LEVEL)?;

        {
            let mut file = File::create(&tmp)?;
            io::Write::write_all(&mut file, &compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Load the snapshot with the greatest timestamp, or `Ok(None)` when
    /// the directory is empty or missing.
    pub fn load_latest(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let mut latest: Option<i64> = None;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(timestamp) = parse_snapshot_name(&name) else {
                continue;
            };
            if latest.map_or(true, |current| timestamp > current) {
                latest = Some(timestamp);
            }
        }
        let Some(timestamp) = latest else {
            return Ok(None);
        };

        let compressed = fs::read(self.snapshot_path(timestamp))?;
        let raw = zstd::decode_all(compressed.as_slice())?;
        Ok(Some(decode_snapshot(&raw)?))
    }
}

fn parse_snapshot_name(name: &str) -> Option<i64> {
    name.strip_prefix("snapshot-")?
        .strip_suffix(".snap")?
        .parse()
        .ok()
}

fn encode_snapshot(snapshot: &Snapshot) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        24 + snapshot.symbols.len() * 13 + snapshot.orders.len() * ORDER_WIRE_SIZE,
    );
    buf.extend_from_slice(&SNAPSHOT_MAGIC);
    buf.extend_from_slice(&snapshot.timestamp.to_be_bytes());

    buf.extend_from_slice(&(snapshot.symbols.len() as u32).to_be_bytes());
    for symbol in &snapshot.symbols {
        buf.extend_from_slice(&symbol.id.as_u32().to_be_bytes());
        let name = symbol.name.as_bytes();
        let name = &name[..name.len().min(255)];
        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
    }

    buf.extend_from_slice(&(snapshot.orders.len() as u32).to_be_bytes());
    let mut order_buf = [0u8; ORDER_WIRE_SIZE];
    for order in &snapshot.orders {
        wire::encode_order(&mut order_buf, order);
        buf.extend_from_slice(&order_buf);
    }
    buf
}

fn decode_snapshot(data: &[u8]) -> Result<Snapshot, SnapshotError> {
    let mut pos = 0usize;

    let magic = take(data, &mut pos, 8, "magic")?;
    if magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let timestamp = i64::from_be_bytes(take(data, &mut pos, 8, "timestamp")?.try_into().unwrap());

    let symbol_count =
        u32::from_be_bytes(take(data, &mut pos, 4, "symbol count")?.try_into().unwrap());
    let mut symbols = Vec::with_capacity(symbol_count as usize);
    for _ in 0..symbol_count {
        let id = u32::from_be_bytes(take(data, &mut pos, 4, "symbol id")?.try_into().unwrap());
        let name_len = take(data, &mut pos, 1, "symbol name length")?[0] as usize;
        let name_bytes = take(data, &mut pos, name_len, "symbol name")?;
        let name = String::from_utf8_lossy(name_bytes).to_string();
        symbols.push(Symbol {
            id: SymbolId::new(id),
            name,
        });
    }

    let order_count =
        u32::from_be_bytes(take(data, &mut pos, 4, "order count")?.try_into().unwrap());
    let mut orders = Vec::with_capacity(order_count as usize);
    for _ in 0..order_count {
        let order_bytes = take(data, &mut pos, ORDER_WIRE_SIZE, "order")?;
        orders.push(wire::decode_order(order_bytes)?);
    }

    Ok(Snapshot {
        timestamp,
        symbols,
        orders,
    })
}

fn take<'a>(
    data: &'a [u8],
    pos: &mut usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], SnapshotError> {
    if data.len() < *pos + len {
        return Err(SnapshotError::Truncated(what));
    }
    let slice = &data[*pos..*pos + len];
    *pos += len;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_snapshot(timestamp: i64) -> Snapshot {
        let mut order = Order::limit(
            OrderId::new(1),
            SymbolId::new(1),
            OrderSide::Buy,
            Price::new(10_000),
            Quantity::new(100),
        );
        order.executed_quantity = Quantity::new(25);
        order.leaves_quantity = Quantity::new(75);
        Snapshot {
            timestamp,
            symbols: vec![
                Symbol::new(SymbolId::new(1), "AAPL"),
                Symbol::new(SymbolId::new(2), "MSFT"),
            ],
            orders: vec![order],
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path()).unwrap();
        let snapshot = sample_snapshot(1_000);

        let path = snapshotter.save(&snapshot).unwrap();
        assert_eq!(path.file_name().unwrap(), "snapshot-1000.snap");

        let loaded = snapshotter.load_latest().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_latest_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path()).unwrap();
        assert!(snapshotter.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_load_latest_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path().join("nested")).unwrap();
        fs::remove_dir(tmp.path().join("nested")).unwrap();
        assert!(snapshotter.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_load_latest_picks_greatest_timestamp() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path()).unwrap();
        for timestamp in [100, 500, 300] {
            snapshotter.save(&sample_snapshot(timestamp)).unwrap();
        }
        let loaded = snapshotter.load_latest().unwrap().unwrap();
        assert_eq!(loaded.timestamp, 500);
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path()).unwrap();
        snapshotter.save(&sample_snapshot(1_000)).unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path()).unwrap();

        let mut raw = encode_snapshot(&sample_snapshot(1_000));
        raw[0] = b'X';
        let compressed = zstd::encode_all(raw.as_slice(), COMPRESSION_LEVEL).unwrap();
        fs::write(tmp.path().join("snapshot-1000.snap"), compressed).unwrap();

        assert!(matches!(
            snapshotter.load_latest(),
            Err(SnapshotError::BadMagic)
        ));
    }

    #[test]
    fn test_truncated_snapshot_rejected() {
        let raw = encode_snapshot(&sample_snapshot(1_000));
        let result = decode_snapshot(&raw[..raw.len() - 5]);
        assert!(matches!(result, Err(SnapshotError::Truncated(_))));
    }

    #[test]
    fn test_foreign_files_ignored() {
        let tmp = TempDir::new().unwrap();
        let snapshotter = Snapshotter::new(tmp.path()).unwrap();
        fs::write(tmp.path().join("notes.txt"), b"hello").unwrap();
        fs::write(tmp.path().join("snapshot-abc.snap"), b"junk").unwrap();
        assert!(snapshotter.load_latest().unwrap().is_none());
    }
}
