//! Store Module
//!
//! The durable key-value store that every connection shares.
//!
//! ## Responsibilities
//! - Coordinate the WAL and the MemTable
//! - Serialize mutations, let reads run concurrently
//! - Replay the WAL on startup
//! - Compact the WAL into a snapshot when it grows stale

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::{Config, WalSyncStrategy};
use crate::error::{KnowsqlError, Result};
use crate::memtable::MemTable;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The shared key-value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (set/delete/incr/compact): serialized by the `wal` mutex.
///   The guard is held from the WAL append through the MemTable update, so
///   mutations reach the log and the map in the same order.
///
/// - **Reads** (get/keys): only take the MemTable read lock. A write is
///   visible to every read that starts after the write returns.
///
/// ## Durability
/// A mutation is appended to the WAL before the MemTable changes. If the
/// append fails the MemTable is untouched and the caller gets
/// [`KnowsqlError::Durability`].
pub struct Store {
    config: Config,

    wal_path: PathBuf,

    /// Write-ahead log; its lock is the write lock
    wal: Mutex<WalWriter>,

    memtable: MemTable,
}

impl Store {
    const WAL_FILENAME: &'static str = "wal.log";
    const COMPACT_FILENAME: &'static str = "wal.log.compact";

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Replay the WAL, discarding a damaged tail
    /// 3. Open the WAL for appends
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir).map_err(|e| {
            KnowsqlError::Startup(format!(
                "cannot create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path).map_err(|e| {
                KnowsqlError::Startup(format!("cannot replay {}: {}", wal_path.display(), e))
            })?;

            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => {
                        memtable.put(Bytes::from(key), Bytes::from(value));
                    }
                    Operation::Delete { key } => {
                        memtable.delete(&key);
                    }
                }
            }

            tracing::info!(
                recovered = recovery.entries_recovered,
                corrupted = recovery.entries_corrupted,
                last_lsn = recovery.last_lsn,
                keys = memtable.entry_count(),
                "WAL replay complete"
            );
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy).map_err(|e| {
            KnowsqlError::Startup(format!("cannot open {}: {}", wal_path.display(), e))
        })?;

        let store = Self {
            config,
            wal_path,
            wal: Mutex::new(wal),
            memtable,
        };

        {
            let mut wal = store.wal.lock();
            store.maybe_compact(&mut wal);
        }

        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.memtable.get(key)
    }

    /// Bind `key` to `value`, replacing any previous value
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut wal = self.wal.lock();

        wal.append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        self.memtable
            .put(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));

        self.maybe_compact(&mut wal);
        Ok(())
    }

    /// Remove a key
    ///
    /// Returns `false` when the key was not bound; nothing is logged then.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut wal = self.wal.lock();

        if !self.memtable.contains(key) {
            return Ok(false);
        }

        wal.append(Operation::Delete { key: key.to_vec() })?;
        self.memtable.delete(key);

        self.maybe_compact(&mut wal);
        Ok(true)
    }

    /// Add one to the integer stored at `key` and return the new value
    ///
    /// A missing key counts as 0.
    pub fn incr(&self, key: &[u8]) -> Result<i64> {
        let mut wal = self.wal.lock();

        let current = match self.memtable.get(key) {
            None => 0,
            Some(value) => std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| KnowsqlError::InvalidValue("value is not an integer".to_string()))?,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| KnowsqlError::InvalidValue("increment would overflow".to_string()))?;
        let encoded = next.to_string().into_bytes();

        wal.append(Operation::Put {
            key: key.to_vec(),
            value: encoded.clone(),
        })?;
        self.memtable
            .put(Bytes::copy_from_slice(key), Bytes::from(encoded));

        self.maybe_compact(&mut wal);
        Ok(next)
    }

    /// All keys in byte order
    pub fn keys(&self) -> Vec<Bytes> {
        self.memtable.keys()
    }

    /// Rewrite the WAL as one `Put` per live key
    pub fn compact(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.compact_locked(&mut wal)
    }

    /// Compact when the log holds mostly superseded records
    fn maybe_compact(&self, wal: &mut WalWriter) {
        let threshold = self.config.compaction_threshold;
        let records = wal.entry_count();
        let live = self.memtable.entry_count() as u64;

        if threshold == 0 || records < threshold || records <= live.saturating_mul(2) {
            return;
        }

        if let Err(e) = self.compact_locked(wal) {
            // The triggering write is already durable; keep the old log.
            tracing::warn!("WAL compaction failed: {}", e);
        }
    }

    /// Called with the write lock held
    fn compact_locked(&self, wal: &mut WalWriter) -> Result<()> {
        let before = wal.entry_count();
        let snapshot_path = self.config.data_dir.join(Self::COMPACT_FILENAME);
        if snapshot_path.exists() {
            fs::remove_file(&snapshot_path)?;
        }

        let mut snapshot =
            WalWriter::open(&snapshot_path, WalSyncStrategy::EveryNEntries { count: usize::MAX })?;
        for (key, value) in self.memtable.iter() {
            snapshot.append(Operation::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            })?;
        }
        snapshot.sync()?;
        snapshot.rename(&self.wal_path)?;

        // The old log is unlinked now; appends must follow the new one
        snapshot.set_sync_strategy(self.config.wal_sync_strategy);
        *wal = snapshot;

        if let Err(e) = sync_dir(&self.config.data_dir) {
            tracing::warn!(
                dir = %self.config.data_dir.display(),
                "Could not sync directory after compaction: {}",
                e
            );
        }

        tracing::info!(before, after = wal.entry_count(), "WAL compacted");
        Ok(())
    }

    /// Flush everything to disk
    pub fn close(&self) -> Result<()> {
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    /// Records currently in the WAL
    pub fn wal_entry_count(&self) -> u64 {
        self.wal.lock().entry_count()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
