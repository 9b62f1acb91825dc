//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{KnowsqlError, Result};
use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    file: File,
    path: PathBuf,

    /// LSN the next append will receive
    current_lsn: u64,

    /// Length of the file after the last successful append
    len: u64,

    sync_strategy: WalSyncStrategy,

    /// Entries appended since the last fsync
    uncommitted: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned so that numbering continues after its
    /// last valid entry. A damaged tail is cut off first, otherwise new
    /// entries would land behind it and never be replayed.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let scan = WalRecovery::verify(path)?;

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if scan.was_truncated {
            file.set_len(scan.valid_bytes)?;
            file.sync_all()?;
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            current_lsn: scan.last_lsn + 1,
            len: scan.valid_bytes,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Append an entry to the WAL
    ///
    /// Returns the LSN assigned to the entry. On failure the file is cut
    /// back to its previous length and the LSN is not consumed.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.current_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.write_and_sync(&bytes) {
            if let Err(rollback) = self.file.set_len(self.len) {
                tracing::error!(path = %self.path.display(), "WAL rollback failed: {}", rollback);
            }
            return Err(KnowsqlError::Durability(format!("WAL append failed: {}", e)));
        }

        self.len += bytes.len() as u64;
        self.current_lsn += 1;
        Ok(lsn)
    }

    fn write_and_sync(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)?;
        self.uncommitted += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted >= count,
        };
        if due {
            self.file.sync_data()?;
            self.uncommitted = 0;
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .map_err(|e| KnowsqlError::Durability(format!("WAL sync failed: {}", e)))?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Move the file to `to`, replacing whatever is there
    ///
    /// The open handle follows the file, so appends continue seamlessly.
    pub fn rename(&mut self, to: &Path) -> Result<()> {
        fs::rename(&self.path, to)?;
        self.path = to.to_path_buf();
        Ok(())
    }

    pub fn set_sync_strategy(&mut self, sync_strategy: WalSyncStrategy) {
        self.sync_strategy = sync_strategy;
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Entries written but not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Number of entries in the file
    pub fn entry_count(&self) -> u64 {
        self.current_lsn - 1
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
