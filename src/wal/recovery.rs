//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{KnowsqlError, Result};
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Corrupted final entries dropped (0 or 1)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Length of the well-formed prefix of the file
    pub valid_bytes: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at a partial or corrupted final entry
    /// 3. Truncate the file after the last valid entry
    /// 4. Return all valid entries in order
    ///
    /// A corrupted entry with more data after it is not a torn write; the
    /// file is left alone and [`KnowsqlError::WalCorruption`] is returned.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut entries = Vec::new();
        let result = Self::scan(path, |entry| entries.push(entry))?;

        if result.was_truncated {
            tracing::warn!(
                path = %path.display(),
                valid_bytes = result.valid_bytes,
                corrupted = result.entries_corrupted,
                "Discarding damaged WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_bytes)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path, |_| {})
    }

    fn scan<F: FnMut(WalEntry)>(path: &Path, mut on_entry: F) -> Result<RecoveryResult> {
        let file_len = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecoveryResult::default()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = WalReader::open(path)?;
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    on_entry(entry);
                }
                Ok(None) => break,
                Err(KnowsqlError::WalCorruption(reason)) => {
                    let offset = reader.position();
                    let is_tail = reader
                        .corrupt_record_end()
                        .map_or(true, |end| end >= file_len);
                    if !is_tail {
                        return Err(KnowsqlError::WalCorruption(format!(
                            "entry at offset {} is damaged and followed by more data: {}",
                            offset, reason
                        )));
                    }
                    tracing::warn!(offset, %reason, "Corrupted final WAL entry");
                    result.entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        result.valid_bytes = reader.position();
        result.was_truncated = result.valid_bytes < file_len;
        Ok(result)
    }
}
