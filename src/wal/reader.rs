//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{KnowsqlError, Result};
use super::entry::{EntryHeader, MAX_ENTRY_SIZE};
use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset just past the last entry returned
    position: u64,

    /// Set once a truncated record has been seen at the end of the file
    partial_tail: bool,

    /// File offset where the last rejected record claimed to end
    corrupt_end: Option<u64>,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            partial_tail: false,
            corrupt_end: None,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file, including when the file ends in
    /// the middle of a record. A checksum mismatch is an error.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.partial_tail {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        let read = read_fully(&mut self.reader, &mut raw)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            self.partial_tail = true;
            return Ok(None);
        }

        let header = EntryHeader::decode(&raw);
        let record_end = self.position + (HEADER_SIZE as u64) + u64::from(header.len);
        if header.len > MAX_ENTRY_SIZE {
            self.corrupt_end = Some(record_end);
            return Err(KnowsqlError::WalCorruption(format!(
                "entry length {} at offset {} exceeds limit",
                header.len, self.position
            )));
        }

        let mut data = vec![0u8; header.len as usize];
        if read_fully(&mut self.reader, &mut data)? < data.len() {
            self.partial_tail = true;
            return Ok(None);
        }

        let entry = WalEntry::from_parts(header, &data).map_err(|e| {
            self.corrupt_end = Some(record_end);
            e
        })?;
        self.position = record_end;
        Ok(Some(entry))
    }

    /// Bytes of well-formed entries consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the file ended inside a record
    pub fn hit_partial_tail(&self) -> bool {
        self.partial_tail
    }

    /// Where the record that failed to decode would have ended
    ///
    /// `None` until a corrupted record has been seen. Recovery compares
    /// this with the file length to tell a torn final write from damage
    /// in the middle of the log.
    pub fn corrupt_record_end(&self) -> Option<u64> {
        self.corrupt_end
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
///
/// Yields at most one error, then stops.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
