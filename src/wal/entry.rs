//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their
//! on-disk encoding.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{KnowsqlError, Result};

/// LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest data section accepted when decoding (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Decoded fixed-size record header
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl EntryHeader {
    pub(crate) fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);
        Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode as `LSN | CRC | Len | Data`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(&(&self.operation, self.timestamp))
            .map_err(|e| KnowsqlError::Serialization(e.to_string()))?;

        if data.len() > MAX_ENTRY_SIZE as usize {
            return Err(KnowsqlError::Serialization(format!(
                "entry of {} bytes exceeds the {} byte limit",
                data.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let crc = compute_crc(self.lsn, &data);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Decode one complete record
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KnowsqlError::WalCorruption(format!(
                "incomplete header: {} of {} bytes",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&bytes[..HEADER_SIZE]);
        let header = EntryHeader::decode(&raw);

        if header.len > MAX_ENTRY_SIZE {
            return Err(KnowsqlError::WalCorruption(format!(
                "entry length {} exceeds limit",
                header.len
            )));
        }

        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(KnowsqlError::WalCorruption(format!(
                "incomplete data: {} of {} bytes",
                bytes.len() - HEADER_SIZE,
                header.len
            )));
        }

        Self::from_parts(header, &bytes[HEADER_SIZE..end])
    }

    /// Verify the checksum and decode the data section
    pub(crate) fn from_parts(header: EntryHeader, data: &[u8]) -> Result<Self> {
        let actual = compute_crc(header.lsn, data);
        if actual != header.crc {
            return Err(KnowsqlError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:08x}, computed {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let (operation, timestamp): (Operation, u64) = bincode::deserialize(data)
            .map_err(|e| KnowsqlError::WalCorruption(format!("undecodable entry: {}", e)))?;

        Ok(Self {
            lsn: header.lsn,
            operation,
            timestamp,
        })
    }
}

/// CRC32 over the LSN bytes and the data section
pub fn compute_crc(lsn: u64, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(data);
    hasher.finalize()
}
