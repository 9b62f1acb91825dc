//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries from WAL file
//! - Iterator functionality
//! - Partial write handling
//! - Empty file handling

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use knowsql::wal::{Operation, WalEntry, WalReader, HEADER_SIZE};
use knowsql::KnowsqlError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn entry(lsn: u64, key: &str) -> WalEntry {
    WalEntry::new(
        lsn,
        Operation::Put {
            key: key.as_bytes().to_vec(),
            value: b"value".to_vec(),
        },
    )
}

fn write_bytes(path: &PathBuf, chunks: &[Vec<u8>]) {
    let mut file = File::create(path).unwrap();
    for chunk in chunks {
        file.write_all(chunk).unwrap();
    }
    file.sync_all().unwrap();
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert!(!reader.hit_partial_tail());
}

#[test]
fn test_read_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
    let chunks: Vec<Vec<u8>> = entries.iter().map(|e| e.serialize().unwrap()).collect();
    write_bytes(&wal_path, &chunks);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for expected in &entries {
        assert_eq!(&reader.next_entry().unwrap().unwrap(), expected);
    }
    assert!(reader.next_entry().unwrap().is_none());

    let total: usize = chunks.iter().map(Vec::len).sum();
    assert_eq!(reader.position(), total as u64);
}

#[test]
fn test_open_missing_file_fails() {
    let (_temp, wal_path) = setup_temp_wal();

    assert!(matches!(WalReader::open(&wal_path), Err(KnowsqlError::Io(_))));
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_partial_header_ends_iteration() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1, "a").serialize().unwrap();
    write_bytes(&wal_path, &[good.clone(), vec![0u8; HEADER_SIZE - 3]]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().unwrap().is_none());
    assert!(reader.hit_partial_tail());
    assert_eq!(reader.position(), good.len() as u64);
}

#[test]
fn test_partial_data_ends_iteration() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1, "a").serialize().unwrap();
    let mut torn = entry(2, "b").serialize().unwrap();
    torn.truncate(HEADER_SIZE + 3);
    write_bytes(&wal_path, &[good, torn]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_entry().unwrap().unwrap().lsn, 1);
    assert!(reader.next_entry().unwrap().is_none());
    assert!(reader.hit_partial_tail());
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_collects_all() {
    let (_temp, wal_path) = setup_temp_wal();
    let chunks: Vec<Vec<u8>> = (1..=20)
        .map(|i| entry(i, &format!("key{}", i)).serialize().unwrap())
        .collect();
    write_bytes(&wal_path, &chunks);

    let reader = WalReader::open(&wal_path).unwrap();
    let entries: Vec<_> = reader.entries().collect::<Result<Vec<_>, _>>().unwrap();

    assert_eq!(entries.len(), 20);
    assert_eq!(entries.last().unwrap().lsn, 20);
}

#[test]
fn test_iterator_stops_after_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1, "a").serialize().unwrap();
    let mut bad = entry(2, "b").serialize().unwrap();
    *bad.last_mut().unwrap() ^= 0xFF;
    let after = entry(3, "c").serialize().unwrap();
    write_bytes(&wal_path, &[good, bad, after]);

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(KnowsqlError::WalCorruption(_))));
}

#[test]
fn test_corrupt_record_end_reported() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1, "a").serialize().unwrap();
    let mut bad = entry(2, "b").serialize().unwrap();
    bad[HEADER_SIZE] ^= 0xFF;
    let after = entry(3, "c").serialize().unwrap();
    write_bytes(&wal_path, &[good.clone(), bad.clone(), after]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.corrupt_record_end().is_none());
    reader.next_entry().unwrap();
    assert!(reader.next_entry().is_err());

    assert_eq!(reader.position(), good.len() as u64);
    assert_eq!(
        reader.corrupt_record_end(),
        Some((good.len() + bad.len()) as u64)
    );
}
