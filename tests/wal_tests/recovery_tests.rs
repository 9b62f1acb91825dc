//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL (no corruption)
//! - Recovery from an empty or missing WAL
//! - Recovery with partial writes (truncated tail)
//! - Recovery with a corrupted final entry (CRC mismatch)
//! - Refusal when damage is followed by more entries
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use knowsql::config::WalSyncStrategy;
use knowsql::wal::{Operation, WalEntry, WalRecovery, WalWriter};
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

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Put {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            })
            .unwrap();
    }
}

fn put_entry(lsn: u64, key: &[u8]) -> WalEntry {
    WalEntry::new(
        lsn,
        Operation::Put {
            key: key.to_vec(),
            value: b"v".to_vec(),
        },
    )
}

fn write_raw(path: &PathBuf, chunks: &[&[u8]]) {
    let mut file = File::create(path).unwrap();
    for chunk in chunks {
        file.write_all(chunk).unwrap();
    }
    file.sync_all().unwrap();
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 10);
    assert_eq!(result.valid_bytes, fs::metadata(&wal_path).unwrap().len());
    assert!(!result.was_truncated);

    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
    }
}

// =============================================================================
// Recover: Partial Write Tests (was_truncated = true)
// =============================================================================

#[test]
fn test_recover_partial_header_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = put_entry(1, b"k").serialize().unwrap();
    write_raw(&wal_path, &[good.as_slice(), &[0u8; 8][..]]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.last_lsn, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);

    // The tail is gone from disk
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = put_entry(1, b"k").serialize().unwrap();
    let mut torn = put_entry(2, b"k2").serialize().unwrap();
    torn.truncate(20); // Header is 16 bytes, only 4 bytes of data
    write_raw(&wal_path, &[good.as_slice(), torn.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

// =============================================================================
// Recover: Corruption Tests (CRC mismatch)
// =============================================================================

#[test]
fn test_recover_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = put_entry(1, b"k1").serialize().unwrap();
    let mut bad = put_entry(2, b"k2").serialize().unwrap();
    if let Some(byte) = bad.last_mut() {
        *byte ^= 0xFF;
    }
    write_raw(&wal_path, &[good.as_slice(), bad.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_corruption_at_first_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = put_entry(1, b"k").serialize().unwrap();
    bytes[20] ^= 0xFF;
    write_raw(&wal_path, &[bytes.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

// =============================================================================
// Verify Tests (stats only, same logic as recover)
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = put_entry(1, b"k").serialize().unwrap();
    write_raw(&wal_path, &[good.as_slice(), &[0u8; 5][..]]);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(
        fs::metadata(&wal_path).unwrap().len(),
        good.len() as u64 + 5
    );
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 20);

    let verify_result = WalRecovery::verify(&wal_path).unwrap();
    let (entries, recover_result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), recover_result.entries_recovered as usize);
    assert_eq!(recover_result, verify_result);
}

// =============================================================================
// Damage Before Intact Entries
// =============================================================================

#[test]
fn test_recover_refuses_damage_followed_by_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    let first = put_entry(1, b"k1").serialize().unwrap();
    let mut second = put_entry(2, b"k2").serialize().unwrap();
    second[20] ^= 0xFF;
    let third = put_entry(3, b"k3").serialize().unwrap();
    write_raw(
        &wal_path,
        &[first.as_slice(), second.as_slice(), third.as_slice()],
    );
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::recover(&wal_path);

    assert!(matches!(result, Err(KnowsqlError::WalCorruption(_))));
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_verify_refuses_damage_in_first_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    {
        let mut file = OpenOptions::new().write(true).open(&wal_path).unwrap();
        file.seek(SeekFrom::Start(20)).unwrap();
        file.write_all(&[0xFF]).unwrap();
    }

    assert!(matches!(
        WalRecovery::verify(&wal_path),
        Err(KnowsqlError::WalCorruption(_))
    ));
    assert!(WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).is_err());
}

#[test]
fn test_damaged_final_entry_after_good_ones_is_dropped() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    let len = fs::metadata(&wal_path).unwrap().len();
    {
        let mut file = OpenOptions::new().write(true).open(&wal_path).unwrap();
        file.seek(SeekFrom::Start(len - 1)).unwrap();
        file.write_all(&[0xAA]).unwrap();
    }

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
    assert!(fs::metadata(&wal_path).unwrap().len() < len);
}
