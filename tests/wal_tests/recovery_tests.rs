//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL
//! - Recovery from an empty or missing WAL
//! - Recovery with partial writes (truncated tail) and tail trimming
//! - Verify mode (stats only, file untouched)
//! - Replay determinism

use std::fs::File;
use std::path::PathBuf;
use kvstore::config::WalSyncStrategy;
use kvstore::wal::{WalEntry, WalRecovery, WalTail, WalWriter};
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
    let writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append_set(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes())
            .unwrap();
    }
}

/// Append raw bytes to simulate a crash mid-append
fn append_garbage(path: &PathBuf, bytes: &[u8]) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
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
    assert!(!wal_path.exists());
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 0);
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.discarded_bytes, 0);
    assert_eq!(result.tail, WalTail::Clean);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.valid_bytes, std::fs::metadata(&wal_path).unwrap().len());
    assert!(!result.was_truncated);

    // Verify entries are in write order
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry, &WalEntry::set(format!("key{}", i), format!("value{}", i)));
    }
}

// =============================================================================
// Recover: Partial Write Tests
// =============================================================================

#[test]
fn test_recover_trims_partial_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);
    let clean_len = std::fs::metadata(&wal_path).unwrap().len();

    // Op byte, key length and part of the key of a sixth entry
    append_garbage(&wal_path, &[0x01, 0x00, 0x00, 0x00, 0x08, b'k', b'e']);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(result.tail, WalTail::Truncated);
    assert_eq!(result.valid_bytes, clean_len);
    assert_eq!(result.discarded_bytes, 7);
    assert!(result.was_truncated);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_appends_after_trim_are_replayed() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    append_garbage(&wal_path, &[0x02, 0x00]);

    WalRecovery::recover(&wal_path).unwrap();

    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append_set(b"after", b"crash").unwrap();
    drop(writer);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3], WalEntry::set(b"after".to_vec(), b"crash".to_vec()));
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_discards_malformed_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let clean_len = std::fs::metadata(&wal_path).unwrap().len();

    append_garbage(&wal_path, &[0xEE; 32]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(matches!(result.tail, WalTail::Malformed(_)));
    assert_eq!(result.discarded_bytes, 32);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), clean_len);
}

// =============================================================================
// Replay / Verify Tests
// =============================================================================

#[test]
fn test_replay_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);
    append_garbage(&wal_path, &[0x01, 0x00]);
    let len_before = std::fs::metadata(&wal_path).unwrap().len();

    let (entries, result) = WalRecovery::replay(&wal_path).unwrap();

    assert_eq!(entries.len(), 4);
    assert_eq!(result.discarded_bytes, 2);
    assert!(!result.was_truncated);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_verify_reports_without_modifying() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    append_garbage(&wal_path, &[0x01]);
    let len_before = std::fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 3);
    assert_eq!(result.discarded_bytes, 1);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_replay_is_deterministic() {
    let (_temp, wal_path) = setup_temp_wal();
    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append_set(b"a", b"1").unwrap();
    writer.append_delete(b"a").unwrap();
    writer.append_set(b"a", b"2").unwrap();
    writer.append_set(b"b", b"3").unwrap();
    drop(writer);

    let first = WalRecovery::replay(&wal_path).unwrap();
    let second = WalRecovery::replay(&wal_path).unwrap();
    assert_eq!(first, second);
}
