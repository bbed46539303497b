//! Tests for the WAL writer
//!
//! These tests verify:
//! - LSN assignment and sequencing
//! - Buffering, flushing and the buffer ceiling
//! - Segment rotation and the segment ceiling
//! - Truncation of sealed segments
//! - Integration with recovery

use std::fs;
use std::path::Path;

use walrog::wal::{SegmentStore, WalRecovery};
use walrog::{Wal, WalError, WalOptions, WalSyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn options(dir: &Path, buffer_size: u32, segment_size: u32) -> WalOptions {
    WalOptions::builder()
        .dir(dir)
        .buffer_size(buffer_size)
        .segment_size(segment_size)
        .build()
}

fn open_wal(dir: &Path, buffer_size: u32, segment_size: u32) -> Wal {
    Wal::open(options(dir, buffer_size, segment_size)).unwrap()
}

fn segment_ids(dir: &Path) -> Vec<u64> {
    SegmentStore::list_segments(dir)
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_first_segment_and_checkpoint() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("wal");

    let wal = open_wal(&dir, 64, 256);

    assert!(dir.join("wal_000.log").exists());
    assert!(dir.join("checkpoint").exists());
    assert_eq!(wal.hot_segment().id(), 0);
    assert_eq!(wal.next_lsn(), 0);
    assert_eq!(wal.buffered(), 0);
    assert_eq!(wal.segment_used(), 0);
}

#[test]
fn test_open_rejects_segment_not_multiple_of_buffer() {
    let temp = TempDir::new().unwrap();
    let err = Wal::open(options(temp.path(), 64, 100)).unwrap_err();

    assert!(matches!(err, WalError::Config(_)));
    assert!(segment_ids(temp.path()).is_empty());
}

// =============================================================================
// LSN Tests
// =============================================================================

#[test]
fn test_lsn_sequential_from_zero() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 1024, 4096);

    for expected in 0..100u32 {
        let lsn = wal.append(format!("record{}", expected).as_bytes()).unwrap();
        assert_eq!(lsn, expected);
    }
    assert_eq!(wal.next_lsn(), 100);
}

#[test]
fn test_rejected_append_does_not_consume_lsn() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 32, 64);

    assert_eq!(wal.append(b"a").unwrap(), 0);
    assert!(wal.append(&[0u8; 64]).is_err());
    assert_eq!(wal.append(b"b").unwrap(), 1);
}

// =============================================================================
// Buffering Tests
// =============================================================================

#[test]
fn test_append_within_buffer_does_no_io() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.append(b"hello").unwrap();
    wal.append(b"world").unwrap();

    assert_eq!(wal.buffered(), 34);
    assert_eq!(fs::metadata(wal.hot_segment().path()).unwrap().len(), 0);
}

#[test]
fn test_record_larger_than_buffer_always_fails() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 32, 64);

    // Encoded size 33 against an empty buffer
    let err = wal.append(&[0u8; 21]).unwrap_err();
    assert!(matches!(err, WalError::RecordTooLarge { size: 33, limit: 32 }));
    assert_eq!(err.category(), walrog::ErrorCategory::Configuration);

    // Exactly the buffer size is accepted
    wal.append(&[0u8; 20]).unwrap();
    assert_eq!(wal.buffered(), 32);

    // Still rejected with a full buffer, and nothing is flushed
    assert!(wal.append(&[0u8; 21]).is_err());
    assert_eq!(wal.buffered(), 32);
    assert_eq!(wal.segment_used(), 0);
}

#[test]
fn test_explicit_flush_writes_buffer() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.append(b"hello").unwrap();
    wal.flush().unwrap();

    assert_eq!(wal.buffered(), 0);
    assert_eq!(wal.segment_used(), 17);
    assert_eq!(fs::metadata(wal.hot_segment().path()).unwrap().len(), 17);
}

#[test]
fn test_sync_strategy_manual_still_writes_on_flush() {
    let temp = TempDir::new().unwrap();
    let options = WalOptions::builder()
        .dir(temp.path())
        .buffer_size(64)
        .segment_size(128)
        .sync_strategy(WalSyncStrategy::Manual)
        .build();
    let mut wal = Wal::open(options).unwrap();

    wal.append(b"manual").unwrap();
    wal.flush().unwrap();
    wal.sync().unwrap();

    let entries = WalRecovery::recover(wal.hot_segment().path()).unwrap();
    assert_eq!(entries.len(), 1);
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_segment_used_never_exceeds_segment_size() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 40, 80);

    for i in 0..500usize {
        wal.append(&vec![b'x'; i % 25]).unwrap();
        assert!(wal.buffered() <= 40);
        assert!(wal.segment_used() <= 80);
    }
    wal.flush().unwrap();
    assert!(wal.segment_used() <= 80);

    for (_, path) in SegmentStore::list_segments(temp.path()).unwrap() {
        assert!(fs::metadata(&path).unwrap().len() <= 80);
    }
}

#[test]
fn test_rotation_happens_only_when_buffer_cannot_fit() {
    let temp = TempDir::new().unwrap();
    // Records of 12 + 4 = 16 bytes
    let mut wal = open_wal(temp.path(), 32, 64);

    for _ in 0..4 {
        wal.append(b"abcd").unwrap();
    }
    // 64 bytes appended: 32 flushed, 32 buffered
    assert_eq!(wal.segment_used(), 32);
    assert_eq!(wal.hot_segment().id(), 0);

    for _ in 0..2 {
        wal.append(b"abcd").unwrap();
    }
    // Second flush filled the segment exactly
    assert_eq!(wal.segment_used(), 64);
    assert_eq!(wal.hot_segment().id(), 0);

    for _ in 0..2 {
        wal.append(b"abcd").unwrap();
    }
    // Buffered 32 against 0 remaining: rotate
    assert_eq!(wal.hot_segment().id(), 1);
    assert_eq!(wal.segment_used(), 32);
    assert_eq!(segment_ids(temp.path()), vec![0, 1]);
}

#[test]
fn test_manual_rotate_swaps_hot_segment() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.append(b"before").unwrap();
    wal.flush().unwrap();
    wal.rotate().unwrap();

    assert_eq!(wal.hot_segment().id(), 1);
    assert_eq!(wal.segment_used(), 0);

    let sealed = wal.sealed_segments();
    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].first_lsn, Some(0));
    assert_eq!(sealed[0].last_lsn, Some(0));
}

#[test]
fn test_rotate_keeps_buffer_for_new_segment() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.append(b"pending").unwrap();
    wal.rotate().unwrap();
    wal.flush().unwrap();

    assert!(WalRecovery::recover(&temp.path().join("wal_000.log")).unwrap().is_empty());
    let entries = WalRecovery::recover(&temp.path().join("wal_001.log")).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(&entries[0].payload[..], b"pending");
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate_removes_fully_covered_sealed_segments() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 32, 32);

    // Two records per segment
    for i in 0..6u32 {
        wal.append(&i.to_le_bytes()).unwrap();
    }
    wal.flush().unwrap();
    assert_eq!(wal.hot_segment().id(), 2);
    assert_eq!(wal.sealed_segments().len(), 2);

    // Covers segment 0 (LSN 0..=1) but only half of segment 1 (LSN 2..=3)
    let removed = wal.truncate(0, 2).unwrap();
    assert_eq!(removed, vec![0]);
    assert_eq!(segment_ids(temp.path()), vec![1, 2]);

    let removed = wal.truncate(0, 3).unwrap();
    assert_eq!(removed, vec![1]);
    assert_eq!(segment_ids(temp.path()), vec![2]);
}

#[test]
fn test_truncate_never_removes_hot_segment() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.append(b"hot").unwrap();
    wal.flush().unwrap();

    let removed = wal.truncate(0, u32::MAX).unwrap();
    assert!(removed.is_empty());
    assert!(wal.hot_segment().path().exists());
}

#[test]
fn test_truncate_removes_empty_sealed_segments() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.rotate().unwrap();
    let removed = wal.truncate(100, 200).unwrap();

    assert_eq!(removed, vec![0]);
    assert_eq!(segment_ids(temp.path()), vec![1]);
}

// =============================================================================
// Close / Reopen Tests
// =============================================================================

#[test]
fn test_close_flushes_buffer() {
    let temp = TempDir::new().unwrap();
    let mut wal = open_wal(temp.path(), 64, 256);

    wal.append(b"one").unwrap();
    wal.append(b"two").unwrap();
    wal.close().unwrap();

    let entries = WalRecovery::recover(&temp.path().join("wal_000.log")).unwrap();
    let lsns: Vec<u32> = entries.iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![0, 1]);
}

#[test]
fn test_reopen_continues_lsn_in_new_segment() {
    let temp = TempDir::new().unwrap();

    {
        let mut wal = open_wal(temp.path(), 64, 256);
        for _ in 0..3 {
            wal.append(b"x").unwrap();
        }
        wal.close().unwrap();
    }

    let mut wal = open_wal(temp.path(), 64, 256);
    assert_eq!(wal.hot_segment().id(), 1);
    assert_eq!(wal.next_lsn(), 3);
    assert_eq!(wal.append(b"y").unwrap(), 3);

    // The previous segment is tracked and can be truncated
    assert_eq!(wal.sealed_segments().len(), 1);
    assert_eq!(wal.truncate(0, 2).unwrap(), vec![0]);
}

#[test]
fn test_drop_without_close_loses_only_buffered_records() {
    let temp = TempDir::new().unwrap();

    {
        let mut wal = open_wal(temp.path(), 64, 256);
        wal.append(b"durable").unwrap();
        wal.flush().unwrap();
        wal.append(b"lost").unwrap();
    }

    let entries = WalRecovery::recover(&temp.path().join("wal_000.log")).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(&entries[0].payload[..], b"durable");
}
