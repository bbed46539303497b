//! Tests for the shared WAL handle
//!
//! These tests verify:
//! - Appends from several threads are serialized
//! - Every LSN is handed out exactly once
//! - The log can be taken back out of the handle

use std::collections::HashSet;
use std::thread;

use walrog::{SharedWal, Wal, WalOptions, WalRecovery};
use tempfile::TempDir;

#[test]
fn test_concurrent_appends_get_unique_lsns() {
    let temp = TempDir::new().unwrap();
    let options = WalOptions::builder()
        .dir(temp.path())
        .buffer_size(256)
        .segment_size(1024)
        .build();
    let shared = SharedWal::new(Wal::open(options).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let wal = shared.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|i| wal.append(format!("t{}-{}", t, i).as_bytes()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut lsns = HashSet::new();
    for handle in handles {
        for lsn in handle.join().unwrap() {
            assert!(lsns.insert(lsn), "lsn {} handed out twice", lsn);
        }
    }
    assert_eq!(lsns.len(), 200);
    assert_eq!(shared.with(|wal| wal.next_lsn()), 200);

    let wal = shared.into_inner().unwrap();
    wal.close().unwrap();

    let recovered: Vec<u32> = WalRecovery::recover_dir(temp.path())
        .unwrap()
        .into_iter()
        .flat_map(|segment| segment.entries)
        .map(|entry| entry.lsn)
        .collect();
    assert_eq!(recovered, (0..200).collect::<Vec<u32>>());
}

#[test]
fn test_into_inner_fails_while_shared() {
    let temp = TempDir::new().unwrap();
    let options = WalOptions::builder()
        .dir(temp.path())
        .buffer_size(64)
        .segment_size(128)
        .build();
    let shared = SharedWal::new(Wal::open(options).unwrap());
    let other = shared.clone();

    let shared = shared.into_inner().unwrap_err();
    drop(other);
    assert!(shared.into_inner().is_ok());
}
