//! Behaviour every ledger backend shares, exercised through the trait.

use checkr::checksum::Algorithm;
use checkr::ledger::{Ledger, LedgerLocation, UpsertOutcome};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::{tempdir, TempDir};

fn backends() -> Vec<(TempDir, Box<dyn Ledger>)> {
    let csv_dir = tempdir().unwrap();
    let csv = LedgerLocation::Csv(csv_dir.path().join("ledger.csv"))
        .open()
        .unwrap();

    let db_dir = tempdir().unwrap();
    let db_path = db_dir.path().join("ledger.sqlite");
    let db = LedgerLocation::Database(db_path.to_str().unwrap().to_string())
        .open()
        .unwrap();

    vec![(csv_dir, csv), (db_dir, db)]
}

#[test]
fn test_empty_ledger() {
    for (_dir, ledger) in backends() {
        assert!(ledger.records().unwrap().is_empty(), "{}", ledger.backend_name());
        assert!(ledger
            .lookup(Path::new("/nothing"), Algorithm::Md5)
            .unwrap()
            .is_none());
    }
}

#[test]
fn test_upsert_inserts_then_updates() {
    for (_dir, ledger) in backends() {
        let path = Path::new("/data/file.bin");
        let name = ledger.backend_name();

        assert_eq!(
            ledger.upsert(path, Algorithm::Md5, "aaaa").unwrap(),
            UpsertOutcome::Inserted,
            "{name}"
        );
        assert_eq!(
            ledger.upsert(path, Algorithm::Md5, "bbbb").unwrap(),
            UpsertOutcome::Updated,
            "{name}"
        );

        let stored = ledger.lookup(path, Algorithm::Md5).unwrap().unwrap();
        assert_eq!(stored.checksum, "bbbb", "{name}");
        assert_eq!(ledger.records().unwrap().len(), 1, "{name}");
    }
}

#[test]
fn test_one_record_per_algorithm() {
    for (_dir, ledger) in backends() {
        let path = Path::new("/data/file.bin");
        ledger.upsert(path, Algorithm::Md5, "aaaa").unwrap();
        ledger.upsert(path, Algorithm::Blake2b, "cccc").unwrap();

        assert_eq!(ledger.lookup(path, Algorithm::Md5).unwrap().unwrap().checksum, "aaaa");
        assert_eq!(
            ledger.lookup(path, Algorithm::Blake2b).unwrap().unwrap().checksum,
            "cccc"
        );
        assert!(ledger.lookup(path, Algorithm::Sha256).unwrap().is_none());
        assert_eq!(ledger.records().unwrap().len(), 2);
    }
}

#[test]
fn test_records_keep_insertion_order() {
    for (_dir, ledger) in backends() {
        for name in ["/z", "/a", "/m"] {
            ledger.upsert(Path::new(name), Algorithm::Md5, "00").unwrap();
        }
        ledger.upsert(Path::new("/a"), Algorithm::Md5, "11").unwrap();

        let paths: Vec<_> = ledger.records().unwrap().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/z", "/a", "/m"], "{}", ledger.backend_name());
    }
}

#[test]
fn test_concurrent_writers_never_duplicate_keys() {
    for (_dir, ledger) in backends() {
        let ledger: Arc<dyn Ledger> = Arc::from(ledger);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..10 {
                        let path = format!("/shared/{}", i % 5);
                        ledger
                            .upsert(Path::new(&path), Algorithm::Md5, &format!("{t}{i}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.records().unwrap().len(), 5, "{}", ledger.backend_name());
    }
}

#[test]
fn test_sqlite_timestamps_and_flat_file_without() {
    let backends = backends();
    for (_dir, ledger) in &backends {
        ledger.upsert(Path::new("/t"), Algorithm::Md5, "00").unwrap();
    }

    let csv_record = backends[0].1.lookup(Path::new("/t"), Algorithm::Md5).unwrap().unwrap();
    let db_record = backends[1].1.lookup(Path::new("/t"), Algorithm::Md5).unwrap().unwrap();
    assert!(csv_record.timestamps.is_none());
    assert!(db_record.timestamps.is_some());
}
