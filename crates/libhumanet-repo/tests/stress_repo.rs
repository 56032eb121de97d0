//! Stress tests for concurrent repository operations
//!
//! Writers racing on the same idea must leave a bounded, strictly ordered,
//! parseable history behind them.

use libhumanet_repo::{RepoStore, StorageConfig, Template, VersionManager, HISTORY_CAPACITY};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

/// Store whose lock wait outlasts any contention in these tests
fn patient_store(root: &std::path::Path) -> Arc<RepoStore> {
    let config = StorageConfig {
        lock_timeout_ms: 120_000,
        ..StorageConfig::with_root(root.join("ideas"))
    };
    Arc::new(RepoStore::new(config))
}

#[test]
fn test_concurrent_writers_same_file() {
    let dir = tempdir().unwrap();
    let store = patient_store(dir.path());
    store.create_repository("busy", Template::Basic).unwrap();
    store.update_file("busy", "shared.md", "seed").unwrap();

    let num_threads = 8;
    let writes_per_thread = 12;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                let mut success_count = 0;
                for i in 0..writes_per_thread {
                    let content = format!("thread {} write {}", thread_id, i);
                    match store.update_file("busy", "shared.md", content) {
                        Ok(Some(_)) => success_count += 1,
                        Ok(None) => eprintln!("Thread {} write {} created the file", thread_id, i),
                        Err(e) => eprintln!("Thread {} write {} failed: {:?}", thread_id, i, e),
                    }
                }
                success_count
            })
        })
        .collect();

    let total_success: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total_success, num_threads * writes_per_thread);

    let history = store.get_file_history("busy", "shared.md").unwrap();
    assert_eq!(history.len(), HISTORY_CAPACITY);
    for pair in history.windows(2) {
        assert!(pair[0].seq > pair[1].seq, "history out of order: {:?}", history);
    }
    let ids: HashSet<&str> = history.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids.len(), history.len());

    // Every record still resolves to its content
    for version in &history {
        store
            .get_file_version_content("busy", "shared.md", &version.id)
            .unwrap();
    }

    // history.json on disk parses and matches
    let root = store.repo_root("busy").unwrap();
    let on_disk = VersionManager::new(&root).load_history("shared.md").unwrap();
    assert_eq!(on_disk.len(), HISTORY_CAPACITY);

    let report = store.check_repository("busy").unwrap();
    assert!(report.is_healthy(), "{:?}", report);
}

#[test]
fn test_concurrent_writers_distinct_files() {
    let dir = tempdir().unwrap();
    let store = patient_store(dir.path());
    store.create_repository("many", Template::Research).unwrap();

    let num_threads = 6;
    let writes_per_thread = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let path = format!("docs/thread-{}.md", thread_id);
                for i in 0..writes_per_thread {
                    store
                        .update_file("many", &path, format!("{}:{}", thread_id, i))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for thread_id in 0..num_threads {
        let path = format!("docs/thread-{}.md", thread_id);
        let content = store.get_file_content("many", &path).unwrap();
        assert_eq!(content, format!("{}:{}", thread_id, writes_per_thread - 1).into_bytes());
        let history = store.get_file_history("many", &path).unwrap();
        assert_eq!(history.len(), HISTORY_CAPACITY.min(writes_per_thread - 1));
    }

    let report = store.check_repository("many").unwrap();
    assert!(report.is_healthy(), "{:?}", report);
}

#[test]
fn test_readers_never_see_partial_writes() {
    let dir = tempdir().unwrap();
    let store = patient_store(dir.path());
    store.create_repository("rw", Template::Basic).unwrap();

    let payload = |n: usize| vec![b'a' + (n % 26) as u8; 64 * 1024];
    store.update_file("rw", "big.bin", payload(0)).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let writer = {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for n in 1..30 {
                store.update_file("rw", "big.bin", payload(n)).unwrap();
            }
        })
    };
    let reader = {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..60 {
                let content = store.get_file_content("rw", "big.bin").unwrap();
                assert_eq!(content.len(), 64 * 1024);
                assert!(content.iter().all(|b| *b == content[0]));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}
