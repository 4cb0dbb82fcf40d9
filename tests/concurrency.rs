//! Concurrency Tests
//!
//! The store is shared across threads behind an `Arc`. Writers serialize,
//! readers run alongside, and first use of a collection initializes it once.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use docstore::store::DocumentStore;

fn shared_store() -> Arc<DocumentStore> {
    Arc::new(DocumentStore::open(":memory:").unwrap())
}

#[test]
fn test_concurrent_first_creates_in_one_collection() {
    let store = shared_store();
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .create("fresh", &format!(r#"{{"writer":{}}}"#, i))
                    .unwrap()
            })
        })
        .collect();

    let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), threads);

    let listed: HashSet<String> = store.collection_ids("fresh").unwrap().into_iter().collect();
    assert_eq!(listed, ids);

    let indexes = store.db().indexes().unwrap();
    assert_eq!(indexes.iter().filter(|n| n.as_str() == "fresh:_id").count(), 1);
}

#[test]
fn test_concurrent_updates_keep_one_consistent_version() {
    let store = shared_store();
    let id = store.create("counters", r#"{"writer":-1}"#).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|w| {
            let store = Arc::clone(&store);
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    store
                        .update("counters", &id, &format!(r#"{{"writer":{}}}"#, w))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let doc = store.read("counters", &id).unwrap();
    let writer = doc["writer"].as_i64().unwrap();
    assert!((0..8).contains(&writer));
    assert_eq!(doc["_id"], id.as_str());
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_readers_run_alongside_writers() {
    let store = shared_store();
    for _ in 0..10 {
        store.create("notes", "{}").unwrap();
    }

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..200 {
                store.create("notes", "{}").unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..100 {
                    let seen = store.list(1_000, "").unwrap().documents.len();
                    assert!(seen >= last, "listing shrank from {} to {}", last, seen);
                    last = seen;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(store.len().unwrap(), 210);
}

#[test]
fn test_many_collections_in_parallel() {
    let store = shared_store();

    let handles: Vec<_> = (0..8)
        .map(|c| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let collection = format!("col{}", c);
                for _ in 0..25 {
                    store.create(&collection, "{}").unwrap();
                }
                collection
            })
        })
        .collect();

    for h in handles {
        let collection = h.join().unwrap();
        assert_eq!(store.collection_ids(&collection).unwrap().len(), 25);
    }
    assert_eq!(store.list(1_000, "").unwrap().documents.len(), 200);
}
