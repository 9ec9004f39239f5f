//! Concurrent stored queries from independent handles.

use std::collections::HashSet;
use std::thread;

use er_index::IndexMaintainer;
use er_keys::KeyScheme;
use er_query::QueryEngine;
use er_store::{InMemorySetStore, KeyTtl, SetStore};

const WORKERS: usize = 16;

fn seeded() -> (InMemorySetStore, KeyScheme) {
    let mut store = InMemorySetStore::new();
    let keys = KeyScheme::default();
    let mut m = IndexMaintainer::new(&mut store, &keys);
    for i in 0..50usize {
        let mut bits = vec![1];
        if i % 2 == 0 {
            bits.push(2);
        }
        if i % 5 == 0 {
            bits.push(3);
        }
        m.upsert(&format!("e{i:02}"), &bits).unwrap();
    }
    (store, keys)
}

#[test]
fn identical_store_all_calls_get_distinct_complete_results() {
    let (store, keys) = seeded();
    // e00, e10, e20, e30, e40
    let expected = 5;

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let mut handle = store.clone();
                let keys = &keys;
                scope.spawn(move || {
                    QueryEngine::new(&mut handle, keys)
                        .store_all(120, &[1, 2, 3])
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let distinct: HashSet<&str> = results.iter().map(|r| r.dest_key.as_str()).collect();
    assert_eq!(distinct.len(), WORKERS);

    let mut reader = store.clone();
    for r in &results {
        assert_eq!(r.cardinality, expected);
        assert_eq!(reader.set_card(&r.dest_key).unwrap(), expected);
        assert!(matches!(reader.ttl(&r.dest_key).unwrap(), KeyTtl::Expires(s) if s > 0));
    }
}

#[test]
fn concurrent_all_not_leaves_no_scratch_keys() {
    let (store, keys) = seeded();
    let before: HashSet<String> = store.keys().into_iter().collect();

    let dests: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let mut handle = store.clone();
                let keys = &keys;
                scope.spawn(move || {
                    QueryEngine::new(&mut handle, keys)
                        .store_all_not(60, 1, &[2])
                        .unwrap()
                        .dest_key
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let created: HashSet<String> = store
        .keys()
        .into_iter()
        .filter(|k| !before.contains(k))
        .collect();
    let dests: HashSet<String> = dests.into_iter().collect();
    assert_eq!(created, dests);
    assert_eq!(dests.len(), WORKERS);
}
