//! End-to-end registry behavior over the in-memory store.

use std::time::Duration;

use er_sdk::{
    ErrorKind, InMemorySetStore, IndexScrub, KeyTtl, Registry, RegistryConfig, SetStore,
    UpsertMode,
};

fn registry_with(mode: UpsertMode) -> (Registry<InMemorySetStore>, InMemorySetStore) {
    let store = InMemorySetStore::new();
    let config = RegistryConfig {
        upsert_mode: mode,
        ..Default::default()
    };
    let registry = Registry::with_store(store.clone(), config).unwrap();
    (registry, store)
}

fn greek(mode: UpsertMode) -> (Registry<InMemorySetStore>, InMemorySetStore) {
    let (mut r, store) = registry_with(mode);
    r.upsert("alpha", &[1, 2, 3]).unwrap();
    r.upsert("beta", &[2, 4]).unwrap();
    r.upsert("gamma", &[3, 5]).unwrap();
    (r, store)
}

#[test]
fn query_semantics_in_both_upsert_modes() {
    for mode in [UpsertMode::Sequential, UpsertMode::Atomic] {
        let (mut r, _) = greek(mode);
        assert_eq!(r.find_all(&[2], None).unwrap().names, vec!["alpha", "beta"]);
        assert_eq!(r.find_any(&[4, 5], None).unwrap().names, vec!["beta", "gamma"]);
        assert_eq!(r.universe_not(&[2], None).unwrap().names, vec!["gamma"]);
        assert_eq!(r.all_not(3, &[2], None).unwrap().names, vec!["gamma"]);
        assert_eq!(r.find_not(3, &[5], None).unwrap().names, vec!["alpha"]);
    }
}

#[test]
fn element_lifecycle() {
    let (mut r, store) = greek(UpsertMode::Sequential);
    let view = r.get("beta", None).unwrap();
    assert_eq!(view.bits.iter().map(|b| b.index()).collect::<Vec<_>>(), vec![2, 4]);

    let report = r.upsert("beta", &[4, 6]).unwrap();
    assert_eq!((report.added, report.removed, report.written_bits), (1, 1, 2));
    assert_eq!(r.find(2, None).unwrap().names, vec!["alpha"]);

    let deleted = r.delete("beta", false).unwrap();
    assert_eq!(deleted.scrub, IndexScrub::Stored);
    assert_eq!(r.get("beta", None).unwrap_err().kind(), ErrorKind::NotFound);
    assert!(r.find(6, None).unwrap().names.is_empty());
    assert!(!store.contains_key("er:element:beta"));
}

#[test]
fn stored_result_lifecycle() {
    let (mut r, store) = greek(UpsertMode::Sequential);
    let stored = r.store_all_not(30, 3, &[2]).unwrap();
    assert_eq!(stored.cardinality, 1);
    assert_eq!(stored.ttl_seconds, 30);

    let view = r.inspect(&stored.dest_key, None).unwrap();
    assert_eq!(view.members, vec!["gamma"]);
    assert_eq!(view.ttl_remaining, KeyTtl::Expires(30));

    store.fast_forward(Duration::from_secs(31));
    let view = r.inspect(&stored.dest_key, None).unwrap();
    assert_eq!(view.count, 0);
    assert_eq!(view.ttl_remaining, KeyTtl::Missing);
    assert_eq!(r.delete_stored(&stored.dest_key).unwrap(), 0);
}

#[test]
fn validation_happens_before_any_write() {
    let (mut r, store) = registry_with(UpsertMode::Sequential);
    assert_eq!(r.upsert("alpha", &[4096]).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(
        r.upsert(&"n".repeat(101), &[1]).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    for ttl in [0, -5] {
        assert_eq!(r.store_all(ttl, &[1]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(r.store_any(ttl, &[1]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(r.store_not(ttl, &[1]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            r.store_all_not(ttl, 1, &[2]).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
    assert!(store.is_empty());
}

#[test]
fn custom_prefix_isolates_namespaces() {
    let store = InMemorySetStore::new();
    let mut a = Registry::with_store(
        store.clone(),
        RegistryConfig { prefix: "a".into(), ..Default::default() },
    )
    .unwrap();
    let mut b = Registry::with_store(
        store.clone(),
        RegistryConfig { prefix: "b:".into(), ..Default::default() },
    )
    .unwrap();
    a.upsert("x", &[1]).unwrap();
    assert!(b.find(1, None).unwrap().names.is_empty());
    let stored = a.store_any(10, &[1]).unwrap();
    assert_eq!(
        b.inspect(&stored.dest_key, None).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    let mut raw = store.clone();
    assert_eq!(raw.set_members("a:all").unwrap(), vec!["x"]);
}
