//! Runs every catalog script against a real server and against the
//! in-memory backend, and requires both to observe the same outcome.
//!
//! Needs a disposable server: `ER_TEST_REDIS=127.0.0.1:6379 cargo test -p
//! er-store --test live_scripts -- --ignored`. Keys live under a fresh
//! prefix and are deleted afterwards.

use std::time::{SystemTime, UNIX_EPOCH};

use er_store::{
    AtomicScript, ConnectionConfig, InMemorySetStore, KeyTtl, RedisClient, SetStore,
    UPSERT_CONFLICT,
};

struct Scenario {
    prefix: String,
}

impl Scenario {
    fn key(&self, name: &str) -> String {
        format!("{}:{name}", self.prefix)
    }

    fn keys(&self, names: &[&str]) -> Vec<String> {
        names.iter().map(|n| self.key(n)).collect()
    }

    fn all_keys(&self) -> Vec<String> {
        self.keys(&[
            "x", "y", "all", "d1", "d2", "d3", "d4", "d5", "scratch", "rec", "i1", "i2", "i3",
        ])
    }

    /// Apply the same sequence of operations and describe what was seen.
    fn run<S: SetStore>(&self, store: &mut S) -> Vec<String> {
        let mut log = Vec::new();
        for (set, members) in [
            ("x", &["a", "b", "c"][..]),
            ("y", &["b", "c", "d"][..]),
            ("all", &["a", "b", "c", "d", "e"][..]),
        ] {
            for m in members {
                store.set_add(&self.key(set), m).unwrap();
            }
        }

        let ttl = [b"60".to_vec()];
        let cases = [
            (AtomicScript::StoreAll, self.keys(&["d1", "x", "y"])),
            (AtomicScript::StoreAny, self.keys(&["d2", "x", "y"])),
            (AtomicScript::StoreNot, self.keys(&["d3", "all", "x", "y"])),
            (AtomicScript::StoreNot, self.keys(&["d4", "x", "x"])),
        ];
        for (script, keys) in cases {
            let card = store.run_atomic(script, &keys, &ttl).unwrap();
            log.push(format!("{} -> {card}", script.name()));
            log.push(self.describe(store, &keys[0]));
        }

        let keys = self.keys(&["d5", "scratch", "x", "all", "y"]);
        let card = store
            .run_atomic(AtomicScript::StoreAllNot, &keys, &[b"60".to_vec(), b"60".to_vec()])
            .unwrap();
        log.push(format!("store_all_not -> {card}"));
        log.push(self.describe(store, &keys[0]));
        log.push(self.describe(store, &keys[1]));

        // Flags containing zero bytes and CRLF must survive the round trip.
        let first: Vec<u8> = (0..512u32).map(|i| (i % 256) as u8).collect();
        let second = vec![0xffu8; 512];
        let upsert = |store: &mut S, idx: &[&str], flags: &[u8], expected: &[u8], removed: &str| {
            let mut keys = self.keys(&["rec", "all"]);
            keys.extend(self.keys(idx));
            let args = [b"z".to_vec(), flags.to_vec(), expected.to_vec(), removed.as_bytes().to_vec()];
            store.run_atomic(AtomicScript::UpsertElement, &keys, &args).unwrap()
        };

        log.push(format!("upsert new -> {}", upsert(&mut *store, &["i1", "i2"], &first, b"", "0")));
        let conflict = upsert(&mut *store, &["i1"], &second, b"", "0");
        log.push(format!("upsert stale -> {}", conflict == UPSERT_CONFLICT));
        log.push(format!("upsert replace -> {}", upsert(&mut *store, &["i1", "i3"], &second, &first, "1")));

        let stored = store.hash_get(&self.key("rec"), "flags_bin").unwrap();
        log.push(format!("flags match -> {}", stored == second));
        let name = store.hash_get_str(&self.key("rec"), "name").unwrap();
        log.push(format!("name -> {name}"));
        for set in ["i1", "i2", "i3", "all"] {
            log.push(self.describe(store, &self.key(set)));
        }
        log
    }

    fn describe<S: SetStore>(&self, store: &mut S, key: &str) -> String {
        let mut members = store.set_members(key).unwrap();
        members.sort();
        let ttl = match store.ttl(key).unwrap() {
            KeyTtl::Expires(secs) if secs > 0 && secs <= 60 => "expires",
            KeyTtl::Expires(_) => "expires out of range",
            KeyTtl::Persistent => "persistent",
            KeyTtl::Missing => "missing",
        };
        let short = key.trim_start_matches(&format!("{}:", self.prefix)).to_string();
        format!("{short} {ttl} {members:?}")
    }
}

fn live_config() -> Option<ConnectionConfig> {
    let addr = std::env::var("ER_TEST_REDIS").ok()?;
    let (host, port) = addr.rsplit_once(':')?;
    Some(ConnectionConfig::new(host, port.parse().ok()?))
}

#[test]
#[ignore = "needs a live server in ER_TEST_REDIS"]
fn catalog_scripts_agree_with_in_memory_backend() {
    let Some(config) = live_config() else {
        eprintln!("ER_TEST_REDIS not set; skipping");
        return;
    };
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let scenario = Scenario {
        prefix: format!("er-script-test:{}:{stamp}", std::process::id()),
    };

    let mut redis = RedisClient::connect(&config).unwrap();
    let live = scenario.run(&mut redis);
    for key in scenario.all_keys() {
        redis.delete(&key).unwrap();
    }

    let native = scenario.run(&mut InMemorySetStore::new());
    assert_eq!(live, native);
}

#[test]
#[ignore = "needs a live server in ER_TEST_REDIS"]
fn server_refuses_what_the_in_memory_backend_refuses() {
    let Some(config) = live_config() else {
        eprintln!("ER_TEST_REDIS not set; skipping");
        return;
    };
    let mut redis = RedisClient::connect(&config).unwrap();
    let mut memory = InMemorySetStore::new();
    let key = format!("er-script-test:{}:huge-ttl", std::process::id());
    let stores: [&mut dyn SetStore; 2] = [&mut redis, &mut memory];
    for store in stores {
        store.set_add(&key, "a").unwrap();
        let err = store.expire(&key, i64::MAX).unwrap_err();
        assert_eq!(err.kind(), er_types::ErrorKind::Protocol, "{err}");
        store.delete(&key).unwrap();
    }
}
