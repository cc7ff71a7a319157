//! The cache engine: LRU + TTL + tag/scope indices + bulk ops + optional
//! entitlement encryption. Spec.md §4.E.
//!
//! Grounded on the teacher's `pager.rs` for the "single engine-wide lock
//! guarding a growable collection, with a stable-reference discipline"
//! shape (here a `Mutex<Inner>` instead of `pager`'s `RefCell`, since the
//! cache must be `Send + Sync` across the engine-wide monitor spec.md §5
//! calls for); the recency list and tag/scope indices have no teacher
//! analogue and are built fresh against spec.md's invariants (§8 "Cache
//! invariants").

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use super::entitlement::{self, EntitlementProvider, MASTER_KEY_LEN};
use super::entry::{Entry, SetOptions};
use super::time::{SystemTimeProvider, TimeProvider};
use super::Error;

/// Spec.md §6 "Cache configuration".
pub struct CacheConfig {
    pub max_cache_size: usize,
    pub max_entries: usize,
    pub sweep_interval: std::time::Duration,
    pub time_provider: Arc<dyn TimeProvider>,
    pub enable_entitlement: bool,
    pub master_key: Option<[u8; MASTER_KEY_LEN]>,
    pub entitlement_provider: Option<Arc<dyn EntitlementProvider>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_cache_size: 256 * 1024 * 1024,
            max_entries: 0,
            sweep_interval: std::time::Duration::from_secs(60),
            time_provider: Arc::new(SystemTimeProvider),
            enable_entitlement: false,
            master_key: None,
            entitlement_provider: None,
        }
    }
}

impl CacheConfig {
    pub fn with_entitlement(
        mut self,
        master_key: [u8; MASTER_KEY_LEN],
        provider: Arc<dyn EntitlementProvider>,
    ) -> Self {
        self.enable_entitlement = true;
        self.master_key = Some(master_key);
        self.entitlement_provider = Some(provider);
        self
    }
}

struct Inner {
    map: HashMap<String, Entry>,
    /// Recency order, LRU-first. `touch_key` moves a key to the back (MRU).
    recency: Vec<String>,
    total_size: usize,
    tag_index: HashMap<String, HashSet<String>>,
    scope_index: HashMap<String, HashSet<String>>,
}

impl Inner {
    fn touch_key(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            let k = self.recency.remove(pos);
            self.recency.push(k);
        }
    }

    fn unindex(&mut self, key: &str, entry: &Entry) {
        for tag in &entry.tags {
            if let Some(set) = self.tag_index.get_mut(tag) {
                set.remove(key);
                if set.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        if let Some(scope) = &entry.scope {
            if let Some(set) = self.scope_index.get_mut(scope) {
                set.remove(key);
                if set.is_empty() {
                    self.scope_index.remove(scope);
                }
            }
        }
    }

    fn index(&mut self, key: &str, entry: &Entry) {
        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        if let Some(scope) = &entry.scope {
            self.scope_index
                .entry(scope.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if let Some(entry) = self.map.remove(key) {
            self.total_size -= entry.size;
            self.unindex(key, &entry);
            if let Some(pos) = self.recency.iter().position(|k| k == key) {
                self.recency.remove(pos);
            }
            true
        } else {
            false
        }
    }

    fn insert_entry(&mut self, key: String, entry: Entry) {
        if let Some(old) = self.map.remove(&key) {
            self.total_size -= old.size;
            self.unindex(&key, &old);
            if let Some(pos) = self.recency.iter().position(|k| k == &key) {
                self.recency.remove(pos);
            }
        }
        self.total_size += entry.size;
        self.index(&key, &entry);
        self.map.insert(key.clone(), entry);
        self.recency.push(key);
    }

    fn evict_to_fit(&mut self, max_size: usize, max_entries: usize) {
        while (max_size > 0 && self.total_size > max_size)
            || (max_entries > 0 && self.map.len() > max_entries)
        {
            if self.recency.is_empty() {
                break;
            }
            let lru_key = self.recency.remove(0);
            if let Some(entry) = self.map.remove(&lru_key) {
                self.total_size -= entry.size;
                self.unindex(&lru_key, &entry);
            }
        }
    }
}

/// Spec.md §4.E cache engine: a single-lock key→entry store with an LRU
/// recency list, tag/scope indices, and optional per-scope encryption.
pub struct Cache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        Cache {
            config,
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                recency: Vec::new(),
                total_size: 0,
                tag_index: HashMap::new(),
                scope_index: HashMap::new(),
            }),
        }
    }

    fn now(&self) -> SystemTime {
        self.config.time_provider.now()
    }

    pub fn set(&self, key: &str, value: &[u8], opts: SetOptions) -> Result<(), Error> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".into()));
        }
        let stored = self.maybe_encrypt(key, value, &opts)?;
        let now = self.now();
        let entry = Entry::new(stored, now, &opts);
        let mut inner = self.inner.lock().unwrap();
        inner.insert_entry(key.to_string(), entry);
        inner.evict_to_fit(self.config.max_cache_size, self.config.max_entries);
        Ok(())
    }

    fn maybe_encrypt(&self, key: &str, value: &[u8], opts: &SetOptions) -> Result<Vec<u8>, Error> {
        match (&opts.scope, self.config.enable_entitlement) {
            (Some(scope), true) => {
                let master_key = self
                    .config
                    .master_key
                    .ok_or_else(|| Error::InvalidArgument("entitlement enabled without a master key".into()))?;
                Ok(entitlement::encrypt(&master_key, scope, key, value))
            }
            _ => Ok(value.to_vec()),
        }
    }

    fn maybe_decrypt(&self, key: &str, entry: &Entry) -> Option<Vec<u8>> {
        match (&entry.scope, self.config.enable_entitlement) {
            (Some(scope), true) => {
                let current_scope = self
                    .config
                    .entitlement_provider
                    .as_ref()
                    .and_then(|p| p.scope());
                if current_scope.as_deref() != Some(scope.as_str()) {
                    return None;
                }
                let master_key = self.config.master_key?;
                entitlement::decrypt(&master_key, scope, key, &entry.value)
            }
            _ => Some(entry.value.clone()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".into()));
        }
        let now = self.now();
        let mut inner = self.inner.lock().unwrap();
        let expired = match inner.map.get(key) {
            None => return Ok(None),
            Some(e) => e.is_expired(now),
        };
        if expired {
            inner.remove_entry(key);
            return Ok(None);
        }
        inner.map.get_mut(key).unwrap().touch(now);
        inner.touch_key(key);
        let entry = inner.map.get(key).unwrap().clone();
        drop(inner);
        Ok(self.maybe_decrypt(key, &entry))
    }

    pub fn refresh(&self, key: &str) {
        let now = self.now();
        let mut inner = self.inner.lock().unwrap();
        let expired = match inner.map.get(key) {
            None => return,
            Some(e) => e.is_expired(now),
        };
        if expired {
            inner.remove_entry(key);
            return;
        }
        inner.map.get_mut(key).unwrap().touch(now);
        inner.touch_key(key);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().unwrap().remove_entry(key)
    }

    pub fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>, Error> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    pub fn set_many(&self, entries: &[(&str, &[u8], SetOptions)]) -> Result<(), Error> {
        for (key, value, opts) in entries {
            if key.is_empty() {
                return Err(Error::InvalidArgument("key must not be empty".into()));
            }
            let stored = self.maybe_encrypt(key, value, opts)?;
            let now = self.now();
            let entry = Entry::new(stored, now, opts);
            self.inner.lock().unwrap().insert_entry(key.to_string(), entry);
        }
        self.inner
            .lock()
            .unwrap()
            .evict_to_fit(self.config.max_cache_size, self.config.max_entries);
        Ok(())
    }

    pub fn remove_many(&self, keys: &[&str]) -> usize {
        let mut inner = self.inner.lock().unwrap();
        keys.iter().filter(|k| inner.remove_entry(k)).count()
    }

    pub fn sweep_expired(&self) -> usize {
        let now = self.now();
        let mut inner = self.inner.lock().unwrap();
        let expired: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove_entry(key);
        }
        expired.len()
    }

    pub fn evict_by_tag(&self, tag: &str) -> usize {
        self.evict_by_tags(&[tag])
    }

    pub fn evict_by_tags(&self, tags: &[&str]) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let mut keys = HashSet::new();
        for tag in tags {
            if let Some(set) = inner.tag_index.get(*tag) {
                keys.extend(set.iter().cloned());
            }
        }
        keys.iter().filter(|k| inner.remove_entry(k)).count()
    }

    pub fn evict_by_scope(&self, scope: &str) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let keys: Vec<String> = inner
            .scope_index
            .get(scope)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        keys.iter().filter(|k| inner.remove_entry(k)).count()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn total_size(&self) -> usize {
        self.inner.lock().unwrap().total_size
    }

    #[cfg(test)]
    fn recency_order(&self) -> Vec<String> {
        self.inner.lock().unwrap().recency.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn cache_with_mock_clock() -> (Cache, Arc<super::super::time::MockTimeProvider>) {
        let clock = Arc::new(super::super::time::MockTimeProvider::new(SystemTime::now()));
        let config = CacheConfig {
            time_provider: clock.clone(),
            ..CacheConfig::default()
        };
        (Cache::new(config), clock)
    }

    #[test]
    fn set_then_get_round_trips() {
        let (cache, _clock) = cache_with_mock_clock();
        cache.set("k", b"v", SetOptions::default()).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn sliding_expiration_resets_on_access_then_expires_after_gap() {
        let (cache, clock) = cache_with_mock_clock();
        cache
            .set(
                "k",
                b"v",
                SetOptions {
                    sliding_expiration: Some(Duration::from_secs(10)),
                    ..Default::default()
                },
            )
            .unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.get("k").unwrap(), None);
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn absolute_expiration_relative_to_now() {
        let (cache, clock) = cache_with_mock_clock();
        cache
            .set(
                "k",
                b"v",
                SetOptions {
                    absolute_expiration_relative_to_now: Some(Duration::from_secs(5)),
                    ..Default::default()
                },
            )
            .unwrap();
        clock.advance(Duration::from_secs(4));
        assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));
        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn capacity_eviction_keeps_most_recently_accessed() {
        let (_cache, _clock) = cache_with_mock_clock();
        let config = CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        };
        let cache = Cache::new(config);
        cache.set("a", b"1", SetOptions::default()).unwrap();
        cache.set("b", b"2", SetOptions::default()).unwrap();
        cache.set("c", b"3", SetOptions::default()).unwrap();
        assert!(cache.count() <= 2);
        assert_eq!(cache.get("a").unwrap(), None);
        assert!(cache.get("b").unwrap().is_some());
        assert!(cache.get("c").unwrap().is_some());
    }

    #[test]
    fn lru_order_updates_on_access() {
        let (cache, _clock) = cache_with_mock_clock();
        cache.set("a", b"1", SetOptions::default()).unwrap();
        cache.set("b", b"2", SetOptions::default()).unwrap();
        cache.get("a").unwrap();
        assert_eq!(cache.recency_order(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn evict_by_tag_removes_all_tagged_keys() {
        let (cache, _clock) = cache_with_mock_clock();
        cache
            .set(
                "a",
                b"1",
                SetOptions {
                    tags: vec!["t1".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        cache
            .set(
                "b",
                b"2",
                SetOptions {
                    tags: vec!["t1".into(), "t2".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        cache.set("c", b"3", SetOptions::default()).unwrap();
        let removed = cache.evict_by_tag("t1");
        assert_eq!(removed, 2);
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn scoped_entries_require_matching_entitlement() {
        use super::super::entitlement::FixedScopeProvider;
        let clock = Arc::new(super::super::time::MockTimeProvider::new(SystemTime::now()));
        let config = CacheConfig {
            time_provider: clock,
            ..CacheConfig::default()
        }
        .with_entitlement(
            [9u8; MASTER_KEY_LEN],
            Arc::new(FixedScopeProvider(Some("tenant-a".into()))),
        );
        let cache = Cache::new(config);
        cache
            .set(
                "secret",
                b"payload",
                SetOptions {
                    scope: Some("tenant-a".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cache.get("secret").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn public_entries_readable_regardless_of_entitlement() {
        use super::super::entitlement::FixedScopeProvider;
        let config = CacheConfig::default().with_entitlement(
            [9u8; MASTER_KEY_LEN],
            Arc::new(FixedScopeProvider(Some("tenant-a".into()))),
        );
        let cache = Cache::new(config);
        cache.set("open", b"payload", SetOptions::default()).unwrap();
        assert_eq!(cache.get("open").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn invariants_hold_after_mixed_operations() {
        let (cache, _clock) = cache_with_mock_clock();
        cache
            .set(
                "a",
                b"12345",
                SetOptions {
                    tags: vec!["t".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        cache.set("b", b"67", SetOptions::default()).unwrap();
        cache.remove("a");
        let inner = cache.inner.lock().unwrap();
        assert_eq!(inner.map.len(), inner.recency.len());
        assert_eq!(inner.total_size, inner.map.values().map(|e| e.size).sum::<usize>());
        assert!(!inner.tag_index.contains_key("t"));
    }
}
