//! Rendered-page response cache with TTL and LRU eviction.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::PageCacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A cached rendered response.
#[derive(Clone)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    stored_at: Instant,
}

impl CachedPage {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// In-process store for cached pages.
///
/// Entries expire after the configured TTL. Expired entries are dropped
/// lazily on lookup; a manual `clear` drops everything at once.
pub struct PageStore {
    pages: RwLock<LruCache<PageKey, CachedPage>>,
    ttl: Duration,
}

impl PageStore {
    pub fn new(config: &PageCacheConfig) -> Self {
        Self {
            pages: RwLock::new(LruCache::new(config.response_limit_non_zero())),
            ttl: config.ttl(),
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<CachedPage> {
        let mut pages = rw_write(&self.pages, SOURCE, "get");
        let expired = match pages.get(key) {
            Some(page) if page.is_expired(self.ttl) => true,
            Some(page) => return Some(page.clone()),
            None => return None,
        };
        if expired {
            pages.pop(key);
        }
        None
    }

    pub fn set(&self, key: PageKey, page: CachedPage) {
        let evicted = rw_write(&self.pages, SOURCE, "set").push(key.clone(), page);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                metrics::counter!("rivista_page_cache_evictions_total").increment(1);
            }
        }
    }

    /// Drop every cached page regardless of age.
    pub fn clear(&self) {
        rw_write(&self.pages, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.pages, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;

    fn store_with_ttl(ttl_secs: u64) -> PageStore {
        PageStore::new(&PageCacheConfig {
            enabled: true,
            response_limit: 8,
            ttl_secs,
        })
    }

    fn sample_page(body: &str) -> CachedPage {
        CachedPage::new(200, vec![], Bytes::copy_from_slice(body.as_bytes()))
    }

    #[test]
    fn fresh_entry_is_served() {
        let store = store_with_ttl(60);
        let key = PageKey::new("/", "");
        store.set(key.clone(), sample_page("feed"));
        let hit = store.get(&key).expect("fresh entry should hit");
        assert_eq!(hit.body, Bytes::from_static(b"feed"));
    }

    #[test]
    fn expired_entry_is_dropped_on_lookup() {
        let store = store_with_ttl(0);
        let key = PageKey::new("/", "");
        store.set(key.clone(), sample_page("stale"));
        assert!(store.get(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_drops_all_entries() {
        let store = store_with_ttl(60);
        store.set(PageKey::new("/", ""), sample_page("a"));
        store.set(PageKey::new("/", "page=2"), sample_page("b"));
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let store = PageStore::new(&PageCacheConfig {
            enabled: true,
            response_limit: 2,
            ttl_secs: 60,
        });
        store.set(PageKey::new("/", "page=1"), sample_page("1"));
        store.set(PageKey::new("/", "page=2"), sample_page("2"));
        store.set(PageKey::new("/", "page=3"), sample_page("3"));
        assert_eq!(store.len(), 2);
        assert!(store.get(&PageKey::new("/", "page=1")).is_none());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let store = store_with_ttl(60);
        let key = PageKey::new("/", "");
        store.set(key.clone(), sample_page("kept"));

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.pages.write().unwrap();
            panic!("poison the lock");
        }));

        assert!(store.get(&key).is_some());
    }
}
