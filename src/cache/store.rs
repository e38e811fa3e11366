//! Key-value cache backends.
//!
//! [`KvCache`] is the narrow contract the rest of the cache layer relies on:
//! string values with a TTL, bulk delete, glob scan and a fixed-window
//! counter. [`MemoryKvCache`] is the in-process backend used for single-node
//! deployments and tests; it is bounded with LRU eviction.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const DEFAULT_MEMORY_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation `{op}` timed out after {elapsed_ms}ms")]
    Timeout { op: &'static str, elapsed_ms: u64 },
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Returns the number of keys that existed.
    async fn del(&self, keys: &[String]) -> Result<u64, CacheStoreError>;

    /// Glob scan supporting `*` and `?`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError>;

    /// Increment a counter, starting a new window of length `window` when
    /// the counter is created. Returns the post-increment value.
    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, CacheStoreError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process backend with lazy expiry and a fixed entry cap. Rate-limit
/// counters share the cap with payloads, so a flood of client addresses
/// evicts the least recently used entries instead of growing the map.
///
/// `set_available(false)` makes every operation fail with
/// [`CacheStoreError::Unavailable`], which is how outage behaviour is
/// exercised without a real network.
#[derive(Debug)]
pub struct MemoryKvCache {
    entries: RwLock<LruCache<String, MemoryEntry>>,
    available: AtomicBool,
}

impl Default for MemoryKvCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            available: AtomicBool::new(true),
        }
    }

    pub fn capacity(&self) -> usize {
        rw_read(&self.entries, SOURCE, "capacity").cap().get()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), CacheStoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheStoreError::Unavailable(
                "memory cache switched off".to_string(),
            ))
        }
    }
}

#[async_trait]
impl KvCache for MemoryKvCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let live = entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match live {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "set_ex");
        entries.put(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheStoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "del");
        let removed = keys
            .iter()
            .filter_map(|key| entries.pop(key))
            .filter(|entry| entry.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "keys");
        let mut found: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        found.sort();
        Ok(found)
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, CacheStoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "incr_window");
        let next = match entries.peek(key).filter(|entry| entry.is_live(now)) {
            Some(entry) => MemoryEntry {
                value: (entry.value.parse::<u64>().unwrap_or(0) + 1).to_string(),
                expires_at: entry.expires_at,
            },
            None => MemoryEntry {
                value: "1".to_string(),
                expires_at: now + window,
            },
        };
        let count = next.value.parse::<u64>().unwrap_or(1);
        entries.put(key.to_string(), next);
        Ok(count)
    }
}

/// Redis-style glob matching limited to `*` (any run) and `?` (one char).
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some(&ch) if ch == '?' || ch == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    c = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    #[test]
    fn glob_handles_star_and_question_mark() {
        assert!(glob_match("category:rings:page:*", "category:rings:page:1:limit:12"));
        assert!(glob_match("order:*", "order:"));
        assert!(glob_match("a?c", "abc"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("a?c", "ac"));
        assert!(!glob_match("order:*", "orders:all"));
        assert!(glob_match("*:all", "products:all"));
    }

    #[tokio::test]
    async fn set_get_and_delete_round() {
        let cache = MemoryKvCache::new();
        cache.set_ex("product:opal", "{}", TTL).await.expect("set");

        assert_eq!(
            cache.get("product:opal").await.expect("get").as_deref(),
            Some("{}")
        );
        let removed = cache
            .del(&["product:opal".to_string(), "product:none".to_string()])
            .await
            .expect("del");
        assert_eq!(removed, 1);
        assert!(cache.get("product:opal").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_absent() {
        let cache = MemoryKvCache::new();
        cache
            .set_ex("categories:all", "[]", Duration::ZERO)
            .await
            .expect("set");

        assert!(cache.get("categories:all").await.expect("get").is_none());
        assert!(cache.keys("*").await.expect("keys").is_empty());
    }

    #[tokio::test]
    async fn keys_scans_by_pattern() {
        let cache = MemoryKvCache::new();
        for key in [
            "category:rings:page:1:limit:12",
            "category:rings:page:2:limit:12",
            "category:rings",
            "category:pearls:page:1:limit:12",
        ] {
            cache.set_ex(key, "x", TTL).await.expect("set");
        }

        let found = cache.keys("category:rings:page:*").await.expect("keys");
        assert_eq!(
            found,
            vec![
                "category:rings:page:1:limit:12".to_string(),
                "category:rings:page:2:limit:12".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn window_counter_resets_after_expiry() {
        let cache = MemoryKvCache::new();
        let window = Duration::from_millis(20);

        assert_eq!(cache.incr_window("rl", window).await.expect("incr"), 1);
        assert_eq!(cache.incr_window("rl", window).await.expect("incr"), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.incr_window("rl", window).await.expect("incr"), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let capacity = NonZeroUsize::new(2).expect("non-zero");
        let cache = MemoryKvCache::with_capacity(capacity);
        cache.set_ex("product:opal", "1", TTL).await.expect("set");
        cache.set_ex("product:jade", "2", TTL).await.expect("set");
        cache.get("product:opal").await.expect("get");

        cache.set_ex("product:ruby", "3", TTL).await.expect("set");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("product:jade").await.expect("get").is_none());
        assert!(cache.get("product:opal").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn rate_counters_share_the_cap() {
        let cache = MemoryKvCache::with_capacity(NonZeroUsize::new(3).expect("non-zero"));
        for client in 0..50 {
            let key = format!("rate-limit:api:10.0.0.{client}:/api/v1/order");
            cache.incr_window(&key, TTL).await.expect("incr");
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.capacity(), 3);
    }

    #[tokio::test]
    async fn unavailable_backend_fails_every_operation() {
        let cache = MemoryKvCache::new();
        cache.set_available(false);

        assert!(matches!(
            cache.get("x").await,
            Err(CacheStoreError::Unavailable(_))
        ));
        assert!(cache.set_ex("x", "y", TTL).await.is_err());
        assert!(cache.keys("*").await.is_err());
        assert!(cache.incr_window("x", TTL).await.is_err());
    }
}
