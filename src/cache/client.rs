//! Timeout-bounded, fail-soft access to the KV backend.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{debug, warn};

use super::store::{CacheStoreError, KvCache};

pub(crate) const METRIC_CACHE_HIT: &str = "gemstore_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "gemstore_cache_miss_total";
pub(crate) const METRIC_CACHE_UNAVAILABLE: &str = "gemstore_cache_unavailable_total";

const SOURCE: &str = "gemstore::cache";

/// Outcome of a cache read. Read paths treat `Unavailable` exactly like
/// `Miss`; the distinction only feeds logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    Unavailable,
}

#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn KvCache>,
    op_timeout: Duration,
}

impl CacheClient {
    pub fn new(backend: Arc<dyn KvCache>, op_timeout: Duration) -> Self {
        Self {
            backend,
            op_timeout,
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheStoreError>
    where
        F: Future<Output = Result<T, CacheStoreError>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheStoreError::Timeout {
                op,
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }

    pub async fn lookup(&self, key: &str) -> CacheLookup {
        match self.bounded("get", self.backend.get(key)).await {
            Ok(Some(payload)) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(target: SOURCE, key, "cache hit");
                CacheLookup::Hit(payload)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                debug!(target: SOURCE, key, "cache miss");
                CacheLookup::Miss
            }
            Err(err) => {
                counter!(METRIC_CACHE_UNAVAILABLE, "op" => "get").increment(1);
                warn!(target: SOURCE, key, error = %err, "cache read failed; falling back to store");
                CacheLookup::Unavailable
            }
        }
    }

    /// Returns whether the payload was written.
    pub async fn store(&self, key: &str, payload: &str, ttl: Duration) -> bool {
        match self
            .bounded("set_ex", self.backend.set_ex(key, payload, ttl))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                counter!(METRIC_CACHE_UNAVAILABLE, "op" => "set_ex").increment(1);
                warn!(target: SOURCE, key, error = %err, "cache population skipped");
                false
            }
        }
    }

    pub async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError> {
        self.bounded("keys", self.backend.keys(pattern)).await
    }

    pub async fn remove(&self, keys: &[String]) -> Result<u64, CacheStoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.bounded("del", self.backend.del(keys)).await
    }

    pub async fn hit_window(&self, key: &str, window: Duration) -> Result<u64, CacheStoreError> {
        self.bounded("incr_window", self.backend.incr_window(key, window))
            .await
    }
}
