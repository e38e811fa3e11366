//! Read-through accessor.

use std::future::Future;
use std::time::Duration;

use super::client::{CacheClient, CacheLookup};
use super::keys::CacheKey;

/// Serves serialized response bodies from the cache, rebuilding them from
/// the store on a miss. Loader errors (including not-found) are returned
/// to the caller and never cached.
#[derive(Clone)]
pub struct ReadThrough {
    cache: CacheClient,
    ttl: Duration,
}

impl ReadThrough {
    pub fn new(cache: CacheClient, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    pub async fn fetch<E, F, Fut>(&self, key: &CacheKey, load: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let key = key.to_string();
        match self.cache.lookup(&key).await {
            CacheLookup::Hit(payload) => return Ok(payload),
            CacheLookup::Miss | CacheLookup::Unavailable => {}
        }

        let payload = load().await?;
        self.cache.store(&key, &payload, self.ttl).await;
        Ok(payload)
    }
}
