//! Redis backend for [`KvCache`].

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::store::{CacheStoreError, KvCache};

/// Connects lazily on first use so the service can start while Redis is
/// down; every operation on an unreachable server fails and is degraded by
/// the caller.
pub struct RedisKvCache {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisKvCache {
    pub fn open(url: &str) -> Result<Self, CacheStoreError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            manager: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheStoreError> {
        let manager = self
            .manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl KvCache for RedisKvCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheStoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        Ok(conn.del(keys).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.keys(pattern).await?)
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, CacheStoreError> {
        let mut conn = self.connection().await?;
        let (count,): (u64,) = window_pipeline(key, window)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }
}

/// `SET key 0 EX <window> NX` then `INCR key` in one MULTI block, so a
/// counter never exists without its expiry even if the caller gives up
/// between replies.
fn window_pipeline(key: &str, window: Duration) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0u64)
        .arg("EX")
        .arg(window.as_secs().max(1))
        .arg("NX")
        .ignore()
        .incr(key, 1u64);
    pipe
}
