//! Response cache.
//!
//! Read paths go through [`ReadThrough`], which stores the exact serialized
//! response body under a [`CacheKey`]. Write paths call [`CacheTrigger`]
//! after committing, which plans and executes invalidation. Every backend
//! failure degrades to "no cache": reads fall through to the store, and
//! invalidation logs and moves on.
//!
//! ## Known gap
//!
//! A reader that loaded pre-write data can store it after the writer's
//! invalidation already ran. Nothing evicts that entry before its TTL.

mod client;
mod config;
mod events;
mod keys;
mod lock;
mod planner;
mod read_through;
mod redis_backend;
mod store;
mod trigger;

pub use client::{CacheClient, CacheLookup};
pub use config::{CacheBackend, CacheConfig};
pub use events::EventKind;
pub use keys::{CacheKey, ORDER_PATTERN, category_page_pattern, rate_limit_key};
pub use planner::InvalidationPlan;
pub use read_through::ReadThrough;
pub use redis_backend::RedisKvCache;
pub use store::{CacheStoreError, KvCache, MemoryKvCache, glob_match};
pub use trigger::{CacheTrigger, InvalidationReport};

pub(crate) mod metric_names {
    pub(crate) use super::client::{METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_UNAVAILABLE};
    pub(crate) use super::trigger::{METRIC_INVALIDATE_MS, METRIC_INVALIDATED_KEYS};
}
