//! Cache trigger service.
//!
//! Write paths call into the trigger after their store mutation succeeds.
//! Invalidation never fails the caller: backend errors are logged, counted
//! in the returned report, and left for the TTL to heal.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::CacheClient;
use super::events::EventKind;
use super::keys::{CacheKey, category_page_pattern};
use super::planner::InvalidationPlan;
use crate::application::repos::CategoriesRepo;

pub(crate) const METRIC_INVALIDATED_KEYS: &str = "gemstore_cache_invalidated_keys_total";
pub(crate) const METRIC_INVALIDATE_MS: &str = "gemstore_cache_invalidate_ms";

const SOURCE: &str = "gemstore::cache::invalidate";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationReport {
    pub keys_deleted: u64,
    /// Category ids that no longer exist and were skipped.
    pub unresolved_categories: usize,
    pub failures: usize,
}

#[derive(Clone)]
pub struct CacheTrigger {
    cache: CacheClient,
    categories: Arc<dyn CategoriesRepo>,
}

impl CacheTrigger {
    pub fn new(cache: CacheClient, categories: Arc<dyn CategoriesRepo>) -> Self {
        Self { cache, categories }
    }

    pub async fn trigger(&self, events: &[EventKind]) -> InvalidationReport {
        let started = Instant::now();
        let plan = InvalidationPlan::from_events(events);
        debug!(target: SOURCE, %plan, "executing invalidation plan");
        let report = self.execute(plan).await;

        histogram!(METRIC_INVALIDATE_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        info!(
            target: SOURCE,
            events = ?events.iter().map(EventKind::name).collect::<Vec<_>>(),
            keys_deleted = report.keys_deleted,
            unresolved_categories = report.unresolved_categories,
            failures = report.failures,
            "cache invalidated"
        );
        report
    }

    async fn execute(&self, plan: InvalidationPlan) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        let mut slugs = plan.category_slugs;

        for id in plan.category_ids {
            match self.categories.find_category_by_id(id).await {
                Ok(Some(category)) => {
                    slugs.insert(category.slug);
                }
                Ok(None) => {
                    debug!(target: SOURCE, category_id = %id, "category gone; skipping its listings");
                    report.unresolved_categories += 1;
                }
                Err(err) => {
                    warn!(target: SOURCE, category_id = %id, error = %err, "category lookup failed during invalidation");
                    report.failures += 1;
                }
            }
        }

        let mut keys: BTreeSet<String> = plan.keys.iter().map(CacheKey::to_string).collect();
        let mut patterns = plan.patterns;
        for slug in &slugs {
            patterns.insert(category_page_pattern(slug));
            keys.insert(CacheKey::category_listing(slug).to_string());
        }

        for pattern in &patterns {
            match self.cache.scan(pattern).await {
                Ok(found) => keys.extend(found),
                Err(err) => {
                    warn!(target: SOURCE, pattern = %pattern, error = %err, "cache scan failed");
                    report.failures += 1;
                }
            }
        }

        let keys: Vec<String> = keys.into_iter().collect();
        match self.cache.remove(&keys).await {
            Ok(deleted) => {
                counter!(METRIC_INVALIDATED_KEYS).increment(deleted);
                report.keys_deleted = deleted;
            }
            Err(err) => {
                warn!(target: SOURCE, keys = keys.len(), error = %err, "cache delete failed; entries expire at TTL");
                report.failures += 1;
            }
        }

        report
    }

    pub async fn category_created(&self) -> InvalidationReport {
        self.trigger(&[EventKind::CategoryCreated]).await
    }

    pub async fn category_renamed(
        &self,
        old_slug: &str,
        new_slug: &str,
        product_slugs: Vec<String>,
    ) -> InvalidationReport {
        self.trigger(&[EventKind::CategoryRenamed {
            old_slug: old_slug.to_string(),
            new_slug: new_slug.to_string(),
            product_slugs,
        }])
        .await
    }

    pub async fn category_deleted(
        &self,
        slug: &str,
        product_slugs: Vec<String>,
    ) -> InvalidationReport {
        self.trigger(&[EventKind::CategoryDeleted {
            slug: slug.to_string(),
            product_slugs,
        }])
        .await
    }

    pub async fn product_created(
        &self,
        slug: &str,
        category_id: Option<Uuid>,
    ) -> InvalidationReport {
        self.trigger(&[EventKind::ProductCreated {
            slug: slug.to_string(),
            category_id,
        }])
        .await
    }

    pub async fn product_updated(
        &self,
        old_slug: &str,
        new_slug: &str,
        old_category_id: Option<Uuid>,
        new_category_id: Option<Uuid>,
    ) -> InvalidationReport {
        self.trigger(&[EventKind::ProductUpdated {
            old_slug: old_slug.to_string(),
            new_slug: new_slug.to_string(),
            old_category_id,
            new_category_id,
        }])
        .await
    }

    pub async fn product_deleted(
        &self,
        slug: &str,
        category_id: Option<Uuid>,
    ) -> InvalidationReport {
        self.trigger(&[EventKind::ProductDeleted {
            slug: slug.to_string(),
            category_id,
        }])
        .await
    }

    pub async fn order_created(&self) -> InvalidationReport {
        self.trigger(&[EventKind::OrderCreated]).await
    }

    pub async fn order_updated(&self, id: Uuid) -> InvalidationReport {
        self.trigger(&[EventKind::OrderUpdated { id }]).await
    }

    pub async fn order_deleted(&self, id: Uuid) -> InvalidationReport {
        self.trigger(&[EventKind::OrderDeleted { id }]).await
    }

    pub async fn admin_session_changed(&self, admin_id: Uuid) -> InvalidationReport {
        self.trigger(&[EventKind::AdminSessionChanged { admin_id }])
            .await
    }
}
