//! Invalidation planning.
//!
//! Turns a batch of mutation events into the set of keys, category listings
//! and glob patterns that must be dropped. Planning is pure; resolving
//! category ids and talking to the backend happens in the trigger.

use std::collections::BTreeSet;
use std::fmt;

use uuid::Uuid;

use super::events::EventKind;
use super::keys::{CacheKey, ORDER_PATTERN};
use crate::domain::slug::ALL_PRODUCTS_SLUG;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Exact keys to delete.
    pub keys: BTreeSet<CacheKey>,
    /// Categories whose listings must go, known only by id.
    pub category_ids: BTreeSet<Uuid>,
    /// Categories whose listings must go, by slug. Each slug expands to its
    /// paginated pattern plus the whole-listing key.
    pub category_slugs: BTreeSet<String>,
    /// Extra glob patterns to scan and delete.
    pub patterns: BTreeSet<String>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, category_ids: {}, category_slugs: {}, patterns: {} }}",
            self.keys.len(),
            self.category_ids.len(),
            self.category_slugs.len(),
            self.patterns.len(),
        )
    }
}

impl InvalidationPlan {
    pub fn from_events(events: &[EventKind]) -> Self {
        let mut plan = Self::default();
        for event in events {
            plan.apply(event);
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
            && self.category_ids.is_empty()
            && self.category_slugs.is_empty()
            && self.patterns.is_empty()
    }

    fn apply(&mut self, event: &EventKind) {
        match event {
            EventKind::CategoryCreated => {
                self.keys.insert(CacheKey::AllCategories);
            }
            EventKind::CategoryRenamed {
                old_slug,
                new_slug,
                product_slugs,
            } => {
                self.category_metadata_changed(product_slugs);
                self.category_slugs.insert(old_slug.clone());
                self.category_slugs.insert(new_slug.clone());
            }
            EventKind::CategoryDeleted {
                slug,
                product_slugs,
            } => {
                self.category_metadata_changed(product_slugs);
                self.category_slugs.insert(slug.clone());
                // Member products lose their category id, which the `all`
                // listing and order payloads embed.
                self.product_listings_changed();
                self.product_embedded_in_orders();
            }
            EventKind::ProductCreated { slug, category_id } => {
                self.product_listings_changed();
                self.keys.insert(CacheKey::AllCategories);
                self.keys.insert(CacheKey::product(slug));
                self.category_ids.extend(category_id.iter().copied());
            }
            EventKind::ProductUpdated {
                old_slug,
                new_slug,
                old_category_id,
                new_category_id,
            } => {
                self.product_listings_changed();
                self.product_embedded_in_orders();
                self.keys.insert(CacheKey::product(old_slug));
                self.keys.insert(CacheKey::product(new_slug));
                self.category_ids.extend(old_category_id.iter().copied());
                self.category_ids.extend(new_category_id.iter().copied());
            }
            EventKind::ProductDeleted { slug, category_id } => {
                self.product_listings_changed();
                self.product_embedded_in_orders();
                self.keys.insert(CacheKey::AllCategories);
                self.keys.insert(CacheKey::product(slug));
                self.category_ids.extend(category_id.iter().copied());
            }
            EventKind::OrderCreated => {
                self.keys.insert(CacheKey::AllOrders);
            }
            EventKind::OrderUpdated { id } | EventKind::OrderDeleted { id } => {
                self.keys.insert(CacheKey::AllOrders);
                self.keys.insert(CacheKey::order(*id));
            }
            EventKind::AdminSessionChanged { admin_id } => {
                self.keys.insert(CacheKey::admin(*admin_id));
            }
        }
    }

    fn category_metadata_changed(&mut self, product_slugs: &[String]) {
        self.keys.insert(CacheKey::AllCategories);
        self.keys.insert(CacheKey::AllProducts);
        self.keys
            .extend(product_slugs.iter().map(|slug| CacheKey::product(slug)));
    }

    fn product_listings_changed(&mut self) {
        self.keys.insert(CacheKey::AllProducts);
        self.category_slugs.insert(ALL_PRODUCTS_SLUG.to_string());
    }

    fn product_embedded_in_orders(&mut self) {
        self.keys.insert(CacheKey::AllOrders);
        self.patterns.insert(ORDER_PATTERN.to_string());
    }
}
