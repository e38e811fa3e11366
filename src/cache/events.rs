//! Mutation events that drive invalidation.
//!
//! Events are raised after the store write has committed. Each variant
//! carries the identities the planner needs; category identities are
//! resolved to slugs only when the plan executes.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CategoryCreated,
    /// Rename: both slugs' listings go, as does every product payload in
    /// the category since it embeds the category.
    CategoryRenamed {
        old_slug: String,
        new_slug: String,
        product_slugs: Vec<String>,
    },
    CategoryDeleted {
        slug: String,
        product_slugs: Vec<String>,
    },
    ProductCreated {
        slug: String,
        category_id: Option<Uuid>,
    },
    ProductUpdated {
        old_slug: String,
        new_slug: String,
        old_category_id: Option<Uuid>,
        new_category_id: Option<Uuid>,
    },
    ProductDeleted {
        slug: String,
        category_id: Option<Uuid>,
    },
    OrderCreated,
    OrderUpdated {
        id: Uuid,
    },
    OrderDeleted {
        id: Uuid,
    },
    /// Login or logout of an admin.
    AdminSessionChanged {
        admin_id: Uuid,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CategoryCreated => "category_created",
            EventKind::CategoryRenamed { .. } => "category_renamed",
            EventKind::CategoryDeleted { .. } => "category_deleted",
            EventKind::ProductCreated { .. } => "product_created",
            EventKind::ProductUpdated { .. } => "product_updated",
            EventKind::ProductDeleted { .. } => "product_deleted",
            EventKind::OrderCreated => "order_created",
            EventKind::OrderUpdated { .. } => "order_updated",
            EventKind::OrderDeleted { .. } => "order_deleted",
            EventKind::AdminSessionChanged { .. } => "admin_session_changed",
        }
    }
}
