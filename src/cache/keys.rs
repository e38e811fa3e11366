//! Cache key scheme.
//!
//! Every cacheable read maps to exactly one [`CacheKey`]; the rendered form is
//! the key stored in the KV backend. Keys are pure functions of their fields.

use std::fmt;

use uuid::Uuid;

use crate::application::pagination::PageRequest;

/// Glob matching every single-order entry.
pub const ORDER_PATTERN: &str = "order:*";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// `categories:all`
    AllCategories,
    /// `category:{slug}:page:{page}:limit:{limit}`; pagination is already clamped.
    CategoryPage { slug: String, page: u32, limit: u32 },
    /// `category:{slug}`, the non-paginated listing.
    CategoryListing { slug: String },
    /// `products:all`
    AllProducts,
    /// `product:{slug}`
    Product { slug: String },
    /// `orders:all`
    AllOrders,
    /// `order:{id}` keyed by the internal id, not the display code.
    Order { id: Uuid },
    /// `admin:{id}`
    Admin { id: Uuid },
}

impl CacheKey {
    pub fn category_page(slug: &str, page: PageRequest) -> Self {
        Self::CategoryPage {
            slug: slug.to_string(),
            page: page.page(),
            limit: page.limit(),
        }
    }

    pub fn category_listing(slug: &str) -> Self {
        Self::CategoryListing {
            slug: slug.to_string(),
        }
    }

    pub fn product(slug: &str) -> Self {
        Self::Product {
            slug: slug.to_string(),
        }
    }

    pub fn order(id: Uuid) -> Self {
        Self::Order { id }
    }

    pub fn admin(id: Uuid) -> Self {
        Self::Admin { id }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::AllCategories => f.write_str("categories:all"),
            CacheKey::CategoryPage { slug, page, limit } => {
                write!(f, "category:{slug}:page:{page}:limit:{limit}")
            }
            CacheKey::CategoryListing { slug } => write!(f, "category:{slug}"),
            CacheKey::AllProducts => f.write_str("products:all"),
            CacheKey::Product { slug } => write!(f, "product:{slug}"),
            CacheKey::AllOrders => f.write_str("orders:all"),
            CacheKey::Order { id } => write!(f, "order:{id}"),
            CacheKey::Admin { id } => write!(f, "admin:{id}"),
        }
    }
}

/// Glob over every paginated listing of `slug`. Only used for bulk deletes.
pub fn category_page_pattern(slug: &str) -> String {
    format!("category:{slug}:page:*")
}

/// Fixed-window counter key for the rate limiter.
pub fn rate_limit_key(route_prefix: &str, client_ip: &str, path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    format!("{route_prefix}:{client_ip}:{path}")
}
