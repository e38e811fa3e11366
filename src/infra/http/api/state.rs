use std::sync::Arc;

use crate::application::admin::AdminService;
use crate::application::categories::CategoryService;
use crate::application::dashboard::DashboardService;
use crate::application::orders::OrderService;
use crate::application::products::ProductService;
use crate::application::repos::StoreHealth;
use crate::infra::uploads::LocalObjectStorage;

use super::rate_limit::{RateLimitRules, RateLimiter};

/// Cookie attributes for the admin session.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookieSettings {
    pub secure: bool,
}

#[derive(Clone)]
pub struct ApiState {
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub admin: Arc<AdminService>,
    pub dashboard: Arc<DashboardService>,
    pub store: Arc<dyn StoreHealth>,
    pub uploads: Arc<LocalObjectStorage>,
    pub rate_limiter: RateLimiter,
    pub rate_rules: RateLimitRules,
    pub session: SessionCookieSettings,
    pub max_upload_bytes: usize,
}
