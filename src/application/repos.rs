//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    AdminRecord, CategoryRecord, OrderItemRecord, OrderRecord, ProductImageRecord, ProductRecord,
};
use crate::domain::types::{DeliveryMethod, OrderStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Whether this error is a unique violation on `constraint`.
    pub fn is_duplicate_of(&self, constraint: &str) -> bool {
        matches!(self, RepoError::Duplicate { constraint: found } if found == constraint)
    }
}

pub const CATEGORY_SLUG_CONSTRAINT: &str = "categories_slug_key";
pub const PRODUCT_SLUG_CONSTRAINT: &str = "products_slug_key";
pub const PRODUCT_CODE_CONSTRAINT: &str = "products_product_code_key";
pub const ORDER_CODE_CONSTRAINT: &str = "orders_order_code_key";

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProductImage {
    pub image_url: String,
    pub public_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateProductParams {
    pub product_code: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub unit: i32,
    pub category_id: Option<Uuid>,
    pub images: Vec<NewProductImage>,
}

/// Full replacement of the mutable product columns plus image changes,
/// applied in one transaction.
#[derive(Debug, Clone)]
pub struct UpdateProductParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub unit: i32,
    pub category_id: Option<Uuid>,
    pub remove_image_ids: Vec<Uuid>,
    pub add_images: Vec<NewProductImage>,
}

#[derive(Debug, Clone)]
pub struct ProductWithImages {
    pub product: ProductRecord,
    pub images: Vec<ProductImageRecord>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreateOrderParams {
    pub order_code: String,
    pub name: String,
    pub address: String,
    pub telephone: String,
    pub email: String,
    pub note: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardTotals {
    pub total_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    pub total_sales: Decimal,
}

/// Revenue of a single order, used for sales bucketing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleRecord {
    pub created_at: OffsetDateTime,
    pub amount: Decimal,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_categories_by_ids(&self, ids: &[Uuid])
    -> Result<Vec<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError>;

    /// Products in the category keep existing with no category.
    async fn delete_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait ProductsRepo: Send + Sync {
    /// All products, newest first.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, RepoError>;

    async fn count_products(&self, category_id: Option<Uuid>) -> Result<u64, RepoError>;

    /// Newest-first page, optionally restricted to one category.
    async fn list_products_page(
        &self,
        category_id: Option<Uuid>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<ProductRecord>, RepoError>;

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError>;

    async fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductRecord>, RepoError>;

    async fn list_images_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductImageRecord>, RepoError>;

    async fn list_product_slugs_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<String>, RepoError>;
}

#[async_trait]
pub trait ProductsWriteRepo: Send + Sync {
    async fn create_product(
        &self,
        params: CreateProductParams,
    ) -> Result<ProductWithImages, RepoError>;

    /// Returns the images that were removed alongside the updated product.
    async fn update_product(
        &self,
        params: UpdateProductParams,
    ) -> Result<Option<(ProductWithImages, Vec<ProductImageRecord>)>, RepoError>;

    /// Deletes the product; images and order lines cascade.
    async fn delete_product(&self, id: Uuid) -> Result<Option<ProductWithImages>, RepoError>;
}

#[async_trait]
pub trait OrdersRepo: Send + Sync {
    /// All orders, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError>;

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepoError>;

    async fn list_order_items(&self, order_ids: &[Uuid])
    -> Result<Vec<OrderItemRecord>, RepoError>;
}

#[async_trait]
pub trait OrdersWriteRepo: Send + Sync {
    async fn create_order(&self, params: CreateOrderParams) -> Result<OrderRecord, RepoError>;

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepoError>;

    async fn delete_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepoError>;
}

#[async_trait]
pub trait AdminsRepo: Send + Sync {
    async fn find_admin_by_passcode(&self, passcode: &str)
    -> Result<Option<AdminRecord>, RepoError>;

    async fn find_admin_by_id(&self, id: Uuid) -> Result<Option<AdminRecord>, RepoError>;
}

#[async_trait]
pub trait DashboardRepo: Send + Sync {
    async fn dashboard_totals(&self) -> Result<DashboardTotals, RepoError>;

    /// Per-order revenue for orders placed at or after `since`.
    async fn list_sales_since(&self, since: OffsetDateTime) -> Result<Vec<SaleRecord>, RepoError>;
}

/// Liveness probe for the relational store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
