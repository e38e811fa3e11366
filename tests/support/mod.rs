//! In-memory repositories and a fully wired service graph for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rust_decimal::Decimal;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

use gemstore::application::admin::AdminService;
use gemstore::application::categories::CategoryService;
use gemstore::application::dashboard::DashboardService;
use gemstore::application::orders::OrderService;
use gemstore::application::products::{CreateProductCommand, ImageUpload, ProductService};
use gemstore::application::repos::{
    AdminsRepo, CATEGORY_SLUG_CONSTRAINT, CategoriesRepo, CategoriesWriteRepo,
    CreateCategoryParams, CreateOrderParams, CreateProductParams, DashboardRepo, DashboardTotals,
    NewProductImage, ORDER_CODE_CONSTRAINT, OrdersRepo, OrdersWriteRepo, PRODUCT_SLUG_CONSTRAINT,
    ProductWithImages, ProductsRepo, ProductsWriteRepo, RepoError, SaleRecord, StoreHealth,
    UpdateCategoryParams, UpdateProductParams,
};
use gemstore::application::storage::ObjectStorage;
use gemstore::cache::{CacheClient, CacheTrigger, KvCache, MemoryKvCache, ReadThrough};
use gemstore::domain::entities::{
    AdminRecord, CategoryRecord, OrderItemRecord, OrderRecord, ProductImageRecord, ProductRecord,
};
use gemstore::domain::types::OrderStatus;
use gemstore::infra::auth::TokenIssuer;
use gemstore::infra::http::{ApiState, RateLimitRules, RateLimiter, SessionCookieSettings};
use gemstore::infra::uploads::LocalObjectStorage;

pub const ADMIN_PASSCODE: &str = "letmein";
pub const ADMIN_OWNER: &str = "Ada";
pub const JWT_SECRET: &str = "integration-test-secret";

#[derive(Default)]
struct Tables {
    categories: Vec<CategoryRecord>,
    products: Vec<ProductRecord>,
    images: Vec<ProductImageRecord>,
    orders: Vec<OrderRecord>,
    items: Vec<OrderItemRecord>,
    admins: Vec<AdminRecord>,
}

/// Store double with the same cascade rules as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    healthy: AtomicBool,
    category_list_loads: AtomicUsize,
    product_loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.healthy.store(true, Ordering::SeqCst);
        store.tables().admins.push(AdminRecord {
            id: Uuid::new_v4(),
            passcode: ADMIN_PASSCODE.to_string(),
            owner: ADMIN_OWNER.to_string(),
        });
        store
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("tables lock")
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Times the category list was read from the store.
    pub fn category_list_loads(&self) -> usize {
        self.category_list_loads.load(Ordering::SeqCst)
    }

    /// Times a single product was read by slug.
    pub fn product_loads(&self) -> usize {
        self.product_loads.load(Ordering::SeqCst)
    }

    pub fn product_count(&self) -> usize {
        self.tables().products.len()
    }

    pub fn image_count(&self) -> usize {
        self.tables().images.len()
    }
}

fn newest_first<T: Clone>(rows: &[T]) -> Vec<T> {
    rows.iter().rev().cloned().collect()
}

fn image_rows(product_id: Uuid, images: &[NewProductImage]) -> Vec<ProductImageRecord> {
    images
        .iter()
        .map(|image| ProductImageRecord {
            id: Uuid::new_v4(),
            product_id,
            image_url: image.image_url.clone(),
            public_id: image.public_id.clone(),
            created_at: OffsetDateTime::now_utc(),
        })
        .collect()
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.category_list_loads.fetch_add(1, Ordering::SeqCst);
        Ok(newest_first(&self.tables().categories))
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .tables()
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn find_category_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.tables().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_categories_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self
            .tables()
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategoriesWriteRepo for MemoryStore {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.tables();
        if tables.categories.iter().any(|c| c.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: CATEGORY_SLUG_CONSTRAINT.to_string(),
            });
        }
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: params.slug,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.categories.push(record.clone());
        Ok(record)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let mut tables = self.tables();
        if tables
            .categories
            .iter()
            .any(|c| c.slug == params.slug && c.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: CATEGORY_SLUG_CONSTRAINT.to_string(),
            });
        }
        Ok(tables
            .categories
            .iter_mut()
            .find(|c| c.id == params.id)
            .map(|category| {
                category.name = params.name;
                category.slug = params.slug;
                category.clone()
            }))
    }

    async fn delete_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let mut tables = self.tables();
        let Some(index) = tables.categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        for product in tables
            .products
            .iter_mut()
            .filter(|p| p.category_id == Some(id))
        {
            product.category_id = None;
        }
        Ok(Some(tables.categories.remove(index)))
    }
}

#[async_trait]
impl ProductsRepo for MemoryStore {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, RepoError> {
        Ok(newest_first(&self.tables().products))
    }

    async fn count_products(&self, category_id: Option<Uuid>) -> Result<u64, RepoError> {
        Ok(self
            .tables()
            .products
            .iter()
            .filter(|p| category_id.is_none() || p.category_id == category_id)
            .count() as u64)
    }

    async fn list_products_page(
        &self,
        category_id: Option<Uuid>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        Ok(newest_first(&self.tables().products)
            .into_iter()
            .filter(|p| category_id.is_none() || p.category_id == category_id)
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<ProductRecord>, RepoError> {
        self.product_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables().products.iter().find(|p| p.slug == slug).cloned())
    }

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        Ok(self.tables().products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductRecord>, RepoError> {
        Ok(self
            .tables()
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_images_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductImageRecord>, RepoError> {
        Ok(self
            .tables()
            .images
            .iter()
            .filter(|i| product_ids.contains(&i.product_id))
            .cloned()
            .collect())
    }

    async fn list_product_slugs_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<String>, RepoError> {
        Ok(self
            .tables()
            .products
            .iter()
            .filter(|p| p.category_id == Some(category_id))
            .map(|p| p.slug.clone())
            .collect())
    }
}

#[async_trait]
impl ProductsWriteRepo for MemoryStore {
    async fn create_product(
        &self,
        params: CreateProductParams,
    ) -> Result<ProductWithImages, RepoError> {
        let mut tables = self.tables();
        if tables.products.iter().any(|p| p.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: PRODUCT_SLUG_CONSTRAINT.to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let product = ProductRecord {
            id: Uuid::new_v4(),
            product_code: params.product_code,
            name: params.name,
            slug: params.slug,
            description: params.description,
            price: params.price,
            unit: params.unit,
            category_id: params.category_id,
            created_at: now,
            updated_at: now,
        };
        let images = image_rows(product.id, &params.images);
        tables.products.push(product.clone());
        tables.images.extend(images.iter().cloned());
        Ok(ProductWithImages { product, images })
    }

    async fn update_product(
        &self,
        params: UpdateProductParams,
    ) -> Result<Option<(ProductWithImages, Vec<ProductImageRecord>)>, RepoError> {
        let mut tables = self.tables();
        if tables
            .products
            .iter()
            .any(|p| p.slug == params.slug && p.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: PRODUCT_SLUG_CONSTRAINT.to_string(),
            });
        }
        let Some(product) = tables.products.iter_mut().find(|p| p.id == params.id) else {
            return Ok(None);
        };
        product.name = params.name;
        product.slug = params.slug;
        product.description = params.description;
        product.price = params.price;
        product.unit = params.unit;
        product.category_id = params.category_id;
        product.updated_at = OffsetDateTime::now_utc();
        let product = product.clone();

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut tables.images)
            .into_iter()
            .partition(|i| i.product_id == product.id && params.remove_image_ids.contains(&i.id));
        tables.images = kept;
        tables
            .images
            .extend(image_rows(product.id, &params.add_images));

        let images = tables
            .images
            .iter()
            .filter(|i| i.product_id == product.id)
            .cloned()
            .collect();
        Ok(Some((ProductWithImages { product, images }, removed)))
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<ProductWithImages>, RepoError> {
        let mut tables = self.tables();
        let Some(index) = tables.products.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let product = tables.products.remove(index);
        let (images, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut tables.images)
            .into_iter()
            .partition(|i| i.product_id == id);
        tables.images = kept;
        tables.items.retain(|item| item.product_id != id);
        Ok(Some(ProductWithImages { product, images }))
    }
}

#[async_trait]
impl OrdersRepo for MemoryStore {
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        Ok(newest_first(&self.tables().orders))
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepoError> {
        Ok(self.tables().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_order_items(
        &self,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderItemRecord>, RepoError> {
        Ok(self
            .tables()
            .items
            .iter()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrdersWriteRepo for MemoryStore {
    async fn create_order(&self, params: CreateOrderParams) -> Result<OrderRecord, RepoError> {
        let mut tables = self.tables();
        if tables.orders.iter().any(|o| o.order_code == params.order_code) {
            return Err(RepoError::Duplicate {
                constraint: ORDER_CODE_CONSTRAINT.to_string(),
            });
        }
        if params
            .items
            .iter()
            .any(|item| !tables.products.iter().any(|p| p.id == item.product_id))
        {
            return Err(RepoError::InvalidInput {
                message: "order_items_product_id_fkey".to_string(),
            });
        }
        let order = OrderRecord {
            id: Uuid::new_v4(),
            order_code: params.order_code,
            name: params.name,
            address: params.address,
            telephone: params.telephone,
            email: params.email,
            note: params.note,
            delivery_method: params.delivery_method,
            status: OrderStatus::Ordered,
            created_at: OffsetDateTime::now_utc(),
        };
        let items: Vec<OrderItemRecord> = params
            .items
            .into_iter()
            .map(|item| OrderItemRecord {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();
        tables.orders.push(order.clone());
        tables.items.extend(items);
        Ok(order)
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepoError> {
        Ok(self
            .tables()
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .map(|order| {
                order.status = status;
                order.clone()
            }))
    }

    async fn delete_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepoError> {
        let mut tables = self.tables();
        let Some(index) = tables.orders.iter().position(|o| o.id == id) else {
            return Ok(None);
        };
        tables.items.retain(|item| item.order_id != id);
        Ok(Some(tables.orders.remove(index)))
    }
}

#[async_trait]
impl AdminsRepo for MemoryStore {
    async fn find_admin_by_passcode(
        &self,
        passcode: &str,
    ) -> Result<Option<AdminRecord>, RepoError> {
        Ok(self
            .tables()
            .admins
            .iter()
            .find(|a| a.passcode == passcode)
            .cloned())
    }

    async fn find_admin_by_id(&self, id: Uuid) -> Result<Option<AdminRecord>, RepoError> {
        Ok(self.tables().admins.iter().find(|a| a.id == id).cloned())
    }
}

#[async_trait]
impl DashboardRepo for MemoryStore {
    async fn dashboard_totals(&self) -> Result<DashboardTotals, RepoError> {
        let tables = self.tables();
        Ok(DashboardTotals {
            total_products: tables.products.len() as u64,
            total_orders: tables.orders.len() as u64,
            pending_orders: tables
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Ordered)
                .count() as u64,
            total_sales: tables
                .items
                .iter()
                .map(|i| i.unit_price * Decimal::from(i.quantity))
                .sum(),
        })
    }

    async fn list_sales_since(&self, since: OffsetDateTime) -> Result<Vec<SaleRecord>, RepoError> {
        let tables = self.tables();
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.created_at >= since)
            .map(|order| SaleRecord {
                created_at: order.created_at,
                amount: tables
                    .items
                    .iter()
                    .filter(|i| i.order_id == order.id)
                    .map(|i| i.unit_price * Decimal::from(i.quantity))
                    .sum(),
            })
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Persistence("connection refused".to_string()))
        }
    }
}

/// Everything a test needs: the store, the cache, and the services and
/// router state built over them.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryKvCache>,
    pub client: CacheClient,
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub admin: Arc<AdminService>,
    pub dashboard: Arc<DashboardService>,
    pub state: ApiState,
    _uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(RateLimitRules::default())
    }

    pub fn with_limits(rules: RateLimitRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryKvCache::new());
        let backend: Arc<dyn KvCache> = cache.clone();
        let client = CacheClient::new(backend, Duration::from_millis(500));
        let reads = ReadThrough::new(client.clone(), Duration::from_secs(600));
        let trigger = CacheTrigger::new(client.clone(), store.clone());

        let uploads_dir = tempfile::tempdir().expect("uploads dir");
        let uploads = Arc::new(
            LocalObjectStorage::new(
                uploads_dir.path().to_path_buf(),
                "http://localhost/uploads",
            )
            .expect("local storage"),
        );
        let storage: Arc<dyn ObjectStorage> = uploads.clone();

        let categories = Arc::new(CategoryService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            reads.clone(),
            trigger.clone(),
        ));
        let products = Arc::new(ProductService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            storage,
            reads.clone(),
            trigger.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            reads.clone(),
            trigger.clone(),
        ));
        let admin = Arc::new(AdminService::new(
            store.clone(),
            TokenIssuer::new(JWT_SECRET, time::Duration::days(7)),
            reads,
            trigger,
        ));
        let dashboard = Arc::new(DashboardService::new(store.clone()));

        let state = ApiState {
            categories: categories.clone(),
            products: products.clone(),
            orders: orders.clone(),
            admin: admin.clone(),
            dashboard: dashboard.clone(),
            store: store.clone(),
            uploads,
            rate_limiter: RateLimiter::new(client.clone(), Duration::from_secs(600)),
            rate_rules: rules,
            session: SessionCookieSettings { secure: false },
            max_upload_bytes: 10 * 1024 * 1024,
        };

        Self {
            store,
            cache,
            client,
            categories,
            products,
            orders,
            admin,
            dashboard,
            state,
            _uploads: uploads_dir,
        }
    }

    pub async fn admin_token(&self) -> String {
        self.admin
            .login(Some(ADMIN_PASSCODE))
            .await
            .expect("admin login")
            .token
    }

    pub async fn category(&self, name: &str) -> CategoryRecord {
        self.categories
            .create_category(name)
            .await
            .expect("create category")
    }

    pub async fn product(&self, name: &str, category: Option<&CategoryRecord>) -> ProductRecord {
        self.products
            .create_product(product_command(name, category))
            .await
            .expect("create product")
            .product
    }
}

pub fn product_command(name: &str, category: Option<&CategoryRecord>) -> CreateProductCommand {
    CreateProductCommand {
        name: Some(name.to_string()),
        description: Some(format!("{name} in sterling silver")),
        price: Some("120.00".to_string()),
        unit: Some("3".to_string()),
        category_id: category.map(|c| c.id.to_string()),
        images: vec![ImageUpload {
            filename: "front.jpg".to_string(),
            data: Bytes::from_static(b"\xff\xd8\xff\xe0 jpeg"),
        }],
    }
}
