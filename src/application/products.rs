use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::payload::Envelope;
use crate::application::repos::{
    CategoriesRepo, CreateProductParams, NewProductImage, PRODUCT_CODE_CONSTRAINT,
    PRODUCT_SLUG_CONSTRAINT, ProductWithImages, ProductsRepo, ProductsWriteRepo, RepoError,
    UpdateProductParams,
};
use crate::application::storage::{ObjectStorage, ObjectStorageError, StoredObject};
use crate::application::views::{CategorySummary, ProductView, assemble_products, distinct_ids};
use crate::cache::{CacheKey, CacheTrigger, ReadThrough};
use crate::domain::codes::{MAX_CODE_ATTEMPTS, PRODUCT_CODE_PREFIX, generate_display_code};
use crate::domain::entities::{CategoryRecord, ProductImageRecord};
use crate::domain::slug::derive_slug;

const SOURCE: &str = "gemstore::application::products";
const IMAGE_FOLDER: &str = "products";

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("image upload failed: {0}")]
    Upload(#[from] ObjectStorageError),
    #[error("no free product code after {0} attempts")]
    CodesExhausted(usize),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw form input for a new product; validation happens in the service.
#[derive(Debug, Clone, Default)]
pub struct CreateProductCommand {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub unit: Option<String>,
    pub category_id: Option<String>,
    pub images: Vec<ImageUpload>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateProductCommand {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub unit: Option<String>,
    pub category_id: Option<String>,
    pub remove_image_ids: Vec<String>,
    pub images: Vec<ImageUpload>,
}

#[derive(Clone)]
pub struct ProductService {
    reader: Arc<dyn ProductsRepo>,
    writer: Arc<dyn ProductsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    storage: Arc<dyn ObjectStorage>,
    reads: ReadThrough,
    trigger: CacheTrigger,
}

impl ProductService {
    pub fn new(
        reader: Arc<dyn ProductsRepo>,
        writer: Arc<dyn ProductsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        storage: Arc<dyn ObjectStorage>,
        reads: ReadThrough,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            storage,
            reads,
            trigger,
        }
    }

    pub async fn list_products(&self) -> Result<String, ProductError> {
        self.reads
            .fetch(&CacheKey::AllProducts, || async {
                let products = self.reader.list_products().await?;
                if products.is_empty() {
                    return Err(ProductError::NotFound("No products found"));
                }

                let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
                let category_ids = distinct_ids(products.iter().filter_map(|p| p.category_id));
                let images = self.reader.list_images_for_products(&ids).await?;
                let categories = self.categories_by_ids(&category_ids).await?;

                let views = assemble_products(products, images, &categories);
                Ok(Envelope::ok("Products fetched successfully", views).encode()?)
            })
            .await
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<String, ProductError> {
        self.reads
            .fetch(&CacheKey::product(slug), || async {
                let product = self
                    .reader
                    .find_product_by_slug(slug)
                    .await?
                    .ok_or(ProductError::NotFound("Product not found"))?;

                let images = self.reader.list_images_for_products(&[product.id]).await?;
                let categories = match product.category_id {
                    Some(id) => self.categories_by_ids(&[id]).await?,
                    None => Vec::new(),
                };

                let mut views = assemble_products(vec![product], images, &categories);
                let view = views.pop().ok_or(ProductError::NotFound("Product not found"))?;
                Ok(Envelope::ok("Product fetched", view).encode()?)
            })
            .await
    }

    async fn categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CategoryRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.categories.find_categories_by_ids(ids).await
    }

    pub async fn create_product(
        &self,
        command: CreateProductCommand,
    ) -> Result<ProductView, ProductError> {
        let (Some(name), Some(description), Some(price), Some(unit)) = (
            non_blank(command.name),
            non_blank(command.description),
            non_blank(command.price),
            non_blank(command.unit),
        ) else {
            return Err(ProductError::BadRequest(
                "All fields are required.".to_string(),
            ));
        };
        if command.images.is_empty() {
            return Err(ProductError::BadRequest(
                "At least one image is required.".to_string(),
            ));
        }

        let price = parse_price(&price)?;
        let unit = parse_unit(&unit)?;
        let slug = derive_slug(&name).map_err(|err| ProductError::BadRequest(err.to_string()))?;
        let category = self.resolve_category(command.category_id.as_deref()).await?;

        if self.reader.find_product_by_slug(&slug).await?.is_some() {
            return Err(duplicate_name(&name));
        }

        let uploaded = self.upload_all(&command.images).await?;
        let mut params = CreateProductParams {
            product_code: String::new(),
            name: name.clone(),
            slug,
            description,
            price,
            unit,
            category_id: category.as_ref().map(|c| c.id),
            images: uploaded.iter().map(new_image).collect(),
        };

        let mut created = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            params.product_code = generate_display_code(PRODUCT_CODE_PREFIX);
            match self.writer.create_product(params.clone()).await {
                Ok(record) => {
                    created = Some(record);
                    break;
                }
                Err(err) if err.is_duplicate_of(PRODUCT_CODE_CONSTRAINT) => continue,
                Err(err) => {
                    self.discard_uploads(&uploaded).await;
                    return Err(duplicate_or_repo(err, &name));
                }
            }
        }
        let Some(created) = created else {
            self.discard_uploads(&uploaded).await;
            return Err(ProductError::CodesExhausted(MAX_CODE_ATTEMPTS));
        };

        info!(
            target: SOURCE,
            slug = %created.product.slug,
            product_code = %created.product.product_code,
            images = created.images.len(),
            "product created"
        );
        self.trigger
            .product_created(&created.product.slug, created.product.category_id)
            .await;

        Ok(into_view(created, category))
    }

    pub async fn update_product(
        &self,
        slug: &str,
        command: UpdateProductCommand,
    ) -> Result<ProductView, ProductError> {
        let existing = self
            .reader
            .find_product_by_slug(slug)
            .await?
            .ok_or(ProductError::NotFound("Product not found"))?;

        let name = non_blank(command.name);
        let mut new_slug = existing.slug.clone();
        if let Some(name) = name.as_deref().filter(|name| *name != existing.name) {
            new_slug =
                derive_slug(name).map_err(|err| ProductError::BadRequest(err.to_string()))?;
            let conflict = self.reader.find_product_by_slug(&new_slug).await?;
            if conflict.is_some_and(|other| other.id != existing.id) {
                return Err(ProductError::BadRequest(format!(
                    "Another product already exists with name \"{name}\""
                )));
            }
        }

        let price = match non_blank(command.price) {
            Some(raw) => parse_price(&raw)?,
            None => existing.price,
        };
        let unit = match non_blank(command.unit) {
            Some(raw) => parse_unit(&raw)?,
            None => existing.unit,
        };
        let category = match non_blank(command.category_id) {
            Some(raw) => self.resolve_category(Some(&raw)).await?,
            None => match existing.category_id {
                Some(id) => self.categories.find_category_by_id(id).await?,
                None => None,
            },
        };
        let remove_image_ids = command
            .remove_image_ids
            .iter()
            .map(|raw| {
                Uuid::parse_str(raw.trim())
                    .map_err(|_| ProductError::BadRequest(format!("Invalid image id `{raw}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let uploaded = self.upload_all(&command.images).await?;
        let product_name = name.clone().unwrap_or_else(|| existing.name.clone());
        let params = UpdateProductParams {
            id: existing.id,
            name: product_name.clone(),
            slug: new_slug,
            description: non_blank(command.description)
                .unwrap_or_else(|| existing.description.clone()),
            price,
            unit,
            category_id: category.as_ref().map(|c| c.id),
            remove_image_ids,
            add_images: uploaded.iter().map(new_image).collect(),
        };

        let (updated, removed) = match self.writer.update_product(params).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                self.discard_uploads(&uploaded).await;
                return Err(ProductError::NotFound("Product not found"));
            }
            Err(err) => {
                self.discard_uploads(&uploaded).await;
                return Err(duplicate_or_repo(err, &product_name));
            }
        };

        self.discard_images(&removed).await;
        self.trigger
            .product_updated(
                &existing.slug,
                &updated.product.slug,
                existing.category_id,
                updated.product.category_id,
            )
            .await;

        Ok(into_view(updated, category))
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<ProductView, ProductError> {
        let deleted = self
            .writer
            .delete_product(id)
            .await?
            .ok_or(ProductError::NotFound("Product not found"))?;

        self.discard_images(&deleted.images).await;
        self.trigger
            .product_deleted(&deleted.product.slug, deleted.product.category_id)
            .await;

        info!(target: SOURCE, slug = %deleted.product.slug, "product deleted");
        Ok(into_view(deleted, None))
    }

    async fn resolve_category(
        &self,
        raw: Option<&str>,
    ) -> Result<Option<CategoryRecord>, ProductError> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(None);
        };
        let id = Uuid::parse_str(raw)
            .map_err(|_| ProductError::BadRequest("Category not found".to_string()))?;
        self.categories
            .find_category_by_id(id)
            .await?
            .map(Some)
            .ok_or_else(|| ProductError::BadRequest("Category not found".to_string()))
    }

    /// Uploads run concurrently; if any fails, the ones that landed are removed.
    async fn upload_all(&self, images: &[ImageUpload]) -> Result<Vec<StoredObject>, ProductError> {
        let results = join_all(images.iter().map(|image| {
            self.storage
                .upload(IMAGE_FOLDER, &image.filename, image.data.clone())
        }))
        .await;

        let mut uploaded = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match result {
                Ok(stored) => uploaded.push(stored),
                Err(err) => failure = failure.or(Some(err)),
            }
        }
        match failure {
            Some(err) => {
                self.discard_uploads(&uploaded).await;
                Err(ProductError::Upload(err))
            }
            None => Ok(uploaded),
        }
    }

    async fn discard_uploads(&self, uploaded: &[StoredObject]) {
        let ids: Vec<&str> = uploaded.iter().map(|s| s.public_id.as_str()).collect();
        self.discard(&ids, "orphaned upload left in storage").await;
    }

    async fn discard_images(&self, images: &[ProductImageRecord]) {
        let ids: Vec<&str> = images.iter().map(|i| i.public_id.as_str()).collect();
        self.discard(&ids, "removed image left in storage").await;
    }

    async fn discard(&self, public_ids: &[&str], message: &'static str) {
        let results = join_all(public_ids.iter().map(|id| self.storage.delete(id))).await;
        for (public_id, result) in public_ids.iter().zip(results) {
            if let Err(err) = result {
                warn!(target: SOURCE, public_id = %public_id, error = %err, "{message}");
            }
        }
    }
}

fn into_view(record: ProductWithImages, category: Option<CategoryRecord>) -> ProductView {
    let category = category
        .filter(|c| record.product.category_id == Some(c.id))
        .as_ref()
        .map(CategorySummary::from);
    ProductView {
        product: record.product,
        images: record.images,
        category,
    }
}

fn new_image(stored: &StoredObject) -> NewProductImage {
    NewProductImage {
        image_url: stored.url.clone(),
        public_id: stored.public_id.clone(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_price(raw: &str) -> Result<Decimal, ProductError> {
    Decimal::from_str(raw.trim())
        .ok()
        .map(|price| price.round_dp(2))
        .filter(|price| price.is_sign_positive() && !price.is_zero())
        .ok_or_else(|| ProductError::BadRequest("Price must be a positive number".to_string()))
}

fn parse_unit(raw: &str) -> Result<i32, ProductError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|unit| *unit > 0)
        .ok_or_else(|| ProductError::BadRequest("Unit must be a positive whole number".to_string()))
}

fn duplicate_name(name: &str) -> ProductError {
    ProductError::BadRequest(format!("Product with name \"{name}\" already exists"))
}

fn duplicate_or_repo(err: RepoError, name: &str) -> ProductError {
    if err.is_duplicate_of(PRODUCT_SLUG_CONSTRAINT) {
        duplicate_name(name)
    } else {
        ProductError::Repo(err)
    }
}
