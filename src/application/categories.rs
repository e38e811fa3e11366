use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::payload::{Envelope, PagedEnvelope};
use crate::application::repos::{
    CATEGORY_SLUG_CONSTRAINT, CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams,
    ProductsRepo, RepoError, UpdateCategoryParams,
};
use crate::application::views::{CategoryListing, ListingCategory, assemble_products};
use crate::cache::{CacheKey, CacheTrigger, ReadThrough};
use crate::domain::entities::{CategoryRecord, ProductImageRecord, ProductRecord};
use crate::domain::slug::{ALL_PRODUCTS_SLUG, SlugError, derive_category_slug};

const SOURCE: &str = "gemstore::application::categories";

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct CategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    products: Arc<dyn ProductsRepo>,
    reads: ReadThrough,
    trigger: CacheTrigger,
}

impl CategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        products: Arc<dyn ProductsRepo>,
        reads: ReadThrough,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            reader,
            writer,
            products,
            reads,
            trigger,
        }
    }

    pub async fn list_categories(&self) -> Result<String, CategoryError> {
        self.reads
            .fetch(&CacheKey::AllCategories, || async {
                let categories = self.reader.list_categories().await?;
                if categories.is_empty() {
                    return Err(CategoryError::NotFound("No categories found"));
                }
                Ok(Envelope::ok("Categories fetched successfully", categories).encode()?)
            })
            .await
    }

    /// Paginated products of one category, or of every product under the
    /// reserved `all` slug.
    pub async fn category_page(
        &self,
        slug: &str,
        page: PageRequest,
    ) -> Result<String, CategoryError> {
        let key = CacheKey::category_page(slug, page);
        self.reads
            .fetch(&key, || async {
                if slug == ALL_PRODUCTS_SLUG {
                    self.load_all_products_page(page).await
                } else {
                    self.load_category_page(slug, page).await
                }
            })
            .await
    }

    async fn load_all_products_page(&self, page: PageRequest) -> Result<String, CategoryError> {
        let total = self.products.count_products(None).await?;
        let products = self
            .products
            .list_products_page(None, page.limit(), page.offset())
            .await?;
        let images = self.images_for(&products).await?;

        let listing = CategoryListing {
            category: ListingCategory::all_products(),
            products: assemble_products(products, images, &[]),
        };
        Ok(PagedEnvelope::ok("All products fetched successfully", listing, total, page).encode()?)
    }

    async fn load_category_page(
        &self,
        slug: &str,
        page: PageRequest,
    ) -> Result<String, CategoryError> {
        let category = self
            .reader
            .find_category_by_slug(slug)
            .await?
            .ok_or(CategoryError::NotFound("Category not found"))?;

        let total = self.products.count_products(Some(category.id)).await?;
        let products = self
            .products
            .list_products_page(Some(category.id), page.limit(), page.offset())
            .await?;
        let images = self.images_for(&products).await?;

        let listing = CategoryListing {
            category: ListingCategory::from(&category),
            products: assemble_products(products, images, std::slice::from_ref(&category)),
        };
        Ok(
            PagedEnvelope::ok("Category products fetched successfully", listing, total, page)
                .encode()?,
        )
    }

    async fn images_for(
        &self,
        products: &[ProductRecord],
    ) -> Result<Vec<ProductImageRecord>, RepoError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<_> = products.iter().map(|p| p.id).collect();
        self.products.list_images_for_products(&ids).await
    }

    pub async fn create_category(&self, name: &str) -> Result<CategoryRecord, CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::BadRequest("Name is required".to_string()));
        }
        let slug = derive_category_slug(name).map_err(slug_to_bad_request)?;

        if self.reader.find_category_by_slug(&slug).await?.is_some() {
            return Err(duplicate_name(name));
        }

        let created = self
            .writer
            .create_category(CreateCategoryParams {
                name: name.to_string(),
                slug,
            })
            .await
            .map_err(|err| duplicate_or_repo(err, name))?;

        info!(target: SOURCE, slug = %created.slug, "category created");
        self.trigger.category_created().await;
        Ok(created)
    }

    pub async fn rename_category(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<CategoryRecord, CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::BadRequest("Name is required".to_string()));
        }
        let existing = self
            .reader
            .find_category_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound("Category not found"))?;

        let new_slug = derive_category_slug(name).map_err(slug_to_bad_request)?;
        if new_slug != existing.slug
            && self.reader.find_category_by_slug(&new_slug).await?.is_some()
        {
            return Err(duplicate_name(name));
        }

        let updated = self
            .writer
            .update_category(UpdateCategoryParams {
                id: existing.id,
                name: name.to_string(),
                slug: new_slug,
            })
            .await
            .map_err(|err| duplicate_or_repo(err, name))?
            .ok_or(CategoryError::NotFound("Category not found"))?;

        let product_slugs = self
            .products
            .list_product_slugs_in_category(updated.id)
            .await
            .unwrap_or_else(|err| {
                warn!(target: SOURCE, category_id = %updated.id, error = %err, "could not list member products; their entries expire at TTL");
                Vec::new()
            });
        self.trigger
            .category_renamed(&existing.slug, &updated.slug, product_slugs)
            .await;
        Ok(updated)
    }

    /// Products of the category stay, uncategorised.
    pub async fn delete_category(&self, id: Uuid) -> Result<CategoryRecord, CategoryError> {
        let existing = self
            .reader
            .find_category_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound("Category not found"))?;

        // Collected first: once the row is gone the products no longer point at it.
        let product_slugs = self
            .products
            .list_product_slugs_in_category(existing.id)
            .await?;

        let deleted = self
            .writer
            .delete_category(existing.id)
            .await?
            .ok_or(CategoryError::NotFound("Category not found"))?;

        self.trigger
            .category_deleted(&deleted.slug, product_slugs)
            .await;
        Ok(deleted)
    }
}

fn duplicate_name(name: &str) -> CategoryError {
    CategoryError::BadRequest(format!(
        "Category with name \"{name}\" already exists. Try a different name"
    ))
}

fn duplicate_or_repo(err: RepoError, name: &str) -> CategoryError {
    if err.is_duplicate_of(CATEGORY_SLUG_CONSTRAINT) {
        duplicate_name(name)
    } else {
        CategoryError::Repo(err)
    }
}

fn slug_to_bad_request(err: SlugError) -> CategoryError {
    match err {
        SlugError::Reserved { slug } => {
            CategoryError::BadRequest(format!("\"{slug}\" is a reserved category name"))
        }
        other => CategoryError::BadRequest(other.to_string()),
    }
}
