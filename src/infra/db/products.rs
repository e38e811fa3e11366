use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateProductParams, NewProductImage, ProductWithImages, ProductsRepo, ProductsWriteRepo,
        RepoError, UpdateProductParams,
    },
    domain::entities::{ProductImageRecord, ProductRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const PRODUCT_COLUMNS: &str =
    "id, product_code, name, slug, description, price, unit, category_id, created_at, updated_at";
const IMAGE_COLUMNS: &str = "id, product_id, image_url, public_id, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    product_code: String,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    unit: i32,
    category_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            product_code: row.product_code,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            unit: row.unit,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductImageRow {
    id: Uuid,
    product_id: Uuid,
    image_url: String,
    public_id: String,
    created_at: OffsetDateTime,
}

impl From<ProductImageRow> for ProductImageRecord {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
            public_id: row.public_id,
            created_at: row.created_at,
        }
    }
}

async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    images: &[NewProductImage],
) -> Result<(), RepoError> {
    for image in images {
        sqlx::query(
            r#"
            INSERT INTO product_images (id, product_id, image_url, public_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(&image.image_url)
        .bind(&image.public_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    }
    Ok(())
}

async fn images_of(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<Vec<ProductImageRecord>, RepoError> {
    let rows = sqlx::query_as::<_, ProductImageRow>(&format!(
        "SELECT {IMAGE_COLUMNS} FROM product_images WHERE product_id = $1 ORDER BY created_at, id"
    ))
    .bind(product_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;

    Ok(rows.into_iter().map(ProductImageRecord::from).collect())
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl ProductsRepo for PostgresRepositories {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn count_products(&self, category_id: Option<Uuid>) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1::uuid IS NULL OR category_id = $1)",
        )
        .bind(category_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(to_count(count))
    }

    async fn list_products_page(
        &self,
        category_id: Option<Uuid>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: format!("offset {offset} out of range"),
        })?;
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::uuid IS NULL OR category_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(category_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<ProductRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProductRecord::from))
    }

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProductRecord::from))
    }

    async fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn list_images_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductImageRecord>, RepoError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ProductImageRow>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY created_at, id
            "#
        ))
        .bind(product_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProductImageRecord::from).collect())
    }

    async fn list_product_slugs_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar("SELECT slug FROM products WHERE category_id = $1 ORDER BY slug")
            .bind(category_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ProductsWriteRepo for PostgresRepositories {
    async fn create_product(
        &self,
        params: CreateProductParams,
    ) -> Result<ProductWithImages, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (id, product_code, name, slug, description, price, unit, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&params.product_code)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(&params.description)
        .bind(params.price)
        .bind(params.unit)
        .bind(params.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        insert_images(&mut tx, row.id, &params.images).await?;
        let images = images_of(&mut tx, row.id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(ProductWithImages {
            product: row.into(),
            images,
        })
    }

    async fn update_product(
        &self,
        params: UpdateProductParams,
    ) -> Result<Option<(ProductWithImages, Vec<ProductImageRecord>)>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $2,
                slug = $3,
                description = $4,
                price = $5,
                unit = $6,
                category_id = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(params.id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(&params.description)
        .bind(params.price)
        .bind(params.unit)
        .bind(params.category_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let removed = if params.remove_image_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, ProductImageRow>(&format!(
                r#"
                DELETE FROM product_images
                WHERE product_id = $1 AND id = ANY($2)
                RETURNING {IMAGE_COLUMNS}
                "#
            ))
            .bind(row.id)
            .bind(&params.remove_image_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(ProductImageRecord::from)
            .collect()
        };

        insert_images(&mut tx, row.id, &params.add_images).await?;
        let images = images_of(&mut tx, row.id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some((
            ProductWithImages {
                product: row.into(),
                images,
            },
            removed,
        )))
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<ProductWithImages>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let images = images_of(&mut tx, id).await?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.map(|row| ProductWithImages {
            product: row.into(),
            images,
        }))
    }
}
