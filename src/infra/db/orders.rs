use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateOrderParams, OrdersRepo, OrdersWriteRepo, RepoError},
    domain::{
        entities::{OrderItemRecord, OrderRecord},
        types::{DeliveryMethod, OrderStatus},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const ORDER_COLUMNS: &str =
    "id, order_code, name, address, telephone, email, note, delivery_method, status, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_code: String,
    name: String,
    address: String,
    telephone: String,
    email: String,
    note: Option<String>,
    delivery_method: DeliveryMethod,
    status: OrderStatus,
    created_at: OffsetDateTime,
}

impl From<OrderRow> for OrderRecord {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_code: row.order_code,
            name: row.name,
            address: row.address,
            telephone: row.telephone,
            email: row.email,
            note: row.note,
            delivery_method: row.delivery_method,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for OrderItemRecord {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[async_trait]
impl OrdersRepo for PostgresRepositories {
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OrderRecord::from).collect())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(OrderRecord::from))
    }

    async fn list_order_items(
        &self,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderItemRecord>, RepoError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, id
            "#,
        )
        .bind(order_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OrderItemRecord::from).collect())
    }
}

#[async_trait]
impl OrdersWriteRepo for PostgresRepositories {
    async fn create_order(&self, params: CreateOrderParams) -> Result<OrderRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders
                (id, order_code, name, address, telephone, email, note, delivery_method, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&params.order_code)
        .bind(&params.name)
        .bind(&params.address)
        .bind(&params.telephone)
        .bind(&params.email)
        .bind(params.note.as_deref())
        .bind(params.delivery_method)
        .bind(OrderStatus::Ordered)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for item in &params.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>, RepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(OrderRecord::from))
    }

    async fn delete_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "DELETE FROM orders WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(OrderRecord::from))
    }
}
