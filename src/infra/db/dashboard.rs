use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::application::repos::{DashboardRepo, DashboardTotals, RepoError, SaleRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_products: i64,
    total_orders: i64,
    pending_orders: i64,
    total_sales: Decimal,
}

#[derive(sqlx::FromRow)]
struct SaleRow {
    created_at: OffsetDateTime,
    amount: Decimal,
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl DashboardRepo for PostgresRepositories {
    async fn dashboard_totals(&self) -> Result<DashboardTotals, RepoError> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products) AS total_products,
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COUNT(*) FROM orders WHERE status = 'ordered') AS pending_orders,
                (SELECT COALESCE(SUM(unit_price * quantity), 0) FROM order_items) AS total_sales
            "#,
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(DashboardTotals {
            total_products: to_count(row.total_products),
            total_orders: to_count(row.total_orders),
            pending_orders: to_count(row.pending_orders),
            total_sales: row.total_sales,
        })
    }

    async fn list_sales_since(&self, since: OffsetDateTime) -> Result<Vec<SaleRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT o.created_at, COALESCE(SUM(oi.unit_price * oi.quantity), 0) AS amount
            FROM orders o
            LEFT JOIN order_items oi ON oi.order_id = o.id
            WHERE o.created_at >= $1
            GROUP BY o.id, o.created_at
            ORDER BY o.created_at
            "#,
        )
        .bind(since)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| SaleRecord {
                created_at: row.created_at,
                amount: row.amount,
            })
            .collect())
    }
}
