use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::payload::Envelope;
use crate::application::repos::{
    CreateOrderParams, NewOrderItem, ORDER_CODE_CONSTRAINT, OrdersRepo, OrdersWriteRepo,
    ProductsRepo, RepoError,
};
use crate::application::views::{OrderView, assemble_orders, distinct_ids};
use crate::cache::{CacheKey, CacheTrigger, ReadThrough};
use crate::domain::codes::{MAX_CODE_ATTEMPTS, ORDER_CODE_PREFIX, generate_display_code};
use crate::domain::entities::{OrderItemRecord, OrderRecord};
use crate::domain::types::{DeliveryMethod, OrderStatus};

const SOURCE: &str = "gemstore::application::orders";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("no free order code after {0} attempts")]
    CodesExhausted(usize),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct OrderItemInput {
    pub product_id: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOrderCommand {
    pub name: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
    pub delivery_method: Option<String>,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    #[serde(rename = "orderId")]
    pub order_code: String,
    pub id: Uuid,
}

#[derive(Clone)]
pub struct OrderService {
    reader: Arc<dyn OrdersRepo>,
    writer: Arc<dyn OrdersWriteRepo>,
    products: Arc<dyn ProductsRepo>,
    reads: ReadThrough,
    trigger: CacheTrigger,
}

impl OrderService {
    pub fn new(
        reader: Arc<dyn OrdersRepo>,
        writer: Arc<dyn OrdersWriteRepo>,
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

    pub async fn place_order(&self, command: CreateOrderCommand) -> Result<PlacedOrder, OrderError> {
        let mut params = validate_order(command)?;

        let mut placed = None;
        for _ in 0..MAX_CODE_ATTEMPTS {
            params.order_code = generate_display_code(ORDER_CODE_PREFIX);
            match self.writer.create_order(params.clone()).await {
                Ok(order) => {
                    placed = Some(order);
                    break;
                }
                Err(err) if err.is_duplicate_of(ORDER_CODE_CONSTRAINT) => continue,
                Err(RepoError::InvalidInput { .. }) => {
                    return Err(OrderError::BadRequest(
                        "One or more ordered products no longer exist".to_string(),
                    ));
                }
                Err(err) => return Err(err.into()),
            }
        }
        let order = placed.ok_or(OrderError::CodesExhausted(MAX_CODE_ATTEMPTS))?;

        info!(target: SOURCE, order_code = %order.order_code, items = params.items.len(), "order placed");
        self.trigger.order_created().await;
        Ok(PlacedOrder {
            order_code: order.order_code,
            id: order.id,
        })
    }

    pub async fn list_orders(&self) -> Result<String, OrderError> {
        self.reads
            .fetch(&CacheKey::AllOrders, || async {
                let orders = self.reader.list_orders().await?;
                if orders.is_empty() {
                    return Err(OrderError::NotFound("No orders found"));
                }
                let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
                let views = self.assemble(orders, &ids).await?;
                Ok(Envelope::ok("Orders fetched successfully", views).encode()?)
            })
            .await
    }

    pub async fn order_by_id(&self, id: Uuid) -> Result<String, OrderError> {
        self.reads
            .fetch(&CacheKey::order(id), || async {
                let order = self
                    .reader
                    .find_order(id)
                    .await?
                    .ok_or(OrderError::NotFound("Order not found"))?;
                let mut views = self.assemble(vec![order], &[id]).await?;
                let view = views.pop().ok_or(OrderError::NotFound("Order not found"))?;
                Ok(Envelope::ok("Order fetched successfully", view).encode()?)
            })
            .await
    }

    async fn assemble(
        &self,
        orders: Vec<OrderRecord>,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderView>, OrderError> {
        let items: Vec<OrderItemRecord> = self.reader.list_order_items(order_ids).await?;
        let product_ids = distinct_ids(items.iter().map(|item| item.product_id));
        let (products, images) = if product_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                self.products.find_products_by_ids(&product_ids).await?,
                self.products.list_images_for_products(&product_ids).await?,
            )
        };
        Ok(assemble_orders(orders, items, products, images))
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: Option<&str>,
    ) -> Result<OrderRecord, OrderError> {
        let Some(raw) = status.map(str::trim).filter(|s| !s.is_empty()) else {
            return Err(OrderError::BadRequest(
                "Order ID and new status are required".to_string(),
            ));
        };
        let status: OrderStatus = raw.parse().map_err(|_| {
            let allowed: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
            OrderError::BadRequest(format!(
                "Invalid status. Must be one of: {}",
                allowed.join(", ")
            ))
        })?;

        let order = self
            .writer
            .update_order_status(id, status)
            .await?
            .ok_or(OrderError::NotFound("Order not found"))?;

        self.trigger.order_updated(order.id).await;
        Ok(order)
    }

    pub async fn delete_order(&self, id: Uuid) -> Result<OrderRecord, OrderError> {
        let order = self
            .writer
            .delete_order(id)
            .await?
            .ok_or(OrderError::NotFound("Order not found"))?;

        self.trigger.order_deleted(order.id).await;
        Ok(order)
    }
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_order(command: CreateOrderCommand) -> Result<CreateOrderParams, OrderError> {
    let (Some(name), Some(address), Some(telephone), Some(email)) = (
        required(command.name),
        required(command.address),
        required(command.telephone),
        required(command.email),
    ) else {
        return Err(OrderError::BadRequest("All fields are required".to_string()));
    };

    let delivery_method: DeliveryMethod = command
        .delivery_method
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .parse()
        .map_err(|_| {
            OrderError::BadRequest(
                "Invalid delivery method. Must be 'delivery' or 'pickup'".to_string(),
            )
        })?;

    if command.items.is_empty() {
        return Err(OrderError::BadRequest(
            "At least one cart item is required".to_string(),
        ));
    }

    let items = command
        .items
        .into_iter()
        .map(validate_item)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            OrderError::BadRequest(
                "Each item must include productId, unitPrice, and quantity".to_string(),
            )
        })?;

    Ok(CreateOrderParams {
        order_code: String::new(),
        name,
        address,
        telephone,
        email,
        note: required(command.note),
        delivery_method,
        items,
    })
}

fn validate_item(item: OrderItemInput) -> Option<NewOrderItem> {
    let product_id = Uuid::parse_str(item.product_id?.trim()).ok()?;
    let unit_price = item
        .unit_price
        .map(|p| p.round_dp(2))
        .filter(|p| *p > Decimal::ZERO)?;
    let quantity = item
        .quantity
        .filter(|q| *q >= 1)
        .and_then(|q| i32::try_from(q).ok())?;
    Some(NewOrderItem {
        product_id,
        quantity,
        unit_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateOrderCommand {
        CreateOrderCommand {
            name: Some("Ada".into()),
            address: Some("1 Gem Street".into()),
            telephone: Some("0123".into()),
            email: Some("ada@example.com".into()),
            note: Some("  ".into()),
            delivery_method: Some("pickup".into()),
            items: vec![OrderItemInput {
                product_id: Some(Uuid::new_v4().to_string()),
                unit_price: Some(Decimal::new(12000, 2)),
                quantity: Some(2),
            }],
        }
    }

    #[test]
    fn valid_order_passes() {
        let params = validate_order(command()).expect("valid");
        assert_eq!(params.delivery_method, DeliveryMethod::Pickup);
        assert_eq!(params.items.len(), 1);
        assert_eq!(params.note, None);
    }

    #[test]
    fn missing_contact_field_is_rejected() {
        let mut cmd = command();
        cmd.email = None;
        let err = validate_order(cmd).expect_err("invalid");
        assert_eq!(err.to_string(), "All fields are required");
    }

    #[test]
    fn unknown_delivery_method_is_rejected() {
        let mut cmd = command();
        cmd.delivery_method = Some("drone".into());
        let err = validate_order(cmd).expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "Invalid delivery method. Must be 'delivery' or 'pickup'"
        );
    }

    #[test]
    fn empty_cart_is_rejected() {
        let mut cmd = command();
        cmd.items.clear();
        let err = validate_order(cmd).expect_err("invalid");
        assert_eq!(err.to_string(), "At least one cart item is required");
    }

    #[test]
    fn incomplete_items_are_rejected() {
        for item in [
            OrderItemInput {
                product_id: None,
                unit_price: Some(Decimal::ONE),
                quantity: Some(1),
            },
            OrderItemInput {
                product_id: Some(Uuid::new_v4().to_string()),
                unit_price: Some(Decimal::ZERO),
                quantity: Some(1),
            },
            OrderItemInput {
                product_id: Some(Uuid::new_v4().to_string()),
                unit_price: Some(Decimal::ONE),
                quantity: Some(0),
            },
            OrderItemInput {
                product_id: Some(Uuid::new_v4().to_string()),
                unit_price: Some(Decimal::new(1, 3)),
                quantity: Some(1),
            },
        ] {
            let mut cmd = command();
            cmd.items = vec![item];
            let err = validate_order(cmd).expect_err("invalid");
            assert_eq!(
                err.to_string(),
                "Each item must include productId, unitPrice, and quantity"
            );
        }
    }
}
