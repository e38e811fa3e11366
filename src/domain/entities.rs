//! Domain entities mirrored from persistent storage.
//!
//! Records serialize with the camelCase field names exposed by the HTTP
//! surface, so cached payloads and fresh responses share one shape.

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{DeliveryMethod, OrderStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: Uuid,
    pub product_code: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub unit: i32,
    pub category_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImageRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub public_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: Uuid,
    /// Display code handed to the customer (`ORDER-1234`).
    #[serde(rename = "orderId")]
    pub order_code: String,
    pub name: String,
    pub address: String,
    pub telephone: String,
    pub email: String,
    pub note: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Price captured when the order was placed.
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminRecord {
    pub id: Uuid,
    pub passcode: String,
    pub owner: String,
}
