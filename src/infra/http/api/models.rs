use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::dashboard::{MetricsView, SalesBucket};
use crate::application::orders::{CreateOrderCommand, OrderItemInput, PlacedOrder};
use crate::domain::entities::{CategoryRecord, OrderRecord};

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Option<String>,
    pub unit_price: Option<Decimal>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

impl From<OrderRequest> for CreateOrderCommand {
    fn from(request: OrderRequest) -> Self {
        Self {
            name: request.name,
            address: request.address,
            telephone: request.telephone,
            email: request.email,
            note: request.note,
            delivery_method: request.delivery_method,
            items: request
                .items
                .into_iter()
                .map(|item| OrderItemInput {
                    product_id: item.product_id,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub message: &'static str,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message,
            data,
        }
    }
}

pub type CategoryResponse = DataResponse<CategoryRecord>;
pub type OrderResponse = DataResponse<OrderRecord>;
pub type PlacedOrderResponse = DataResponse<PlacedOrder>;
pub type MetricsResponse = DataResponse<MetricsView>;
pub type SalesResponse = DataResponse<Vec<SalesBucket>>;

#[derive(Debug, Serialize)]
pub struct LoginResponse<T> {
    pub success: bool,
    pub valid: bool,
    pub message: &'static str,
    pub data: T,
}
