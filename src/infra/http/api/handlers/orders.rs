//! Order handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::payload::MessageEnvelope;
use crate::infra::http::api::error::{ApiError, order_to_api};
use crate::infra::http::api::models::{
    OrderRequest, OrderResponse, OrderStatusRequest, PlacedOrderResponse,
};
use crate::infra::http::api::state::ApiState;

use super::{json_body, json_payload, parse_id};

pub async fn place_order(
    State(state): State<ApiState>,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let placed = state
        .orders
        .place_order(request.into())
        .await
        .map_err(order_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(PlacedOrderResponse::ok("Order placed successfully", placed)),
    ))
}

pub async fn list_orders(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let payload = state.orders.list_orders().await.map_err(order_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}

pub async fn get_order(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Order not found")?;
    let payload = state.orders.order_by_id(id).await.map_err(order_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}

pub async fn update_order_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<OrderStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let id = parse_id(&id, "Order not found")?;
    let order = state
        .orders
        .update_status(id, request.status.as_deref())
        .await
        .map_err(order_to_api)?;

    Ok(Json(OrderResponse::ok(
        "Order status updated successfully",
        order,
    )))
}

pub async fn delete_order(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Order not found")?;
    state.orders.delete_order(id).await.map_err(order_to_api)?;
    Ok(Json(MessageEnvelope::ok("Order deleted successfully")))
}
