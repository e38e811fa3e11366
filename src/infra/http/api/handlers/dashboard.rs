//! Dashboard handlers

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::infra::http::api::error::{ApiError, dashboard_to_api};
use crate::infra::http::api::models::{MetricsResponse, SalesQuery, SalesResponse};
use crate::infra::http::api::state::ApiState;

pub async fn metrics(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let metrics = state.dashboard.metrics().await.map_err(dashboard_to_api)?;
    Ok(Json(MetricsResponse::ok(
        "Metrics fetched successfully",
        metrics,
    )))
}

pub async fn sales(
    State(state): State<ApiState>,
    Query(query): Query<SalesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let buckets = state
        .dashboard
        .sales(query.period.as_deref())
        .await
        .map_err(dashboard_to_api)?;
    Ok(Json(SalesResponse::ok("Sales fetched successfully", buckets)))
}
