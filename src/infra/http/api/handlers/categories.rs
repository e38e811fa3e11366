//! Category handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::pagination::PageRequest;
use crate::infra::http::api::error::{ApiError, category_to_api};
use crate::infra::http::api::models::{CategoryPageQuery, CategoryRequest, CategoryResponse};
use crate::infra::http::api::state::ApiState;

use super::{json_body, json_payload, parse_id};

pub async fn list_categories(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let payload = state
        .categories
        .list_categories()
        .await
        .map_err(category_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}

pub async fn category_page(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    Query(query): Query<CategoryPageQuery>,
) -> Result<Response, ApiError> {
    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref());
    let payload = state
        .categories
        .category_page(&slug, page)
        .await
        .map_err(category_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}

pub async fn create_category(
    State(state): State<ApiState>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let category = state
        .categories
        .create_category(request.name.as_deref().unwrap_or_default())
        .await
        .map_err(category_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse::ok("Category created successfully", category)),
    ))
}

pub async fn rename_category(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let id = parse_id(&id, "Category not found")?;
    let category = state
        .categories
        .rename_category(id, request.name.as_deref().unwrap_or_default())
        .await
        .map_err(category_to_api)?;

    Ok(Json(CategoryResponse::ok(
        "Category updated successfully",
        category,
    )))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Category not found")?;
    let category = state
        .categories
        .delete_category(id)
        .await
        .map_err(category_to_api)?;

    Ok(Json(CategoryResponse::ok(
        "Category deleted successfully",
        category,
    )))
}
