//! Product handlers

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::products::{
    CreateProductCommand, ImageUpload, UpdateProductCommand,
};
use crate::application::views::ProductView;
use crate::infra::http::api::error::{ApiError, product_to_api};
use crate::infra::http::api::models::DataResponse;
use crate::infra::http::api::state::ApiState;

use super::{json_payload, parse_id};

/// Text fields and files of a product form.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    unit: Option<String>,
    category_id: Option<String>,
    deleted_image_ids: Vec<String>,
    files: Vec<ImageUpload>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::bad_request("Invalid multipart payload").with_detail(err.to_string())
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "files" || name == "files[]" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field.bytes().await.map_err(|err| {
                ApiError::bad_request("Failed to read uploaded file").with_detail(err.to_string())
            })?;
            if !data.is_empty() {
                form.files.push(ImageUpload { filename, data });
            }
            continue;
        }

        let value = field.text().await.map_err(|err| {
            ApiError::bad_request("Invalid multipart payload").with_detail(err.to_string())
        })?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "description" => form.description = Some(value),
            "price" => form.price = Some(value),
            "unit" => form.unit = Some(value),
            "categoryId" => form.category_id = Some(value),
            "deletedImageIds" | "deletedImageIds[]" => form.deleted_image_ids.push(value),
            _ => {}
        }
    }

    Ok(form)
}

pub async fn list_products(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let payload = state
        .products
        .list_products()
        .await
        .map_err(product_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}

pub async fn get_product(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let payload = state
        .products
        .product_by_slug(&slug)
        .await
        .map_err(product_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}

pub async fn create_product(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart).await?;
    let command = CreateProductCommand {
        name: form.name,
        description: form.description,
        price: form.price,
        unit: form.unit,
        category_id: form.category_id,
        images: form.files,
    };

    let product = state
        .products
        .create_product(command)
        .await
        .map_err(product_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::<ProductView>::ok(
            "Product created successfully",
            product,
        )),
    ))
}

pub async fn update_product(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart).await?;
    let command = UpdateProductCommand {
        name: form.name,
        description: form.description,
        price: form.price,
        unit: form.unit,
        category_id: form.category_id,
        remove_image_ids: form.deleted_image_ids,
        images: form.files,
    };

    let product = state
        .products
        .update_product(&slug, command)
        .await
        .map_err(product_to_api)?;

    Ok(Json(DataResponse::ok("Product updated successfully", product)))
}

pub async fn delete_product(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Product not found")?;
    let product = state
        .products
        .delete_product(id)
        .await
        .map_err(product_to_api)?;

    Ok(Json(DataResponse::ok("Product deleted successfully", product)))
}
