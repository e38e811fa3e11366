//! Serves stored product images.

use std::io::ErrorKind;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{
    HeaderValue, StatusCode,
    header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
};
use axum::response::Response;
use bytes::Bytes;
use tracing::error;

use crate::application::storage::ObjectStorageError;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

const SOURCE: &str = "gemstore::http::uploads";

pub async fn serve_upload(
    State(state): State<ApiState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    match state.uploads.read(&path).await {
        Ok(bytes) => Ok(build_upload_response(&path, bytes)),
        Err(ObjectStorageError::InvalidIdentifier { .. }) => {
            Err(ApiError::not_found("Upload not found"))
        }
        Err(ObjectStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            Err(ApiError::not_found("Upload not found"))
        }
        Err(err) => {
            error!(target: SOURCE, path = %path, error = %err, "failed to read stored upload");
            Err(ApiError::internal(err.to_string()))
        }
    }
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
