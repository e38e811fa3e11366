//! API handlers organized by resource type.
//!
//! Read handlers return the cached payload string verbatim; write handlers
//! build their envelope from the service result.

mod admin;
mod categories;
mod dashboard;
mod orders;
mod products;
mod uploads;

pub use admin::*;
pub use categories::*;
pub use dashboard::*;
pub use orders::*;
pub use products::*;
pub use uploads::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use super::error::ApiError;

/// Respond with an already-serialized JSON payload.
pub(crate) fn json_payload(status: StatusCode, payload: String) -> Response {
    let mut response = (status, payload).into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request("Invalid request body").with_detail(rejection.body_text()))
}

/// Ids that do not parse cannot name an existing row.
pub(crate) fn parse_id(raw: &str, not_found: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(not_found))
}
