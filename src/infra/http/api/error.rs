use axum::Json;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};

use crate::application::admin::AdminAuthError;
use crate::application::categories::CategoryError;
use crate::application::dashboard::DashboardError;
use crate::application::error::ErrorReport;
use crate::application::orders::OrderError;
use crate::application::payload::MessageEnvelope;
use crate::application::products::ProductError;
use crate::application::repos::RepoError;
use crate::application::storage::ObjectStorageError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const UPLOAD: &str = "upload_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const INTERNAL: &str = "internal_error";
}

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests – slow down, champ 🐢";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error response rendered as `{ "success": false, "message": ... }`.
///
/// `detail` never reaches the client; it travels in the attached
/// [`ErrorReport`] for the response logger.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            INTERNAL_MESSAGE,
        )
        .with_detail(detail)
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MessageEnvelope::failure(RATE_LIMITED_MESSAGE)),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("{}: retry_after={retry_after}", codes::RATE_LIMITED),
        )
        .attach(&mut response);
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(MessageEnvelope::failure(&self.message)),
        )
            .into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!(
                "{}: {}",
                self.code,
                self.detail.as_deref().unwrap_or(&self.message)
            ),
        )
        .attach(&mut response);
        response
    }
}

pub fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("Not Found"),
        RepoError::Timeout => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::DB_TIMEOUT,
            INTERNAL_MESSAGE,
        )
        .with_detail("database timeout"),
        other => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            INTERNAL_MESSAGE,
        )
        .with_detail(other.to_string()),
    }
}

fn upload_to_api(err: ObjectStorageError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        codes::UPLOAD,
        "Image upload failed: please try again",
    )
    .with_detail(err.to_string())
}

pub fn category_to_api(err: CategoryError) -> ApiError {
    match err {
        CategoryError::BadRequest(message) => ApiError::bad_request(message),
        CategoryError::NotFound(message) => ApiError::not_found(message),
        CategoryError::Repo(err) => repo_to_api(err),
        CategoryError::Encode(err) => ApiError::internal(err.to_string()),
    }
}

pub fn product_to_api(err: ProductError) -> ApiError {
    match err {
        ProductError::BadRequest(message) => ApiError::bad_request(message),
        ProductError::NotFound(message) => ApiError::not_found(message),
        ProductError::Upload(err) => upload_to_api(err),
        ProductError::Repo(err) => repo_to_api(err),
        err @ (ProductError::CodesExhausted(_) | ProductError::Encode(_)) => {
            ApiError::internal(err.to_string())
        }
    }
}

pub fn order_to_api(err: OrderError) -> ApiError {
    match err {
        OrderError::BadRequest(message) => ApiError::bad_request(message),
        OrderError::NotFound(message) => ApiError::not_found(message),
        OrderError::Repo(err) => repo_to_api(err),
        err @ (OrderError::CodesExhausted(_) | OrderError::Encode(_)) => {
            ApiError::internal(err.to_string())
        }
    }
}

pub fn admin_to_api(err: AdminAuthError) -> ApiError {
    match err {
        err @ AdminAuthError::MissingPasscode => ApiError::bad_request(err.to_string()),
        err @ (AdminAuthError::InvalidPasscode | AdminAuthError::MissingToken) => {
            ApiError::unauthorized(err.to_string())
        }
        AdminAuthError::InvalidToken(source) => {
            ApiError::unauthorized("Invalid admin token").with_detail(source.to_string())
        }
        err @ AdminAuthError::NotFound => ApiError::not_found(err.to_string()),
        AdminAuthError::Repo(err) => repo_to_api(err),
        err @ (AdminAuthError::Issue(_) | AdminAuthError::Encode(_)) => {
            ApiError::internal(err.to_string())
        }
    }
}

pub fn dashboard_to_api(err: DashboardError) -> ApiError {
    match err {
        DashboardError::BadRequest(message) => ApiError::bad_request(message),
        DashboardError::Repo(err) => repo_to_api(err),
    }
}
