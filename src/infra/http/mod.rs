pub mod api;
mod middleware;

pub use api::rate_limit::{METRIC_RATE_LIMITED, RateLimitRule, RateLimitRules, RateLimiter};
pub use api::{ApiState, SessionCookieSettings, build_api_router};
pub use middleware::RequestContext;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use api::error::ApiError;
use middleware::{log_responses, set_request_context};

/// Full application router: the API under `/api/v1`, stored uploads, and
/// a health probe.
pub fn build_router(state: ApiState) -> Router {
    let public = Router::new()
        .route("/uploads/{*path}", get(api::handlers::serve_upload))
        .route("/health", get(health))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", build_api_router(state))
        .merge(public)
        .fallback(not_found)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health(State(state): State<ApiState>) -> Response {
    store_health_response(state.store.ping().await)
}

fn store_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}
