use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::infra::auth::{SESSION_COOKIE, bearer_token};

use super::error::{ApiError, admin_to_api};
use super::rate_limit::{RateLimitRule, RateLimiter};
use super::state::ApiState;

/// Admin id of an authenticated request.
#[derive(Debug, Clone, Copy)]
pub struct AdminIdentity(pub Uuid);

/// Session token from the `token` cookie, else a bearer header.
pub fn session_token(request_headers: &axum::http::HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(request_headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }
    request_headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
}

pub async fn require_admin(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = session_token(request.headers());
    match state.admin.authorize(token.as_deref()) {
        Ok(admin_id) => {
            request.extensions_mut().insert(AdminIdentity(admin_id));
            let mut response = next.run(request).await;
            response.extensions_mut().insert(AdminIdentity(admin_id));
            response
        }
        Err(err) => admin_to_api(err).into_response(),
    }
}

/// Limiter plus the rule of the route group it guards.
#[derive(Clone)]
pub struct RateGate {
    limiter: RateLimiter,
    rule: RateLimitRule,
    writes_only: bool,
}

impl RateGate {
    pub fn new(limiter: RateLimiter, rule: RateLimitRule) -> Self {
        Self {
            limiter,
            rule,
            writes_only: false,
        }
    }

    /// Gate that lets reads through uncounted.
    pub fn writes(limiter: RateLimiter, rule: RateLimitRule) -> Self {
        Self {
            writes_only: true,
            ..Self::new(limiter, rule)
        }
    }
}

pub async fn rate_limit(
    State(gate): State<RateGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if gate.writes_only && is_read(request.method()) {
        return next.run(request).await;
    }

    let client_ip = client_ip(&request);
    let decision = gate
        .limiter
        .check(gate.rule, &client_ip, request.uri().path())
        .await;
    if decision.is_limited() {
        return ApiError::rate_limited(gate.limiter.retry_after_secs());
    }

    next.run(request).await
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn client_ip(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
