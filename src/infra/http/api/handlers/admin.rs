//! Admin session handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header::CACHE_CONTROL};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::payload::MessageEnvelope;
use crate::infra::auth::SESSION_COOKIE;
use crate::infra::http::api::error::{ApiError, admin_to_api};
use crate::infra::http::api::middleware::session_token;
use crate::infra::http::api::models::{LoginRequest, LoginResponse};
use crate::infra::http::api::state::{ApiState, SessionCookieSettings};

use super::{json_body, json_payload};

fn session_cookie(settings: SessionCookieSettings, value: String) -> Cookie<'static> {
    // Cross-site SameSite=None is only honoured on secure cookies.
    let same_site = if settings.secure {
        SameSite::None
    } else {
        SameSite::Lax
    };
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(same_site)
        .build()
}

pub async fn login(
    State(state): State<ApiState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let session = state
        .admin
        .login(request.code.as_deref())
        .await
        .map_err(admin_to_api)?;

    let mut cookie = session_cookie(state.session, session.token.clone());
    cookie.set_max_age(state.admin.tokens().ttl());

    Ok((
        jar.add(cookie),
        [(CACHE_CONTROL, "no-store")],
        Json(LoginResponse {
            success: true,
            valid: true,
            message: "Access granted",
            data: session,
        }),
    ))
}

pub async fn logout(
    State(state): State<ApiState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let token = session_token(&headers);
    state.admin.logout(token.as_deref()).await;

    // Sent unconditionally: the session may have come in as a Bearer token.
    let mut expired = session_cookie(state.session, String::new());
    expired.make_removal();

    (
        jar.add(expired),
        [(CACHE_CONTROL, "no-store")],
        Json(MessageEnvelope::ok("Logout successful")),
    )
}

pub async fn current_admin(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = session_token(&headers);
    let payload = state
        .admin
        .current_admin(token.as_deref())
        .await
        .map_err(admin_to_api)?;
    Ok(json_payload(StatusCode::OK, payload))
}
