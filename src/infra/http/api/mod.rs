pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::{ApiState, SessionCookieSettings};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{MethodRouter, get, patch, post},
};

use self::middleware::{RateGate, rate_limit, require_admin};
use self::rate_limit::RateLimitRule;

/// Routes mounted under `/api/v1`.
///
/// Paths shared by public reads and admin writes use one parameter name,
/// so `{key}` is a slug for GET and an id for PATCH/DELETE where noted.
pub fn build_api_router(state: ApiState) -> Router {
    let router_state = state.clone();
    let rules = state.rate_rules;
    let guarded = |route: MethodRouter<ApiState>| admin_only(&state, route);
    let limited = |route: MethodRouter<ApiState>, rule: RateLimitRule| {
        route.layer(axum_middleware::from_fn_with_state(
            RateGate::new(state.rate_limiter.clone(), rule),
            rate_limit,
        ))
    };

    Router::new()
        .route("/categories", get(handlers::list_categories))
        .route("/category", guarded(post(handlers::create_category)))
        .route(
            "/category/{key}",
            get(handlers::category_page).merge(guarded(
                patch(handlers::rename_category).delete(handlers::delete_category),
            )),
        )
        .route("/products", get(handlers::list_products))
        .route(
            "/product",
            limited(
                guarded(post(handlers::create_product)),
                rules.product,
            )
            .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route(
            "/product/{key}",
            get(handlers::get_product).merge(
                limited(
                    guarded(
                        patch(handlers::update_product).delete(handlers::delete_product),
                    ),
                    rules.product,
                )
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
            ),
        )
        .route("/order", post(handlers::place_order))
        .route("/orders", guarded(get(handlers::list_orders)))
        .route(
            "/order/{id}",
            get(handlers::get_order).merge(guarded(
                axum::routing::delete(handlers::delete_order),
            )),
        )
        .route(
            "/order/{id}/status",
            guarded(patch(handlers::update_order_status)),
        )
        .route("/login", limited(post(handlers::login), rules.auth))
        .route("/logout", post(handlers::logout))
        .route("/admin", get(handlers::current_admin))
        .route(
            "/metrics",
            limited(guarded(get(handlers::metrics)), rules.orders),
        )
        .route(
            "/sales",
            limited(guarded(get(handlers::sales)), rules.orders),
        )
        .layer(axum_middleware::from_fn_with_state(
            RateGate::writes(state.rate_limiter.clone(), rules.global),
            rate_limit,
        ))
        .with_state(router_state)
}

fn admin_only(state: &ApiState, route: MethodRouter<ApiState>) -> MethodRouter<ApiState> {
    route.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        require_admin,
    ))
}
