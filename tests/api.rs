mod support;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use gemstore::infra::http::{self, RateLimitRules};

use support::{ADMIN_OWNER, ADMIN_PASSCODE, TestApp};

fn router(app: &TestApp) -> Router {
    http::build_router(app.state.clone())
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn authed(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("header value"),
    );
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    router(app).oneshot(request).await.expect("router response")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn unknown_routes_answer_with_json_404() {
    let app = TestApp::new();

    let response = send(&app, get("/api/v1/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Not Found"));
}

#[tokio::test]
async fn health_reflects_store_reachability() {
    let app = TestApp::new();
    assert_eq!(
        send(&app, get("/health")).await.status(),
        StatusCode::NO_CONTENT
    );

    app.store.set_healthy(false);
    assert_eq!(
        send(&app, get("/health")).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn admin_writes_require_a_session() {
    let app = TestApp::new();

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/category", json!({ "name": "Rubies" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        authed(
            json_request(Method::POST, "/api/v1/category", json!({ "name": "Rubies" })),
            "not-a-jwt",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_cookie_that_unlocks_admin_routes() {
    let app = TestApp::new();

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/login", json!({ "code": ADMIN_PASSCODE })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    let body = body_json(response).await;
    assert_eq!(body["valid"], json!(true));
    assert_eq!(body["data"]["owner"], json!(ADMIN_OWNER));

    let session = cookie.split(';').next().expect("cookie pair").to_string();
    let mut create = json_request(Method::POST, "/api/v1/category", json!({ "name": "Rubies" }));
    create
        .headers_mut()
        .insert(header::COOKIE, session.parse().expect("cookie header"));
    let response = send(&app, create).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["slug"], json!("rubies"));

    let response = send(&app, get("/api/v1/categories")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], json!("Rubies"));
}

#[tokio::test]
async fn wrong_passcode_is_refused() {
    let app = TestApp::new();

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/login", json!({ "code": "guess" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid passcode"));

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/login", json!({ "code": "  " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn current_admin_reads_bearer_session() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let response = send(&app, authed(get("/api/v1/admin"), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["owner"], json!(ADMIN_OWNER));

    let response = send(&app, get("/api/v1/admin")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let response = send(
        &app,
        authed(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/logout")
                .body(Body::empty())
                .expect("request"),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("removal cookie");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn logout_without_session_still_clears_cookie() {
    let app = TestApp::new();

    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/logout")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("removal cookie");
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/"));
}

#[tokio::test]
async fn duplicate_category_name_is_bad_request() {
    let app = TestApp::new();
    app.category("Rubies").await;
    let token = app.admin_token().await;

    let response = send(
        &app,
        authed(
            json_request(Method::POST, "/api/v1/category", json!({ "name": " rubies " })),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        json!("Category with name \"rubies\" already exists. Try a different name")
    );
}

#[tokio::test]
async fn category_pages_echo_clamped_pagination() {
    let app = TestApp::new();
    let rings = app.category("Rings").await;
    app.product("Ruby Ring", Some(&rings)).await;

    let response = send(&app, get("/api/v1/category/rings?page=0&limit=500")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["page"], json!(1));
    assert_eq!(body["limit"], json!(100));
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["data"]["products"][0]["slug"], json!("ruby-ring"));

    let response = send(&app, get("/api/v1/category/unknown")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_are_placed_publicly_and_read_by_admins() {
    let app = TestApp::new();
    let product = app.product("Jade Pendant", None).await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/order",
            json!({
                "name": "Grace",
                "address": "2 Quartz Lane",
                "telephone": "0456",
                "email": "grace@example.com",
                "deliveryMethod": "pickup",
                "items": [{ "productId": product.id, "unitPrice": 45.5, "quantity": 2 }]
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let order_id = body["data"]["id"].as_str().expect("order id").to_string();
    assert!(
        body["data"]["orderId"]
            .as_str()
            .is_some_and(|code| code.starts_with("ORDER-"))
    );

    assert_eq!(
        send(&app, get("/api/v1/orders")).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let token = app.admin_token().await;
    let response = send(
        &app,
        authed(
            json_request(
                Method::PATCH,
                &format!("/api/v1/order/{order_id}/status"),
                json!({ "status": "delivered" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get(&format!("/api/v1/order/{order_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("delivered"));
    assert_eq!(body["data"]["items"][0]["quantity"], json!(2));
}

#[tokio::test]
async fn malformed_ids_read_as_not_found() {
    let app = TestApp::new();

    let response = send(&app, get("/api/v1/order/not-a-uuid")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_writes_hit_their_own_limit() {
    let app = TestApp::with_limits(RateLimitRules::new(15, 5));

    for attempt in 0..5 {
        let response = send(
            &app,
            json_request(Method::POST, "/api/v1/product", json!({})),
        )
        .await;
        assert_ne!(
            response.status(),
            StatusCode::TOO_MANY_REQUESTS,
            "attempt {attempt} limited too early"
        );
    }

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/product", json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(header::RETRY_AFTER).is_some());
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn reads_are_not_counted_against_the_write_budget() {
    let app = TestApp::with_limits(RateLimitRules::new(3, 3));
    app.product("Ruby Ring", None).await;

    for _ in 0..10 {
        let response = send(&app, get("/api/v1/products")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn limiter_fails_open_when_cache_is_down() {
    let app = TestApp::with_limits(RateLimitRules::new(2, 2));
    app.cache.set_available(false);

    for _ in 0..6 {
        let response = send(
            &app,
            json_request(Method::POST, "/api/v1/login", json!({ "code": "guess" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn dashboard_metrics_sum_order_lines() {
    let app = TestApp::new();
    let product = app.product("Jade Pendant", None).await;
    app.orders
        .place_order(gemstore::application::orders::CreateOrderCommand {
            name: Some("Grace".into()),
            address: Some("2 Quartz Lane".into()),
            telephone: Some("0456".into()),
            email: Some("grace@example.com".into()),
            note: None,
            delivery_method: Some("delivery".into()),
            items: vec![gemstore::application::orders::OrderItemInput {
                product_id: Some(product.id.to_string()),
                unit_price: Some(rust_decimal::Decimal::new(4550, 2)),
                quantity: Some(2),
            }],
        })
        .await
        .expect("place order");
    let token = app.admin_token().await;

    let response = send(&app, authed(get("/api/v1/metrics"), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["totalProducts"], json!(1));
    assert_eq!(body["data"]["pendingOrders"], json!(1));
    assert_eq!(body["data"]["totalSales"], json!("91.00"));

    let response = send(&app, authed(get("/api/v1/sales?period=year"), &token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
