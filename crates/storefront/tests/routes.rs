//! Route tests through the full middleware stack.
//!
//! Sessions use `MemoryStore` and the pool connects lazily, so no database is
//! needed. API calls go to an in-process stub of the REST API, built per test.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use autoparts_storefront::config::{ApiConfig, SentryConfig, StorefrontConfig};
use autoparts_storefront::middleware::session_layer;
use autoparts_storefront::app;
use autoparts_storefront::state::AppState;
use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

// =============================================================================
// Harness
// =============================================================================

async fn stub_product(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "id": id,
        "name": "Oil filter",
        "sku": "of-1",
        "price": 850,
        "stock": if id == 9 { 0 } else { 10 }
    }))
    .into_response()
}

async fn stub_login() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "No active account found with the given credentials"})),
    )
        .into_response()
}

/// Product detail only; tests add the endpoints they need.
fn catalog_api() -> Router {
    Router::new().route("/api/v1/products/products/{id}/", get(stub_product))
}

/// Login, profile and nothing else: signs in an owner.
fn owner_api() -> Router {
    Router::new()
        .route(
            "/api/v1/users/token/",
            post(|| async {
                Json(json!({
                    "access": "access-1",
                    "refresh": "refresh-1",
                    "user": {"id": 5, "username": "wanjiku", "email": "wanjiku@example.com"}
                }))
            }),
        )
        .route(
            "/api/v1/users/profile/",
            get(|| async { Json(json!({"phone_number": "254722123456", "is_owner": true})) }),
        )
}

/// Start the API stub and return its `/api/v1` base URL.
async fn spawn_api(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

async fn test_app() -> Router {
    test_app_with(catalog_api().route("/api/v1/users/token/", post(stub_login))).await
}

async fn test_app_with(api: Router) -> Router {
    let api_url = spawn_api(api).await;
    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/autoparts_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("Zq8#rT2!vL9@wX4$kP7%mN3^bH6&jF1*"),
        api: ApiConfig::new(&api_url, Duration::from_secs(5)).unwrap(),
        sentry: SentryConfig::default(),
    };
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/autoparts_test")
        .unwrap();
    let state = AppState::new(config, pool).unwrap();
    app(state, session_layer(MemoryStore::default(), false))
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("autoparts_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn page_get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Sign in through the login form and return the new session cookie.
async fn sign_in_owner(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(form_post(
            "/auth/login",
            "username=wanjiku&password=secret&next=%2Fadmin",
            None,
        ))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/admin");
    session_cookie(&response).unwrap()
}

/// Post a checkout step and return the rendered page.
async fn checkout_step(app: &Router, uri: &str, body: &str, cookie: &str) -> String {
    let response = app
        .clone()
        .oneshot(form_post(uri, body, Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "{uri}");
    body_text(response).await
}

/// Fill the cart, then walk guest checkout up to the payment step.
async fn guest_checkout_to_payment(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(form_post("/cart/add", "product_id=3&quantity=2", None))
        .await
        .unwrap();
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .clone()
        .oneshot(page_get("/checkout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = checkout_step(app, "/checkout/guest", "", &cookie).await;
    assert!(html.contains("name=\"email\""));

    let html = checkout_step(
        app,
        "/checkout/contact",
        "email=amina%40example.com&phone=0722+123+456",
        &cookie,
    )
    .await;
    assert!(html.contains("name=\"recipient_name\""));

    let html = checkout_step(
        app,
        "/checkout/address",
        "recipient_name=Amina+Otieno&recipient_phone=0711222333&delivery_address=Moi+Avenue+12\
         &delivery_city=Nairobi&postal_code=00100&delivery_type=express",
        &cookie,
    )
    .await;
    assert!(html.contains("name=\"mpesa_phone\""));
    cookie
}

// =============================================================================
// Infrastructure
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let response = app.oneshot(page_get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_pages_carry_security_headers_and_nonce() {
    let app = test_app().await;
    let response = app.oneshot(page_get("/cart", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let csp = response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(csp.contains("'nonce-"));
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert!(response.headers().contains_key("x-request-id"));

    let nonce = csp
        .split("'nonce-")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap()
        .to_string();
    let html = body_text(response).await;
    assert!(html.contains(&format!("nonce=\"{nonce}\"")));
    assert!(html.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = test_app().await;
    let response = app.oneshot(page_get("/no-such-page", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Back to the shop"));
}

// =============================================================================
// Access control
// =============================================================================

#[tokio::test]
async fn test_account_pages_redirect_to_login() {
    let app = test_app().await;
    let response = app.oneshot(page_get("/orders", None)).await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login?next=%2Forders");
}

#[tokio::test]
async fn test_admin_requires_owner() {
    let app = test_app().await;
    let response = app.oneshot(page_get("/admin/products", None)).await.unwrap();
    assert!(response.status().is_redirection());
    assert!(location(&response).starts_with("/auth/login"));
}

#[tokio::test]
async fn test_checkout_with_empty_cart_returns_to_cart() {
    let app = test_app().await;
    let response = app.oneshot(page_get("/checkout", None)).await.unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/cart");
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_add_to_cart_then_badge_and_checkout() {
    let app = test_app().await;

    let mut add = form_post("/cart/add", "product_id=3&quantity=2", None);
    add.headers_mut().insert("hx-request", "true".parse().unwrap());
    let response = app.clone().oneshot(add).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("hx-trigger").unwrap(), "cart-updated");
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .clone()
        .oneshot(page_get("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert!(body_text(response).await.contains(">2</span>"));

    let response = app
        .clone()
        .oneshot(page_get("/checkout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("id=\"checkout-step\""));
    assert!(html.contains("Continue as guest"));

    let response = app
        .oneshot(form_post("/checkout/guest", "", Some(&cookie)))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert!(html.contains("name=\"email\""));
}

#[tokio::test]
async fn test_out_of_stock_product_is_not_added() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(form_post("/cart/add", "product_id=9", None))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/product/9");
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .oneshot(page_get("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert!(body_text(response).await.contains(">0</span>"));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let app = test_app().await;
    let response = app
        .oneshot(form_post("/cart/add", "product_id=404", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_bad_credentials_rerender_login() {
    let app = test_app().await;
    let response = app
        .oneshot(form_post(
            "/auth/login",
            "username=wanjiku&password=wrong&next=%2Fcheckout",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Invalid username or password"));
    assert!(html.contains("value=\"/checkout\""));
}

#[tokio::test]
async fn test_register_moves_to_phone_stage() {
    let app = test_app().await;
    let response = app
        .oneshot(form_post(
            "/auth/register",
            "stage=details&username=wanjiku&email=wanjiku%40example.com&first_name=Wanjiku",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Step 2 of 3"));
    assert!(html.contains("name=\"phone_number\""));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_guest_checkout_places_order_and_clears_cart() {
    let pushes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pushes);
    let api = catalog_api()
        .route(
            "/api/v1/orders/checkout/",
            post(|| async {
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "id": 101,
                        "order_number": "AP-2026-0101",
                        "subtotal": 1700,
                        "delivery_cost": 3000,
                        "total_amount": 4700,
                        "status": "pending",
                        "created_at": "2026-10-17T09:00:00Z"
                    })),
                )
            }),
        )
        .route(
            "/api/v1/payments/initiate-stk-push/",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({"success": true, "checkout_request_id": "ws_CO_101"})) }
            }),
        );
    let app = test_app_with(api).await;
    let cookie = guest_checkout_to_payment(&app).await;

    let html = checkout_step(&app, "/checkout/pay", "mpesa_phone=0722123456", &cookie).await;
    assert!(html.contains("Order AP-2026-0101 placed"));
    assert!(html.contains("Check your phone"));
    assert!(html.contains("Expected 17 Oct 26 - 18 Oct 26"));
    assert_eq!(pushes.load(Ordering::SeqCst), 1);

    let response = app
        .clone()
        .oneshot(page_get("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert!(body_text(response).await.contains(">0</span>"));

    // A fresh line shows no delivery carried over from the placed order.
    app.clone()
        .oneshot(form_post("/cart/add", "product_id=3", Some(&cookie)))
        .await
        .unwrap();
    let response = app.oneshot(page_get("/cart", Some(&cookie))).await.unwrap();
    assert!(body_text(response).await.contains("Delivery (Choose at checkout)"));
}

#[tokio::test]
async fn test_failed_order_returns_to_payment_with_error() {
    let api = catalog_api().route(
        "/api/v1/orders/checkout/",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Only 1 left in stock for Oil filter."})),
            )
        }),
    );
    let app = test_app_with(api).await;
    let cookie = guest_checkout_to_payment(&app).await;

    let html = checkout_step(&app, "/checkout/pay", "mpesa_phone=0722123456", &cookie).await;
    assert!(html.contains("Only 1 left in stock for Oil filter. Please try again."));
    assert!(html.contains("name=\"mpesa_phone\""));
    assert!(html.contains("value=\"0722 123456\""));

    let response = app
        .oneshot(page_get("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert!(body_text(response).await.contains(">2</span>"));
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_dashboard_refreshes_once_then_signs_out() {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&refreshes);
    let mut api = owner_api()
        .route(
            "/api/v1/analytics/dashboard/",
            get(|| async {
                Json(json!({
                    "total_revenue": 125000,
                    "total_orders": 40,
                    "orders_today": 3,
                    "total_products": 120,
                    "low_stock_items": 4
                }))
            }),
        )
        .route(
            "/api/v1/users/token/refresh/",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::UNAUTHORIZED }
            }),
        );
    for section in [
        "revenue",
        "top-products",
        "low-stock",
        "order-status",
        "payment-status",
        "profit",
    ] {
        api = api.route(
            &format!("/api/v1/analytics/{section}/"),
            get(|| async { StatusCode::UNAUTHORIZED }),
        );
    }
    let app = test_app_with(api).await;
    let cookie = sign_in_owner(&app).await;

    let response = app
        .clone()
        .oneshot(page_get("/admin", Some(&cookie)))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert!(location(&response).starts_with("/auth/login"));
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    // The sign-out was saved, so the next visit never reaches the API.
    let response = app.oneshot(page_get("/admin", Some(&cookie))).await.unwrap();
    assert_eq!(location(&response), "/auth/login?next=%2Fadmin");
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_admin_products_page_renders_forms() {
    let api = owner_api()
        .route(
            "/api/v1/products/products/",
            get(|| async {
                Json(json!({
                    "count": 1,
                    "next": null,
                    "previous": null,
                    "results": [{
                        "id": 3,
                        "name": "Oil filter",
                        "sku": "of-1",
                        "price": 850,
                        "cost_price": 600,
                        "stock": 12,
                        "category_id": 2
                    }]
                }))
            }),
        )
        .route(
            "/api/v1/products/categories/",
            get(|| async { Json(json!([{"id": 2, "name": "Filters", "slug": "filters"}])) }),
        );
    let app = test_app_with(api).await;
    let cookie = sign_in_owner(&app).await;

    let response = app
        .oneshot(page_get("/admin/products", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Create product"));
    assert!(html.contains("action=\"/admin/products/3\""));
    assert!(html.contains("value=\"of-1\""));
    assert!(html.contains(">Filters</option>"));
}

// =============================================================================
// Load more
// =============================================================================

#[tokio::test]
async fn test_duplicate_load_more_without_session_is_dropped() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fetches);
    let api = catalog_api().route(
        "/api/v1/products/products/",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({
                    "count": 21,
                    "next": null,
                    "previous": "http://api.test/api/v1/products/products/?page=1",
                    "results": [{"id": 21, "name": "Wiper blade", "sku": "wb-21", "price": 700, "stock": 4}]
                }))
            }
        }),
    );
    let app = test_app_with(api).await;

    let load_more = || {
        Request::get("/search/more?page=2")
            .header("hx-request", "true")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::empty())
            .unwrap()
    };
    let (first, second) = tokio::join!(
        app.clone().oneshot(load_more()),
        app.clone().oneshot(load_more())
    );
    let mut statuses = [first.unwrap().status(), second.unwrap().status()];
    statuses.sort_by_key(StatusCode::as_u16);

    assert_eq!(statuses, [StatusCode::OK, StatusCode::NO_CONTENT]);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}
