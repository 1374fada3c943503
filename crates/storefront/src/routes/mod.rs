//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home: featured products, categories, vehicle selector
//! GET  /categories                    - Category grid
//! GET  /search                        - Catalog with filters and sort
//! GET  /search/more                   - Next page of results (HTMX, infinite scroll)
//! GET  /product/{id}                  - Product detail
//!
//! # Cart (HTMX fragments, redirects without JS)
//! GET  /cart                          - Cart page
//! GET  /cart/count                    - Header badge
//! POST /cart/add | update | remove | delivery | clear
//!
//! # Checkout
//! GET  /checkout                      - Start (or resume after login) the wizard
//! POST /checkout/guest | login | contact | address | pay | restart
//! GET  /checkout/status/{order_id}    - Payment status (HTMX polling)
//!
//! # Favorites and vehicle
//! GET  /favorites
//! POST /favorites/toggle | clear
//! POST /vehicle/select | clear | save
//! POST /vehicle/saved/{index}/select | remove
//! GET  /vehicle/models?make=          - Model options (HTMX)
//!
//! # Account
//! GET|POST /auth/login
//! GET|POST /auth/register             - Staged: details, phone, password
//! POST /auth/logout
//! GET|POST /profile
//! GET  /orders
//! GET  /orders/{order_number}
//! POST /orders/{order_number}/pay     - Resend the M-Pesa prompt
//!
//! # Owner admin
//! GET  /admin
//! GET  /admin/orders
//! POST /admin/orders/{id}/status
//! GET|POST /admin/products
//! POST /admin/products/{id}
//! POST /admin/products/{id}/delete
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favorites;
pub mod home;
pub mod page;
pub mod vehicle;
pub mod views;

pub use page::{PageContext, is_htmx};

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, payment_rate_limiter};
use crate::state::AppState;

/// A `<select>` option with its selected flag worked out in Rust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
            selected,
        }
    }
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/search", get(catalog::search))
        .route("/search/more", get(catalog::search_more))
        .route("/product/{id}", get(catalog::product))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/delivery", post(cart::delivery))
        .route("/clear", post(cart::clear))
}

pub fn checkout_routes() -> Router<AppState> {
    let pay = Router::new()
        .route("/pay", post(checkout::pay))
        .layer(payment_rate_limiter());

    Router::new()
        .route("/", get(checkout::show))
        .route("/guest", post(checkout::guest))
        .route("/login", post(checkout::login))
        .route("/contact", post(checkout::contact))
        .route("/address", post(checkout::address))
        .route("/restart", post(checkout::restart))
        .route("/status/{order_id}", get(checkout::payment_status))
        .merge(pay)
}

pub fn favorites_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::show))
        .route("/toggle", post(favorites::toggle))
        .route("/clear", post(favorites::clear))
}

pub fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route("/select", post(vehicle::select))
        .route("/clear", post(vehicle::clear))
        .route("/save", post(vehicle::save))
        .route("/saved/{index}/select", post(vehicle::select_saved))
        .route("/saved/{index}/remove", post(vehicle::remove_saved))
        .route("/models", get(vehicle::models))
}

pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

pub fn account_routes() -> Router<AppState> {
    let pay = Router::new()
        .route("/orders/{order_number}/pay", post(account::pay_order))
        .layer(payment_rate_limiter());

    Router::new()
        .route("/profile", get(account::profile).post(account::update_profile))
        .route("/orders", get(account::orders))
        .route("/orders/{order_number}", get(account::order_detail))
        .merge(pay)
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::update_order_status))
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/delete", post(admin::delete_product))
}

/// All page and fragment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(catalog_routes())
        .merge(account_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/favorites", favorites_routes())
        .nest("/vehicle", vehicle_routes())
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}
