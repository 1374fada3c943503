//! Typed request and response bodies for the AutoParts REST API.
//!
//! Responses are validated here, at the boundary: a body that does not match
//! these shapes becomes [`ApiError::Decode`](super::ApiError::Decode) instead
//! of leaking loosely-typed JSON into handlers.
//!
//! Order amounts are exposed as `total_amount` and `delivery_cost`; older API
//! builds send `total` and `delivery_fee`, which are accepted as aliases.

use autoparts_core::{
    AddressType, CategoryId, DeliveryTier, Ksh, MakeId, ModelId, OrderId, OrderStatus,
    PaymentStatus, ProductId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

const fn default_true() -> bool {
    true
}

// =============================================================================
// Pagination
// =============================================================================

/// A page of results in the API's standard envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// An empty page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Some list endpoints return a bare array and others the paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListOrPage<T> {
    Page(Paginated<T>),
    List(Vec<T>),
}

impl<T> ListOrPage<T> {
    /// Flatten into a plain list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page(page) => page.results,
            Self::List(list) => list,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// Credentials posted to `/users/token/`.
///
/// The API accepts either an email or a username in the `username` field.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Access and refresh tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// Body returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

impl LoginResponse {
    /// Split into the token pair and the user.
    #[must_use]
    pub fn into_parts(self) -> (AuthTokens, User) {
        (
            AuthTokens {
                access: self.access,
                refresh: self.refresh,
            },
            self.user,
        )
    }
}

/// Body posted to `/users/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Body posted to `/users/token/refresh/`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

/// Body returned by `/users/token/refresh/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
}

impl User {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }

    /// First and last name joined, falling back to the username.
    #[must_use]
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Profile attached to a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
}

/// Body returned by `GET /users/profile/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub saved_vehicles: Vec<SavedVehicleSummary>,
    #[serde(default)]
    pub saved_addresses: Vec<SavedAddressSummary>,
}

/// Vehicle saved on the account.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedVehicleSummary {
    pub id: i64,
    pub make_name: String,
    pub model_name: String,
    pub year: i32,
    #[serde(default)]
    pub is_primary: bool,
}

/// Address saved on the account.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedAddressSummary {
    pub id: i64,
    #[serde(default)]
    pub address_type: AddressType,
    pub street_address: String,
    pub city: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Body sent with `PATCH /users/profile/`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A vehicle manufacturer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleMake {
    pub id: MakeId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub models_count: Option<u32>,
}

/// A vehicle model with its production years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleModel {
    pub id: ModelId,
    #[serde(default)]
    pub make: Option<VehicleMake>,
    #[serde(default)]
    pub make_id: Option<MakeId>,
    pub name: String,
    pub year_from: i32,
    pub year_to: i32,
    #[serde(default)]
    pub engine_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VehicleModel {
    /// Production years, newest first.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        (self.year_from..=self.year_to).rev()
    }

    /// `2010-2018`, or a single year.
    #[must_use]
    pub fn year_range(&self) -> String {
        if self.year_from == self.year_to {
            self.year_from.to_string()
        } else {
            format!("{}-{}", self.year_from, self.year_to)
        }
    }

    /// `Toyota Corolla`, or just the model name when the make is not embedded.
    #[must_use]
    pub fn label(&self) -> String {
        self.make.as_ref().map_or_else(
            || self.name.clone(),
            |make| format!("{} {}", make.name, self.name),
        )
    }
}

/// A product category, possibly with children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub children: Vec<Self>,
    #[serde(default)]
    pub products_count: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

/// A gallery image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: i64,
    pub image: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub sku: String,
    pub price: Ksh,
    #[serde(default)]
    pub cost_price: Option<Ksh>,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub reserved_stock: i64,
    #[serde(default)]
    pub available_stock: Option<i64>,
    #[serde(default)]
    pub discounted_price: Option<Ksh>,
    #[serde(default)]
    pub profit_margin: Option<f64>,
    #[serde(default)]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub compatible_vehicles: Vec<VehicleModel>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub sales_count: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Units that can still be ordered.
    #[must_use]
    pub fn available(&self) -> i64 {
        self.available_stock
            .unwrap_or(self.stock - self.reserved_stock)
            .max(0)
    }

    /// Whether at least one unit can be ordered.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.available() > 0
    }

    /// Whether a discount applies.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_percentage > Decimal::ZERO
    }

    /// Price the customer pays per unit.
    #[must_use]
    pub fn effective_price(&self) -> Ksh {
        self.discounted_price
            .unwrap_or_else(|| self.price.discounted(self.discount_percentage))
    }

    /// Name of the category, if embedded.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    /// Primary image, falling back to the first gallery image.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.primary_image
            .as_deref()
            .or_else(|| self.images.first().map(|img| img.image.as_str()))
    }
}

// =============================================================================
// Orders
// =============================================================================

/// One line of a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body posted to `/orders/checkout/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub delivery_type: DeliveryTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
}

/// Body returned by `/orders/checkout/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub id: OrderId,
    pub order_number: String,
    pub subtotal: Ksh,
    #[serde(alias = "delivery_fee")]
    pub delivery_cost: Ksh,
    #[serde(alias = "total")]
    pub total_amount: Ksh,
    #[serde(default, alias = "status")]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub product_name: String,
    #[serde(default)]
    pub sku: String,
    pub unit_price: Ksh,
    pub quantity: u32,
    pub line_total: Ksh,
}

/// A placed order, as returned by the order endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub guest_email: Option<String>,
    #[serde(default)]
    pub guest_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_city: String,
    #[serde(default)]
    pub delivery_postal_code: String,
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_phone: String,
    pub subtotal: Ksh,
    #[serde(alias = "delivery_fee")]
    pub delivery_cost: Ksh,
    #[serde(alias = "total")]
    pub total_amount: Ksh,
    #[serde(default, alias = "status")]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub customer_notes: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub item_count: Option<u32>,
}

impl Order {
    /// Number of units, preferring the API's count.
    #[must_use]
    pub fn units(&self) -> u32 {
        self.item_count
            .unwrap_or_else(|| self.items.iter().map(|item| item.quantity).sum())
    }

    /// Email to contact the customer on.
    #[must_use]
    pub fn contact_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or(self.guest_email.as_deref())
    }
}

/// Query parameters for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

// =============================================================================
// Payments
// =============================================================================

/// Body posted to `/payments/initiate-stk-push/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StkPushRequest {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Whole shillings; M-Pesa rejects fractional amounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

/// Body returned by `/payments/initiate-stk-push/`.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub merchant_request_id: Option<String>,
    #[serde(default)]
    pub checkout_request_id: Option<String>,
    #[serde(default)]
    pub response_code: Option<String>,
    #[serde(default)]
    pub response_description: Option<String>,
}

/// Body returned by `/payments/check-status/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    pub order_id: OrderId,
    pub order_number: String,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(alias = "total")]
    pub total_amount: Ksh,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Admin
// =============================================================================

/// Headline numbers for the owner dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardSummary {
    pub total_revenue: Ksh,
    pub total_orders: u64,
    pub orders_today: u64,
    pub total_products: u64,
    pub low_stock_items: u64,
}

/// Revenue over rolling periods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenuePeriod {
    pub today: Ksh,
    pub week: Ksh,
    pub month: Ksh,
}

/// Body returned by `/analytics/revenue/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueAnalytics {
    pub period: RevenuePeriod,
    pub average_order_value: Ksh,
    pub paid_orders_count: u64,
}

/// A best-selling product.
#[derive(Debug, Clone, Deserialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub quantity_sold: u64,
    pub revenue: Ksh,
}

/// A product running low on stock.
#[derive(Debug, Clone, Deserialize)]
pub struct LowStockAlert {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub current_stock: i64,
    #[serde(default)]
    pub reserved_stock: i64,
    pub available_stock: i64,
    #[serde(default)]
    pub category: String,
}

/// One bucket of a status distribution.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusBucket {
    #[serde(alias = "order_status", alias = "payment_status")]
    pub status: String,
    pub count: u64,
}

/// Margin for a single product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfitLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub revenue: Ksh,
    pub cost: Ksh,
    pub profit: Ksh,
    pub profit_margin_percent: f64,
}

/// Body sent with `PATCH /orders/admin/orders/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusUpdate {
    pub order_status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

/// Body for creating or patching a product.
///
/// On update, absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
