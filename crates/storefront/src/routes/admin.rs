//! Owner admin panel: dashboard, order processing and product management.
//!
//! Every handler requires an owner session. Data comes from the API's owner
//! endpoints; nothing is computed here beyond presentation.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::{
    CategoryId, OrderId, OrderStatus, PaymentStatus, ProductId,
    format::{format_profit_margin, slug_to_title},
};
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::account::{StatusTab, status_tabs};
use super::views::OrderView;
use super::{PageContext, SelectOption};
use crate::api::{
    ApiClient, ApiError, Category, LowStockAlert, OrderFilters, OrderStatusUpdate, Product,
    ProductInput, ProductQuery, ProfitLine, RevenueAnalytics, StatusBucket, TopProduct,
};
use crate::catalog::{StockLevel, status_counts};
use crate::checkout::{FieldError, validation};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::flash;
use crate::middleware::RequireOwner;
use crate::state::AppState;
use crate::stores::{self, AuthSession};

const TOP_PRODUCTS: u32 = 5;
const PROFIT_LINES: u32 = 10;
const ADMIN_PAGE_SIZE: u32 = 25;

/// Log a failed dashboard section and show it empty.
///
/// An ended session is not a section failure: it aborts the page.
fn section<T: Default>(name: &str, result: std::result::Result<T, ApiError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::Unauthenticated) => Err(ApiError::Unauthenticated.into()),
        Err(e) => {
            tracing::warn!(section = name, error = %e, "Dashboard section unavailable");
            Ok(T::default())
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone)]
pub struct TopProductRow {
    pub name: String,
    pub sku: String,
    pub quantity: u64,
    pub revenue: String,
}

#[derive(Debug, Clone)]
pub struct LowStockRow {
    pub name: String,
    pub sku: String,
    pub available: i64,
    pub label: &'static str,
    pub badge_class: &'static str,
}

#[derive(Debug, Clone)]
pub struct ProfitRow {
    pub name: String,
    pub revenue: String,
    pub cost: String,
    pub profit: String,
    pub margin: String,
}

/// One bar of a status distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketView {
    pub label: String,
    pub count: u64,
    /// Share of the total, whole percent.
    pub percent: u64,
}

/// Label buckets and work out their share of the total.
#[must_use]
pub fn bucket_views(buckets: &[StatusBucket], label: impl Fn(&str) -> String) -> Vec<BucketView> {
    let total: u64 = buckets.iter().map(|b| b.count).sum();
    buckets
        .iter()
        .map(|bucket| BucketView {
            label: label(&bucket.status),
            count: bucket.count,
            percent: if total == 0 {
                0
            } else {
                (bucket.count * 100 + total / 2) / total
            },
        })
        .collect()
}

fn unknown_status_label(raw: &str) -> String {
    slug_to_title(&raw.replace('_', "-"))
}

fn order_status_label(raw: &str) -> String {
    OrderStatus::from_str(raw).map_or_else(|_| unknown_status_label(raw), |s| s.label().to_string())
}

fn payment_status_label(raw: &str) -> String {
    PaymentStatus::from_str(raw).map_or_else(|_| unknown_status_label(raw), |s| s.label().to_string())
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub total_revenue: String,
    pub total_orders: u64,
    pub orders_today: u64,
    pub total_products: u64,
    pub low_stock_items: u64,
    pub revenue_today: String,
    pub revenue_week: String,
    pub revenue_month: String,
    pub average_order: String,
    pub paid_orders: u64,
    pub top_products: Vec<TopProductRow>,
    pub low_stock: Vec<LowStockRow>,
    pub order_statuses: Vec<BucketView>,
    pub payment_statuses: Vec<BucketView>,
    pub profit: Vec<ProfitRow>,
}

/// Everything below the headline numbers.
struct DashboardSections {
    revenue: RevenueAnalytics,
    top: Vec<TopProduct>,
    low: Vec<LowStockAlert>,
    order_dist: Vec<StatusBucket>,
    payment_dist: Vec<StatusBucket>,
    profit: Vec<ProfitLine>,
}

/// Load the sections one after another on the same session, so a token
/// refreshed by one call is used by the next and a failed refresh stops
/// the rest.
async fn load_sections(api: &ApiClient, auth: &mut AuthSession) -> Result<DashboardSections> {
    Ok(DashboardSections {
        revenue: section("revenue", api.revenue(auth).await)?,
        top: section("top products", api.top_products(TOP_PRODUCTS, auth).await)?,
        low: section("low stock", api.low_stock(auth).await)?,
        order_dist: section("order statuses", api.order_status_distribution(auth).await)?,
        payment_dist: section(
            "payment statuses",
            api.payment_status_distribution(auth).await,
        )?,
        profit: section("profit", api.profit_analysis(PROFIT_LINES, auth).await)?,
    })
}

#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireOwner(mut auth): RequireOwner,
) -> Result<impl IntoResponse> {
    let api = state.api();
    let summary = api.dashboard(&mut auth).await;
    stores::save(&session, &auth).await?;
    let summary = summary?;

    let sections = load_sections(api, &mut auth).await;
    stores::save(&session, &auth).await?;
    let DashboardSections {
        revenue,
        top,
        low,
        order_dist,
        payment_dist,
        profit,
    } = sections?;

    Ok(DashboardTemplate {
        page,
        total_revenue: summary.total_revenue.display(),
        total_orders: summary.total_orders,
        orders_today: summary.orders_today,
        total_products: summary.total_products,
        low_stock_items: summary.low_stock_items,
        revenue_today: revenue.period.today.display(),
        revenue_week: revenue.period.week.display(),
        revenue_month: revenue.period.month.display(),
        average_order: revenue.average_order_value.display(),
        paid_orders: revenue.paid_orders_count,
        top_products: top
            .into_iter()
            .map(|p| TopProductRow {
                name: p.product_name,
                sku: p.sku,
                quantity: p.quantity_sold,
                revenue: p.revenue.display(),
            })
            .collect(),
        low_stock: low
            .into_iter()
            .map(|alert| {
                let level = StockLevel::from_available(alert.available_stock);
                LowStockRow {
                    name: alert.product_name,
                    sku: alert.sku,
                    available: alert.available_stock,
                    label: level.label(),
                    badge_class: level.badge_class(),
                }
            })
            .collect(),
        order_statuses: bucket_views(&order_dist, order_status_label),
        payment_statuses: bucket_views(&payment_dist, payment_status_label),
        profit: profit
            .into_iter()
            .map(|line| ProfitRow {
                name: line.product_name,
                revenue: line.revenue.display(),
                cost: line.cost.display(),
                profit: line.profit.display(),
                margin: format_profit_margin(Some(line.profit_margin_percent)),
            })
            .collect(),
    })
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AdminOrdersQuery {
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub payment: Option<PaymentStatus>,
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub page: Option<u32>,
}

/// An order row with the statuses it may be moved to.
#[derive(Debug, Clone)]
pub struct AdminOrderRow {
    pub order: OrderView,
    pub customer: String,
    pub transitions: Vec<SelectOption>,
}

/// Statuses an owner may move an order in `current` to.
///
/// Every other status is offered; the API decides which moves are allowed.
#[must_use]
pub fn next_statuses(current: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .iter()
        .copied()
        .filter(|&status| status != current)
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub page: PageContext,
    pub rows: Vec<AdminOrderRow>,
    pub tabs: Vec<StatusTab>,
    pub payment_options: Vec<SelectOption>,
    pub status: String,
    pub total: u64,
    pub current_page: u32,
    pub has_next: bool,
}

#[instrument(skip(state, session, page, auth))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireOwner(mut auth): RequireOwner,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<impl IntoResponse> {
    let current_page = query.page.unwrap_or(1).max(1);
    let filters = OrderFilters {
        order_status: query.status,
        payment_status: query.payment,
        page: Some(current_page),
        page_size: Some(ADMIN_PAGE_SIZE),
    };
    let fetched = state.api().admin_orders(&filters, &mut auth).await;
    stores::save(&session, &auth).await?;
    let listing = fetched?;

    let counts = status_counts(&listing.results);
    let rows = listing
        .results
        .iter()
        .map(|order| AdminOrderRow {
            order: OrderView::from(order),
            customer: if order.recipient_name.is_empty() {
                order.contact_email().unwrap_or("Guest").to_string()
            } else {
                order.recipient_name.clone()
            },
            transitions: next_statuses(order.order_status)
                .into_iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), false))
                .collect(),
        })
        .collect();

    let payment_options = std::iter::once(SelectOption::new("", "Any payment", query.payment.is_none()))
        .chain(
            PaymentStatus::ALL
                .iter()
                .map(|&p| SelectOption::new(p.as_str(), p.label(), Some(p) == query.payment)),
        )
        .collect();

    Ok(AdminOrdersTemplate {
        page,
        rows,
        tabs: status_tabs(&counts, listing.results.len(), query.status),
        payment_options,
        status: query.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        total: listing.count,
        current_page,
        has_next: listing.has_more(),
    })
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub order_status: OrderStatus,
    #[serde(default)]
    pub admin_notes: String,
    /// Listing URL to return to, filters included.
    #[serde(default)]
    pub back: Option<String>,
}

#[instrument(skip(state, session, auth, form), fields(status = %form.order_status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    session: Session,
    RequireOwner(mut auth): RequireOwner,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let update = OrderStatusUpdate {
        order_status: form.order_status,
        admin_notes: Some(form.admin_notes.trim().to_string()).filter(|n| !n.is_empty()),
    };
    let updated = state.api().update_order_status(id, &update, &mut auth).await;
    stores::save(&session, &auth).await?;

    match updated {
        Ok(order) => {
            let order_id = id.to_string();
            add_breadcrumb(
                "admin",
                "Order status updated",
                Some(&[("order_id", order_id.as_str()), ("status", form.order_status.as_str())]),
            );
            flash::success(
                &session,
                format!("{} is now {}", order.order_number, order.order_status.label()),
            )
            .await?;
        }
        Err(ApiError::Unauthenticated) => return Err(ApiError::Unauthenticated.into()),
        Err(e) => flash::error(&session, e.user_message()).await?,
    }

    let back = form
        .back
        .as_deref()
        .and_then(crate::middleware::safe_next)
        .filter(|path| path.starts_with("/admin/orders"))
        .unwrap_or("/admin/orders");
    Ok(Redirect::to(back))
}

// =============================================================================
// Products
// =============================================================================

/// Create/edit form. Numbers arrive as text so bad input can be echoed back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub cost_price: String,
    #[serde(default)]
    pub discount_percentage: String,
    #[serde(default)]
    pub stock: String,
    /// Checkbox: present when ticked.
    #[serde(default)]
    pub is_featured: Option<String>,
    #[serde(default)]
    pub is_active: Option<String>,
}

fn parse_field<T: FromStr>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    message: &str,
) -> Option<T> {
    let value = value.trim().replace(',', "");
    if value.is_empty() {
        return None;
    }
    value.parse().map_or_else(
        |_| {
            errors.push(FieldError::new(field, message));
            None
        },
        Some,
    )
}

impl ProductForm {
    /// Validate into an API body. Creating requires name, SKU and price.
    pub fn to_input(&self, creating: bool) -> std::result::Result<ProductInput, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = if creating {
            validation::required(&mut errors, "name", &self.name, "Name is required")
        } else {
            Some(self.name.trim().to_string()).filter(|n| !n.is_empty())
        };
        let sku = if creating {
            validation::required(&mut errors, "sku", &self.sku, "SKU is required")
        } else {
            Some(self.sku.trim().to_string()).filter(|s| !s.is_empty())
        };

        let price: Option<Decimal> =
            parse_field(&mut errors, "price", &self.price, "Price must be a number");
        match price {
            None if creating && !self.price.trim().is_empty() => {}
            None if creating => errors.push(FieldError::new("price", "Price is required")),
            Some(p) if p <= Decimal::ZERO => {
                errors.push(FieldError::new("price", "Price must be greater than zero"));
            }
            _ => {}
        }
        let cost_price: Option<Decimal> = parse_field(
            &mut errors,
            "cost_price",
            &self.cost_price,
            "Cost must be a number",
        );
        let discount_percentage: Option<Decimal> = parse_field(
            &mut errors,
            "discount_percentage",
            &self.discount_percentage,
            "Discount must be a number",
        );
        if discount_percentage.is_some_and(|d| d < Decimal::ZERO || d > Decimal::ONE_HUNDRED) {
            errors.push(FieldError::new(
                "discount_percentage",
                "Discount must be between 0 and 100",
            ));
        }
        let stock: Option<i64> =
            parse_field(&mut errors, "stock", &self.stock, "Stock must be a whole number");
        if stock.is_some_and(|s| s < 0) {
            errors.push(FieldError::new("stock", "Stock cannot be negative"));
        }
        let category_id: Option<CategoryId> = parse_field(
            &mut errors,
            "category_id",
            &self.category_id,
            "Choose a category",
        );

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ProductInput {
            name,
            sku,
            description: Some(self.description.trim().to_string()),
            category_id,
            price,
            cost_price,
            discount_percentage,
            stock,
            is_featured: Some(self.is_featured.is_some()),
            is_active: Some(self.is_active.is_some()),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        let checkbox = |on: bool| on.then(|| "on".to_string());
        Self {
            name: product.name.clone(),
            sku: product.sku.clone(),
            description: product.description.clone(),
            category_id: product
                .category_id
                .or_else(|| product.category.as_ref().map(|c| c.id))
                .map(|id| id.to_string())
                .unwrap_or_default(),
            price: product.price.amount().normalize().to_string(),
            cost_price: product
                .cost_price
                .map(|c| c.amount().normalize().to_string())
                .unwrap_or_default(),
            discount_percentage: product.discount_percentage.normalize().to_string(),
            stock: product.stock.to_string(),
            is_featured: checkbox(product.is_featured),
            is_active: checkbox(product.is_active),
        }
    }
}

/// A product table row with its inline edit form.
#[derive(Debug, Clone)]
pub struct AdminProductRow {
    pub id: ProductId,
    pub price: String,
    pub available: i64,
    pub stock_label: &'static str,
    pub stock_class: &'static str,
    pub margin: String,
    pub categories: Vec<SelectOption>,
    pub form: ProductForm,
    pub errors: Vec<FieldError>,
}

fn category_options(categories: &[Category], selected: &str) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "No category", selected.is_empty()))
        .chain(categories.iter().map(|c| {
            let value = c.id.to_string();
            let is_selected = value == selected;
            SelectOption::new(value, c.name.clone(), is_selected)
        }))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminProductsQuery {
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub q: Option<String>,
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub page: PageContext,
    pub rows: Vec<AdminProductRow>,
    pub search: String,
    pub total: u64,
    pub current_page: u32,
    pub has_next: bool,
    /// The "new product" form, refilled after a failed create.
    pub new_form: ProductForm,
    pub new_categories: Vec<SelectOption>,
    pub new_errors: Vec<FieldError>,
}

/// Which form failed, so it can be refilled.
enum Rejected {
    Create(ProductForm, Vec<FieldError>),
    Update(ProductId, ProductForm, Vec<FieldError>),
}

async fn products_page(
    state: &AppState,
    session: &Session,
    page: PageContext,
    auth: &mut AuthSession,
    query: &AdminProductsQuery,
    rejected: Option<Rejected>,
) -> Result<AdminProductsTemplate> {
    let current_page = query.page.unwrap_or(1).max(1);
    let product_query = ProductQuery {
        search: query.q.clone(),
        ordering: Some("name".to_string()),
        page: Some(current_page),
        page_size: Some(ADMIN_PAGE_SIZE),
        ..ProductQuery::default()
    };
    let fetched = state.api().admin_products(&product_query, auth).await;
    stores::save(session, auth).await?;
    let listing = fetched?;

    let categories = state.api().categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Categories unavailable for the product form");
        Vec::new()
    });

    let (mut new_form, mut new_errors, mut failed_update) = (
        ProductForm {
            is_active: Some("on".to_string()),
            ..ProductForm::default()
        },
        Vec::new(),
        None,
    );
    match rejected {
        Some(Rejected::Create(form, errors)) => {
            new_form = form;
            new_errors = errors;
        }
        Some(Rejected::Update(id, form, errors)) => failed_update = Some((id, form, errors)),
        None => {}
    }

    let rows = listing
        .results
        .iter()
        .map(|product| {
            let level = StockLevel::from_available(product.available());
            let (form, errors) = match &failed_update {
                Some((id, form, errors)) if *id == product.id => (form.clone(), errors.clone()),
                _ => (ProductForm::from(product), Vec::new()),
            };
            AdminProductRow {
                id: product.id,
                price: product.effective_price().display(),
                available: product.available(),
                stock_label: level.label(),
                stock_class: level.badge_class(),
                margin: format_profit_margin(product.profit_margin),
                categories: category_options(&categories, &form.category_id),
                form,
                errors,
            }
        })
        .collect();

    Ok(AdminProductsTemplate {
        page,
        rows,
        search: query.q.clone().unwrap_or_default(),
        total: listing.count,
        current_page,
        has_next: listing.has_more(),
        new_categories: category_options(&categories, &new_form.category_id),
        new_form,
        new_errors,
    })
}

#[instrument(skip(state, session, page, auth))]
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireOwner(mut auth): RequireOwner,
    Query(query): Query<AdminProductsQuery>,
) -> Result<impl IntoResponse> {
    products_page(&state, &session, page, &mut auth, &query, None).await
}

/// Field errors from the form, or from the API's per-field messages.
fn api_field_errors(err: &ApiError) -> Vec<FieldError> {
    const FIELDS: [&str; 8] = [
        "name",
        "sku",
        "price",
        "cost_price",
        "discount_percentage",
        "stock",
        "category_id",
        "description",
    ];
    let errors: Vec<FieldError> = FIELDS
        .iter()
        .filter_map(|field| {
            err.field_message(field)
                .map(|message| FieldError::new(field, message))
        })
        .collect();
    if errors.is_empty() {
        vec![FieldError::new("form", err.user_message())]
    } else {
        errors
    }
}

#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireOwner(mut auth): RequireOwner,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let query = AdminProductsQuery::default();
    let input = match form.to_input(true) {
        Ok(input) => input,
        Err(errors) => {
            let rejected = Some(Rejected::Create(form, errors));
            return Ok(products_page(&state, &session, page, &mut auth, &query, rejected)
                .await?
                .into_response());
        }
    };

    let created = state.api().create_product(&input, &mut auth).await;
    stores::save(&session, &auth).await?;
    match created {
        Ok(product) => {
            flash::success(&session, format!("Created {}", product.name)).await?;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(ApiError::Unauthenticated) => Err(ApiError::Unauthenticated.into()),
        Err(e) => {
            let rejected = Some(Rejected::Create(form, api_field_errors(&e)));
            Ok(products_page(&state, &session, page, &mut auth, &query, rejected)
                .await?
                .into_response())
        }
    }
}

#[instrument(skip(state, session, page, auth, form))]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireOwner(mut auth): RequireOwner,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let query = AdminProductsQuery::default();
    let input = match form.to_input(false) {
        Ok(input) => input,
        Err(errors) => {
            let rejected = Some(Rejected::Update(id, form, errors));
            return Ok(products_page(&state, &session, page, &mut auth, &query, rejected)
                .await?
                .into_response());
        }
    };

    let updated = state.api().update_product(id, &input, &mut auth).await;
    stores::save(&session, &auth).await?;
    match updated {
        Ok(product) => {
            flash::success(&session, format!("Saved {}", product.name)).await?;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(ApiError::Unauthenticated) => Err(ApiError::Unauthenticated.into()),
        Err(e) => {
            let rejected = Some(Rejected::Update(id, form, api_field_errors(&e)));
            Ok(products_page(&state, &session, page, &mut auth, &query, rejected)
                .await?
                .into_response())
        }
    }
}

#[instrument(skip(state, session, auth))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireOwner(mut auth): RequireOwner,
    Path(id): Path<ProductId>,
) -> Result<Redirect> {
    let deleted = state.api().delete_product(id, &mut auth).await;
    stores::save(&session, &auth).await?;
    match deleted {
        Ok(()) => flash::success(&session, "Product deleted").await?,
        Err(ApiError::Unauthenticated) => return Err(ApiError::Unauthenticated.into()),
        Err(e) => flash::error(&session, e.user_message()).await?,
    }
    Ok(Redirect::to("/admin/products"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bucket(status: &str, count: u64) -> StatusBucket {
        StatusBucket {
            status: status.to_string(),
            count,
        }
    }

    #[test]
    fn test_bucket_views_percentages() {
        let views = bucket_views(
            &[bucket("pending", 1), bucket("delivered", 2), bucket("on_hold", 0)],
            order_status_label,
        );
        assert_eq!(views[0].label, "Pending");
        assert_eq!(views[0].percent, 33);
        assert_eq!(views[1].percent, 67);
        assert_eq!(views[2].label, "On Hold");
        assert!(bucket_views(&[], order_status_label).is_empty());
    }

    #[test]
    fn test_section_defaults_failures_but_not_sign_out() {
        let empty: Vec<StatusBucket> =
            section("order statuses", Err(ApiError::Server { status: 500 })).unwrap();
        assert!(empty.is_empty());

        let ended = section::<Vec<StatusBucket>>("profit", Err(ApiError::Unauthenticated));
        assert!(matches!(
            ended,
            Err(crate::error::AppError::Api(ApiError::Unauthenticated))
        ));
    }

    #[test]
    fn test_next_statuses_offer_everything_but_current() {
        let options = next_statuses(OrderStatus::Pending);
        assert_eq!(options.len(), OrderStatus::ALL.len() - 1);
        assert!(!options.contains(&OrderStatus::Pending));
        assert!(options.contains(&OrderStatus::Delivered));

        let options = next_statuses(OrderStatus::Delivered);
        assert!(options.contains(&OrderStatus::Pending));
        assert!(options.contains(&OrderStatus::Cancelled));
        assert!(!options.contains(&OrderStatus::Delivered));
    }

    #[test]
    fn test_product_form_create_requires_basics() {
        let errors = ProductForm::default().to_input(true).unwrap_err();
        for field in ["name", "sku", "price"] {
            assert!(validation::message_for(&errors, field).is_some(), "{field}");
        }
    }

    #[test]
    fn test_product_form_parses_numbers() {
        let form = ProductForm {
            name: "Brake pads".to_string(),
            sku: "BP-1".to_string(),
            price: "1,500".to_string(),
            discount_percentage: "10".to_string(),
            stock: "12".to_string(),
            category_id: "3".to_string(),
            is_active: Some("on".to_string()),
            ..ProductForm::default()
        };
        let input = form.to_input(true).unwrap();
        assert_eq!(input.price, Some(Decimal::from(1500)));
        assert_eq!(input.stock, Some(12));
        assert_eq!(input.category_id, Some(CategoryId::new(3)));
        assert_eq!(input.is_active, Some(true));
        assert_eq!(input.is_featured, Some(false));
        assert_eq!(input.cost_price, None);
    }

    #[test]
    fn test_product_form_rejects_bad_numbers() {
        let form = ProductForm {
            price: "cheap".to_string(),
            discount_percentage: "150".to_string(),
            stock: "-1".to_string(),
            ..ProductForm::default()
        };
        let errors = form.to_input(false).unwrap_err();
        assert_eq!(validation::message_for(&errors, "price"), Some("Price must be a number"));
        assert!(validation::message_for(&errors, "discount_percentage").is_some());
        assert_eq!(validation::message_for(&errors, "stock"), Some("Stock cannot be negative"));
    }
}
