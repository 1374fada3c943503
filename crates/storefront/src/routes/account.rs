//! Customer account pages: profile and order history.
//!
//! Every handler here calls the API with the visitor's tokens, so the auth
//! store is saved back after each call in case a refresh rotated them.

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::{OrderStatus, PaymentStatus, format_phone_display};
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use super::views::OrderView;
use crate::api::{
    ApiError, OrderFilters, ProfileResponse, SavedAddressSummary, SavedVehicleSummary,
    StkPushRequest, UpdateProfileRequest,
};
use crate::catalog::{filter_orders_by_status, status_counts};
use crate::checkout::{FieldError, validation};
use crate::error::Result;
use crate::filters;
use crate::flash;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::stores::{self, AuthSession};

const ORDERS_PAGE_SIZE: u32 = 20;

// =============================================================================
// Profile
// =============================================================================

/// Editable profile fields, as shown in the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub bio: String,
}

impl ProfileForm {
    fn from_auth(auth: &AuthSession) -> Self {
        auth.user().map_or_else(Self::default, |user| Self {
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            phone_number: format_phone_display(&user.profile.phone_number),
            bio: user.profile.bio.clone().unwrap_or_default(),
        })
    }

    /// Validate and turn into a patch. Blank names and bio are sent as empty
    /// strings so they can be cleared.
    fn to_request(&self) -> std::result::Result<UpdateProfileRequest, Vec<FieldError>> {
        let mut errors = Vec::new();
        let phone_number = if self.phone_number.trim().is_empty() {
            Some(String::new())
        } else {
            validation::phone(&mut errors, "phone_number", &self.phone_number)
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(UpdateProfileRequest {
            phone_number,
            avatar_url: None,
            bio: Some(self.bio.trim().to_string()),
            first_name: Some(self.first_name.trim().to_string()),
            last_name: Some(self.last_name.trim().to_string()),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub username: String,
    pub email: String,
    pub form: ProfileForm,
    pub errors: Vec<FieldError>,
    pub vehicles: Vec<SavedVehicleSummary>,
    pub addresses: Vec<SavedAddressSummary>,
    /// Set when the profile could not be refreshed from the API.
    pub notice: Option<String>,
}

impl ProfileTemplate {
    fn new(page: PageContext, auth: &AuthSession, profile: Option<ProfileResponse>) -> Self {
        let (username, email) = auth
            .user()
            .map(|u| (u.username.clone(), u.email.clone()))
            .unwrap_or_default();
        let (vehicles, addresses) = profile
            .map(|p| (p.saved_vehicles, p.saved_addresses))
            .unwrap_or_default();
        Self {
            page,
            username,
            email,
            form: ProfileForm::from_auth(auth),
            errors: Vec::new(),
            vehicles,
            addresses,
            notice: None,
        }
    }

    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        validation::message_for(&self.errors, field)
    }
}

#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(mut auth): RequireAuth,
) -> Result<Response> {
    let fetched = state.api().get_profile(&mut auth).await;
    stores::save(&session, &auth).await?;

    let template = match fetched {
        Ok(profile) => {
            auth.update_profile(&profile);
            stores::save(&session, &auth).await?;
            ProfileTemplate::new(page, &auth, Some(profile))
        }
        Err(ApiError::Unauthenticated) => return Err(ApiError::Unauthenticated.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Showing cached profile");
            let mut template = ProfileTemplate::new(page, &auth, None);
            template.notice = Some(e.user_message());
            template
        }
    };
    Ok(template.into_response())
}

#[instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(mut auth): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let rerender = |auth: &AuthSession, form: ProfileForm, errors: Vec<FieldError>| {
        let mut template = ProfileTemplate::new(page, auth, None);
        template.form = form;
        template.errors = errors;
        template.into_response()
    };

    let request = match form.to_request() {
        Ok(request) => request,
        Err(errors) => return Ok(rerender(&auth, form, errors)),
    };

    let updated = state.api().update_profile(&request, &mut auth).await;
    stores::save(&session, &auth).await?;

    match updated {
        Ok(profile) => {
            auth.update_profile(&profile);
            stores::save(&session, &auth).await?;
            flash::success(&session, "Profile updated").await?;
            Ok(Redirect::to("/profile").into_response())
        }
        Err(ApiError::Unauthenticated) => Err(ApiError::Unauthenticated.into()),
        Err(e) => {
            let errors = match e.field_message("phone_number") {
                Some(message) => vec![FieldError::new("phone_number", message)],
                None => vec![FieldError::new("form", e.user_message())],
            };
            Ok(rerender(&auth, form, errors))
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Status filter tab with its count on the current page.
#[derive(Debug, Clone)]
pub struct StatusTab {
    pub value: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub active: bool,
}

/// Tabs for "all" plus every status that has orders.
#[must_use]
pub fn status_tabs(
    counts: &[(OrderStatus, usize)],
    total: usize,
    active: Option<OrderStatus>,
) -> Vec<StatusTab> {
    std::iter::once(StatusTab {
        value: "",
        label: "All",
        count: total,
        active: active.is_none(),
    })
    .chain(
        counts
            .iter()
            .filter(|&&(status, count)| count > 0 || Some(status) == active)
            .map(|&(status, count)| StatusTab {
                value: status.as_str(),
                label: status.label(),
                count,
                active: Some(status) == active,
            }),
    )
    .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
    pub tabs: Vec<StatusTab>,
    pub status: String,
    pub current_page: u32,
    pub has_next: bool,
}

#[instrument(skip(state, session, page, auth))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(mut auth): RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let current_page = query.page.unwrap_or(1).max(1);
    let filters = OrderFilters {
        page: Some(current_page),
        page_size: Some(ORDERS_PAGE_SIZE),
        ..OrderFilters::default()
    };
    let fetched = state.api().my_orders(&filters, &mut auth).await;
    stores::save(&session, &auth).await?;
    let listing = fetched?;

    let counts = status_counts(&listing.results);
    Ok(OrdersTemplate {
        page,
        orders: filter_orders_by_status(&listing.results, query.status)
            .into_iter()
            .map(OrderView::from)
            .collect(),
        tabs: status_tabs(&counts, listing.results.len(), query.status),
        status: query.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        current_page,
        has_next: listing.has_more(),
    })
}

#[derive(Template, WebTemplate)]
#[template(path = "account/order_detail.html")]
pub struct OrderDetailTemplate {
    pub page: PageContext,
    pub order: OrderView,
    pub order_id: autoparts_core::OrderId,
    /// Unpaid and not cancelled: offer the M-Pesa prompt again.
    pub can_pay: bool,
    pub pay_phone: String,
}

#[instrument(skip(state, session, page, auth))]
pub async fn order_detail(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAuth(mut auth): RequireAuth,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse> {
    let fetched = state.api().order_detail(&order_number, &mut auth).await;
    stores::save(&session, &auth).await?;
    let order = fetched?;

    Ok(OrderDetailTemplate {
        page,
        order_id: order.id,
        can_pay: can_pay(order.payment_status, order.order_status),
        pay_phone: format_phone_display(&order.recipient_phone),
        order: OrderView::from(&order),
    })
}

/// Unpaid, pending or failed payments on an open order can be retried.
const fn can_pay(payment: PaymentStatus, order: OrderStatus) -> bool {
    !matches!(payment, PaymentStatus::Paid | PaymentStatus::Refunded) && !order.is_final()
}

#[derive(Debug, Deserialize)]
pub struct PayOrderForm {
    #[serde(default)]
    pub mpesa_phone: String,
}

/// Send the M-Pesa prompt again for an unpaid order.
#[instrument(skip(state, session, auth, form))]
pub async fn pay_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut auth): RequireAuth,
    Path(order_number): Path<String>,
    Form(form): Form<PayOrderForm>,
) -> Result<Redirect> {
    let back = format!("/orders/{}", urlencoding::encode(&order_number));

    let fetched = state.api().order_detail(&order_number, &mut auth).await;
    stores::save(&session, &auth).await?;
    let order = fetched?;

    if !can_pay(order.payment_status, order.order_status) {
        flash::push(&session, flash::FlashLevel::Info, "This order needs no payment").await?;
        return Ok(Redirect::to(&back));
    }

    let mut errors = Vec::new();
    let Some(phone) = validation::phone(&mut errors, "mpesa_phone", &form.mpesa_phone) else {
        let message = validation::message_for(&errors, "mpesa_phone").unwrap_or_default();
        flash::error(&session, message).await?;
        return Ok(Redirect::to(&back));
    };

    let push = StkPushRequest {
        order_id: order.id,
        phone_number: Some(phone),
        amount: Some(order.total_amount.rounded_shillings()),
    };
    match state.api().initiate_stk_push(&push).await {
        Ok(response) if response.success => {
            flash::success(&session, "Check your phone and enter your M-Pesa PIN to pay.")
                .await?;
        }
        Ok(response) => {
            tracing::warn!(order_id = %order.id, code = ?response.response_code, "STK push declined");
            flash::error(&session, "We couldn't send the M-Pesa prompt. Please try again.")
                .await?;
        }
        Err(e) => {
            tracing::warn!(error = %e, order_id = %order.id, "STK push failed");
            flash::error(&session, e.user_message()).await?;
        }
    }
    Ok(Redirect::to(&back))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tabs_skip_empty_statuses() {
        let counts = vec![
            (OrderStatus::Pending, 2),
            (OrderStatus::Shipped, 0),
            (OrderStatus::Delivered, 1),
        ];
        let tabs = status_tabs(&counts, 3, Some(OrderStatus::Shipped));
        let values: Vec<&str> = tabs.iter().map(|t| t.value).collect();
        assert_eq!(values, vec!["", "pending", "shipped", "delivered"]);
        assert!(tabs[2].active);
        assert!(!tabs[0].active);
        assert_eq!(tabs[0].count, 3);
    }

    #[test]
    fn test_profile_form_blank_phone_clears() {
        let form = ProfileForm {
            first_name: " Amina ".to_string(),
            ..ProfileForm::default()
        };
        let request = form.to_request().unwrap();
        assert_eq!(request.phone_number.as_deref(), Some(""));
        assert_eq!(request.first_name.as_deref(), Some("Amina"));
    }

    #[test]
    fn test_profile_form_rejects_bad_phone() {
        let form = ProfileForm {
            phone_number: "12345".to_string(),
            ..ProfileForm::default()
        };
        let errors = form.to_request().unwrap_err();
        assert_eq!(errors[0].field, "phone_number");
    }

    #[test]
    fn test_can_pay_only_open_orders() {
        assert!(can_pay(PaymentStatus::Pending, OrderStatus::Pending));
        assert!(can_pay(PaymentStatus::Failed, OrderStatus::Confirmed));
        assert!(!can_pay(PaymentStatus::Paid, OrderStatus::Pending));
        assert!(!can_pay(PaymentStatus::Pending, OrderStatus::Cancelled));
    }
}
