//! Cart route handlers.
//!
//! Mutations answer HTMX requests with the refreshed cart fragment and a
//! `cart-updated` trigger for the header badge; plain form posts are
//! redirected back to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::{DeliveryTier, ProductId};
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::CartView;
use super::{PageContext, is_htmx};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::flash;
use crate::state::AppState;
use crate::stores::{self, CartLine, CartStore};

/// Delivery tier radio button.
#[derive(Debug, Clone)]
pub struct TierOption {
    pub value: &'static str,
    pub label: &'static str,
    pub fee: String,
    pub window: &'static str,
    pub selected: bool,
}

/// Every tier, marking the one in the cart.
#[must_use]
pub fn tier_options(selected: Option<DeliveryTier>) -> Vec<TierOption> {
    DeliveryTier::ALL
        .iter()
        .map(|&tier| TierOption {
            value: tier.as_str(),
            label: tier.label(),
            fee: tier.fee().display(),
            window: tier.window(),
            selected: Some(tier) == selected,
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub tiers: Vec<TierOption>,
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_contents.html")]
pub struct CartContentsTemplate {
    pub cart: CartView,
    pub tiers: Vec<TierOption>,
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Fragment plus trigger for HTMX, redirect otherwise.
fn cart_response(headers: &HeaderMap, cart: &CartStore) -> Response {
    if is_htmx(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartContentsTemplate {
                cart: CartView::from(cart),
                tiers: tier_options(cart.delivery().map(|d| d.tier)),
            },
        )
            .into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(session, page))]
pub async fn show(session: Session, page: PageContext) -> impl IntoResponse {
    let cart = stores::load::<CartStore>(&session).await;
    CartTemplate {
        page,
        tiers: tier_options(cart.delivery().map(|d| d.tier)),
        cart: CartView::from(&cart),
    }
}

#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let cart = stores::load::<CartStore>(&session).await;
    CartCountTemplate {
        count: cart.item_count(),
    }
}

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Add a product, snapshotting its current price.
///
/// The requested quantity is capped at the units available.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = state.api().product(form.product_id).await?;
    let mut cart = stores::load::<CartStore>(&session).await;

    let already = cart.line(product.id).map_or(0, |line| line.quantity);
    let room = u32::try_from(product.available())
        .unwrap_or(0)
        .saturating_sub(already);
    let quantity = form.quantity.unwrap_or(1).min(room);

    if quantity == 0 {
        let message = if product.in_stock() {
            format!("You already have every available {} in your cart", product.name)
        } else {
            format!("{} is out of stock", product.name)
        };
        if is_htmx(&headers) {
            return Ok((
                AppendHeaders([("HX-Trigger", "cart-unavailable")]),
                message,
            )
                .into_response());
        }
        flash::error(&session, message).await?;
        return Ok(Redirect::to(&format!("/product/{}", product.id)).into_response());
    }

    cart.add_item(CartLine {
        product_id: product.id,
        product_name: product.name.clone(),
        sku: product.sku.clone(),
        unit_price: product.effective_price(),
        quantity,
        image: product.image_url().map(str::to_string),
    });
    stores::save(&session, &cart).await?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
    tracing::info!(product_id = %product.id, quantity, "Added to cart");

    if is_htmx(&headers) {
        Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            format!("Added {} to cart", product.name),
        )
            .into_response())
    } else {
        flash::success(&session, format!("Added {} to cart", product.name)).await?;
        Ok(Redirect::to("/cart").into_response())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    /// Zero or less removes the line.
    pub quantity: i64,
}

#[instrument(skip(session, headers))]
pub async fn update(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = stores::load::<CartStore>(&session).await;
    cart.update_quantity(form.product_id, form.quantity);
    stores::save(&session, &cart).await?;
    Ok(cart_response(&headers, &cart))
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = stores::load::<CartStore>(&session).await;
    cart.remove_item(form.product_id);
    stores::save(&session, &cart).await?;
    Ok(cart_response(&headers, &cart))
}

#[derive(Debug, Deserialize)]
pub struct DeliveryForm {
    pub tier: DeliveryTier,
}

#[instrument(skip(session, headers))]
pub async fn delivery(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<DeliveryForm>,
) -> Result<Response> {
    let mut cart = stores::load::<CartStore>(&session).await;
    cart.set_delivery(form.tier.into());
    stores::save(&session, &cart).await?;
    Ok(cart_response(&headers, &cart))
}

#[instrument(skip(session, headers))]
pub async fn clear(session: Session, headers: HeaderMap) -> Result<Response> {
    let mut cart = stores::load::<CartStore>(&session).await;
    cart.clear();
    stores::save(&session, &cart).await?;
    Ok(cart_response(&headers, &cart))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_options_mark_selection() {
        let options = tier_options(Some(DeliveryTier::Express));
        assert_eq!(options.len(), DeliveryTier::ALL.len());
        let express = options.iter().find(|o| o.value == "express");
        assert!(express.is_some_and(|o| o.selected && o.fee == "KSh 3,000"));
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert!(tier_options(None).iter().all(|o| !o.selected));
    }
}
