//! Favorites handlers.

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::ProductId;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::ProductCard;
use super::{PageContext, is_htmx};
use crate::error::Result;
use crate::filters;
use crate::state::AppState;
use crate::stores::{self, FavoriteProduct, FavoritesStore};

#[derive(Template, WebTemplate)]
#[template(path = "favorites.html")]
pub struct FavoritesTemplate {
    pub page: PageContext,
    pub cards: Vec<ProductCard>,
}

/// Heart button, swapped in place after a toggle.
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub product_id: ProductId,
    pub is_favorite: bool,
}

#[instrument(skip(session, page))]
pub async fn show(session: Session, page: PageContext) -> impl IntoResponse {
    let favorites = stores::load::<FavoritesStore>(&session).await;
    FavoritesTemplate {
        page,
        cards: favorites.items().iter().map(ProductCard::from_favorite).collect(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: ProductId,
    /// Where to send a visitor without JavaScript.
    #[serde(default)]
    pub back: Option<String>,
}

/// Add or remove a favorite.
///
/// Adding fetches the product so the list can render without the API later.
#[instrument(skip(state, session, headers))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ToggleForm>,
) -> Result<Response> {
    let mut favorites = stores::load::<FavoritesStore>(&session).await;

    let is_favorite = if favorites.contains(form.product_id) {
        favorites.remove(form.product_id);
        false
    } else {
        let product = state.api().product(form.product_id).await?;
        favorites.toggle(FavoriteProduct::from(&product))
    };
    stores::save(&session, &favorites).await?;
    tracing::debug!(product_id = %form.product_id, is_favorite, "Toggled favorite");

    if is_htmx(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "favorites-updated")]),
            FavoriteButtonTemplate {
                product_id: form.product_id,
                is_favorite,
            },
        )
            .into_response());
    }

    let back = form
        .back
        .as_deref()
        .and_then(crate::middleware::safe_next)
        .unwrap_or("/favorites");
    Ok(Redirect::to(back).into_response())
}

#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    let mut favorites = stores::load::<FavoritesStore>(&session).await;
    favorites.clear();
    stores::save(&session, &favorites).await?;
    Ok(Redirect::to("/favorites"))
}
