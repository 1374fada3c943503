//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::views::ProductCard;
use super::PageContext;
use crate::api::Category;
use crate::catalog::{SortOption, sort_products};
use crate::filters;
use crate::state::AppState;
use crate::stores::{self, FavoritesStore, VehicleStore};

/// Categories shown on the home page; the rest are on `/categories`.
const HOME_CATEGORY_COUNT: usize = 8;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub featured: Vec<ProductCard>,
    pub categories: Vec<Category>,
    pub selector: super::vehicle::VehicleSelector,
}

#[instrument(skip(state, session, page))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> impl IntoResponse {
    let favorites = stores::load::<FavoritesStore>(&session).await;
    let vehicle = stores::load::<VehicleStore>(&session).await;

    let mut featured = state.api().featured_products().await.unwrap_or_else(|e| {
        tracing::error!("Failed to fetch featured products: {e}");
        Vec::new()
    });
    sort_products(&mut featured, SortOption::Popular);

    let categories = state.api().categories().await.map_or_else(
        |e| {
            tracing::error!("Failed to fetch categories: {e}");
            Vec::new()
        },
        |mut categories| {
            categories.truncate(HOME_CATEGORY_COUNT);
            categories
        },
    );

    let selector = super::vehicle::VehicleSelector::load(&state, vehicle.selected())
        .await
        .with_saved(&vehicle);

    HomeTemplate {
        page,
        featured: featured
            .iter()
            .map(|p| ProductCard::new(p, favorites.contains(p.id)))
            .collect(),
        categories,
        selector,
    }
}
