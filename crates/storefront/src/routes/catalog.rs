//! Catalog pages: categories, search with filters, product detail.

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::ProductId;
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_governor::key_extractor::KeyExtractor;
use tower_sessions::Session;
use tracing::instrument;

use super::views::ProductCard;
use super::{PageContext, SelectOption};
use crate::api::{Category, Paginated, Product, ProductQuery};
use crate::catalog::{ProductFilters, SortOption, StockLevel, filter_in_stock, sort_products};
use crate::error::Result;
use crate::filters;
use crate::middleware::rate_limit::ClientIpKeyExtractor;
use crate::state::AppState;
use crate::stores::{self, FavoritesStore, SelectedVehicle, VehicleStore};

/// Related products shown under a product.
const RELATED_COUNT: usize = 4;

// =============================================================================
// Categories
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "categories.html")]
pub struct CategoriesTemplate {
    pub page: PageContext,
    pub categories: Vec<Category>,
}

#[instrument(skip(state, page))]
pub async fn categories(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let categories = state.api().categories().await?;
    Ok(CategoriesTemplate { page, categories })
}

// =============================================================================
// Search
// =============================================================================

/// One page of results plus the link that loads the next one.
pub struct ResultsPage {
    pub cards: Vec<ProductCard>,
    pub next_url: Option<String>,
}

impl ResultsPage {
    fn new(
        mut page: Paginated<Product>,
        filters: &ProductFilters,
        favorites: &FavoritesStore,
    ) -> (Self, u64) {
        let total = page.count;
        let has_more = page.has_more();

        // The API may ignore `in_stock` or `ordering`; enforce both on the page.
        if filters.in_stock == Some(true) {
            page.results = filter_in_stock(page.results);
        }
        sort_products(&mut page.results, filters.sort());

        let cards = page
            .results
            .iter()
            .map(|p| ProductCard::new(p, favorites.contains(p.id)))
            .collect();
        let next_url = has_more.then(|| {
            format!(
                "/search/more?{}",
                filters.with_page(filters.page() + 1).query_string()
            )
        });
        (Self { cards, next_url }, total)
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub page: PageContext,
    pub search: String,
    pub results: ResultsPage,
    pub total: u64,
    pub active_filters: usize,
    pub vehicle_label: Option<String>,
    pub sort_options: Vec<SelectOption>,
    pub category_options: Vec<SelectOption>,
    pub min_price: String,
    pub max_price: String,
    pub in_stock_only: bool,
    /// Hidden inputs that carry the vehicle through filter changes.
    pub vehicle_params: Vec<(&'static str, String)>,
}

/// Sort choices for the catalog toolbar.
#[must_use]
pub fn sort_options(current: SortOption) -> Vec<SelectOption> {
    SortOption::ALL
        .into_iter()
        .map(|option| SelectOption::new(option.as_str(), option.label(), option == current))
        .collect()
}

fn vehicle_label(filters: &ProductFilters, selected: Option<&SelectedVehicle>) -> Option<String> {
    let selected = selected?;
    let matches = filters.make == selected.make_id
        && filters.model == selected.model_id
        && filters.year == selected.year;
    let label = selected.label();
    (matches && !label.is_empty()).then_some(label)
}

fn vehicle_params(filters: &ProductFilters) -> Vec<(&'static str, String)> {
    [
        ("make", filters.make.map(|id| id.to_string())),
        ("model", filters.model.map(|id| id.to_string())),
        ("year", filters.year.map(|y| y.to_string())),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .collect()
}

/// Catalog with filters. The selected vehicle applies when the query names
/// none.
#[instrument(skip(state, session, page))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Query(mut filters): Query<ProductFilters>,
) -> Result<impl IntoResponse> {
    let vehicle = stores::load::<VehicleStore>(&session).await;
    let favorites = stores::load::<FavoritesStore>(&session).await;
    filters.apply_vehicle(vehicle.selected());

    let products = state.api().products(&filters.to_query()).await?;
    let categories = state.api().categories().await.unwrap_or_else(|e| {
        tracing::error!("Failed to fetch categories for filters: {e}");
        Vec::new()
    });

    let (results, total) = ResultsPage::new(products, &filters, &favorites);

    Ok(SearchTemplate {
        page,
        search: filters.search.clone().unwrap_or_default(),
        results,
        total,
        active_filters: filters.active_count(),
        vehicle_label: vehicle_label(&filters, vehicle.selected()),
        sort_options: sort_options(filters.sort()),
        category_options: categories
            .iter()
            .map(|c| SelectOption::new(c.id, c.name.clone(), Some(c.id) == filters.category))
            .collect(),
        min_price: filters.min_price.map(|p| p.to_string()).unwrap_or_default(),
        max_price: filters.max_price.map(|p| p.to_string()).unwrap_or_default(),
        in_stock_only: filters.in_stock == Some(true),
        vehicle_params: vehicle_params(&filters),
    })
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/results_page.html")]
pub struct ResultsPageTemplate {
    pub results: ResultsPage,
}

/// Next page for infinite scroll.
///
/// A second request for the same page from the same visitor while the first
/// is still running gets `204 No Content`, which HTMX does not swap.
///
/// Visitors are told apart by session id, or by client IP before anything
/// has been stored in their session.
#[instrument(skip(state, session, request))]
pub async fn search_more(
    State(state): State<AppState>,
    session: Session,
    Query(filters): Query<ProductFilters>,
    request: Request,
) -> Result<Response> {
    let visitor = match session.id() {
        Some(id) => format!("session:{id}"),
        None => ClientIpKeyExtractor
            .extract(&request)
            .map_or_else(|_| "anonymous".to_string(), |ip| format!("ip:{ip}")),
    };
    let key = format!("{visitor}:{}", filters.query_string());

    let Some(_guard) = state.in_flight().try_begin(key) else {
        tracing::debug!("Duplicate load-more request dropped");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let favorites = stores::load::<FavoritesStore>(&session).await;
    let products = state.api().products(&filters.to_query()).await?;
    let (results, _) = ResultsPage::new(products, &filters, &favorites);

    Ok(ResultsPageTemplate { results }.into_response())
}

// =============================================================================
// Product detail
// =============================================================================

#[derive(Debug, Clone)]
pub struct GalleryImage {
    pub url: String,
    pub alt: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub page: PageContext,
    pub product: Product,
    pub card: ProductCard,
    pub gallery: Vec<GalleryImage>,
    pub available: i64,
    pub low_stock: bool,
    pub compatible: Vec<String>,
    /// `Some(true)` fits the selected vehicle, `Some(false)` does not,
    /// `None` when no vehicle is selected or no compatibility is listed.
    pub fits_vehicle: Option<bool>,
    pub vehicle_label: String,
    pub related: Vec<ProductCard>,
}

impl ProductTemplate {
    #[must_use]
    pub fn fits(&self) -> bool {
        self.fits_vehicle == Some(true)
    }

    #[must_use]
    pub fn does_not_fit(&self) -> bool {
        self.fits_vehicle == Some(false)
    }
}

fn fits(product: &Product, vehicle: &SelectedVehicle) -> Option<bool> {
    if product.compatible_vehicles.is_empty() || vehicle.make_id.is_none() {
        return None;
    }
    Some(product.compatible_vehicles.iter().any(|model| {
        let make_matches = model
            .make_id
            .or_else(|| model.make.as_ref().map(|m| m.id))
            .is_none_or(|make| Some(make) == vehicle.make_id);
        let model_matches = vehicle.model_id.is_none_or(|id| id == model.id);
        let year_matches = vehicle
            .year
            .is_none_or(|y| (model.year_from..=model.year_to).contains(&y));
        make_matches && model_matches && year_matches
    }))
}

#[instrument(skip(state, session, page))]
pub async fn product(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = state.api().product(id).await?;
    let favorites = stores::load::<FavoritesStore>(&session).await;
    let vehicle = stores::load::<VehicleStore>(&session).await;

    let related = match product.category_id.or_else(|| product.category.as_ref().map(|c| c.id)) {
        Some(category) => {
            let query = ProductQuery {
                category: Some(category),
                page_size: Some(8),
                ..ProductQuery::default()
            };
            let mut related: Vec<Product> = state
                .api()
                .products(&query)
                .await
                .map(|page| page.results)
                .unwrap_or_else(|e| {
                    tracing::warn!("Failed to fetch related products: {e}");
                    Vec::new()
                })
                .into_iter()
                .filter(|p| p.id != product.id)
                .collect();
            sort_products(&mut related, SortOption::Popular);
            related.truncate(RELATED_COUNT);
            related
        }
        None => Vec::new(),
    };

    let mut gallery: Vec<GalleryImage> = Vec::new();
    if let Some(primary) = &product.primary_image {
        gallery.push(GalleryImage {
            url: primary.clone(),
            alt: product.name.clone(),
        });
    }
    gallery.extend(
        product
            .images
            .iter()
            .filter(|img| Some(&img.image) != product.primary_image.as_ref())
            .map(|img| GalleryImage {
                url: img.image.clone(),
                alt: img.alt_text.clone().unwrap_or_else(|| product.name.clone()),
            }),
    );

    let selected = vehicle.selected().cloned().unwrap_or_default();
    let available = product.available();

    Ok(ProductTemplate {
        page,
        card: ProductCard::new(&product, favorites.contains(product.id)),
        gallery,
        available,
        low_stock: matches!(
            StockLevel::from_available(available),
            StockLevel::Low | StockLevel::Critical
        ),
        compatible: product
            .compatible_vehicles
            .iter()
            .map(|m| format!("{} ({})", m.label(), m.year_range()))
            .collect(),
        fits_vehicle: fits(&product, &selected),
        vehicle_label: selected.label(),
        related: related
            .iter()
            .map(|p| ProductCard::new(p, favorites.contains(p.id)))
            .collect(),
        product,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autoparts_core::{MakeId, ModelId};

    use super::*;

    fn product_fitting(models: serde_json::Value) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Brake pads", "sku": "bp", "price": 1500,
            "compatible_vehicles": models
        }))
        .unwrap()
    }

    fn vehicle(model: i64, year: i32) -> SelectedVehicle {
        SelectedVehicle {
            make_id: Some(MakeId::new(1)),
            model_id: Some(ModelId::new(model)),
            year: Some(year),
            ..SelectedVehicle::default()
        }
    }

    #[test]
    fn test_fits_checks_model_and_year() {
        let product = product_fitting(serde_json::json!([
            {"id": 4, "make_id": 1, "name": "Corolla", "year_from": 2014, "year_to": 2018}
        ]));
        assert_eq!(fits(&product, &vehicle(4, 2015)), Some(true));
        assert_eq!(fits(&product, &vehicle(4, 2020)), Some(false));
        assert_eq!(fits(&product, &vehicle(5, 2015)), Some(false));
        assert_eq!(fits(&product, &SelectedVehicle::default()), None);
    }

    #[test]
    fn test_fits_unknown_without_compatibility_list() {
        let product = product_fitting(serde_json::json!([]));
        assert_eq!(fits(&product, &vehicle(4, 2015)), None);
    }

    #[test]
    fn test_vehicle_label_only_when_filters_match_selection() {
        let selected = SelectedVehicle {
            make_id: Some(MakeId::new(1)),
            make_name: Some("Toyota".to_string()),
            ..SelectedVehicle::default()
        };
        let filters = ProductFilters::from_vehicle(&selected);
        assert_eq!(
            vehicle_label(&filters, Some(&selected)).as_deref(),
            Some("Toyota")
        );
        assert_eq!(vehicle_label(&ProductFilters::default(), Some(&selected)), None);
    }

    #[test]
    fn test_sort_options_mark_current() {
        let options = sort_options(SortOption::Rating);
        assert_eq!(options.len(), SortOption::ALL.len());
        assert!(options.iter().any(|o| o.selected && o.value == "rating"));
    }
}
