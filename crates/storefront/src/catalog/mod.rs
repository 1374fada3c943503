//! Catalog browsing: filters, sorting, stock labels and load-more guarding.

mod in_flight;
mod shaping;

pub use in_flight::{InFlight, InFlightGuard};
pub use shaping::{filter_in_stock, filter_orders_by_status, sort_products, status_counts};

use std::fmt::Display;
use std::str::FromStr;

use autoparts_core::{CategoryId, MakeId, ModelId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::{DEFAULT_PAGE_SIZE, ProductQuery};
use crate::stores::SelectedVehicle;

// =============================================================================
// Sorting
// =============================================================================

/// Product sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Popular,
    Rating,
}

impl SortOption {
    pub const ALL: [Self; 5] = [
        Self::Newest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Popular,
        Self::Rating,
    ];

    /// Value used in URLs and form selects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Popular => "popular",
            Self::Rating => "rating",
        }
    }

    /// The API's `ordering` parameter.
    #[must_use]
    pub const fn ordering(self) -> &'static str {
        match self {
            Self::Newest => "-created_at",
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::Popular => "-sales_count",
            Self::Rating => "-rating",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::Popular => "Most popular",
            Self::Rating => "Top rated",
        }
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sort option: {s}"))
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Treat empty form values as absent instead of failing to parse them.
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Catalog filters as they arrive in the `/search` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilters {
    #[serde(default, alias = "q", deserialize_with = "empty_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<CategoryId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub make: Option<MakeId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub model: Option<ModelId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub in_stock: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub sort: Option<SortOption>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<u32>,
}

impl ProductFilters {
    /// Filters that show parts for the selected vehicle.
    #[must_use]
    pub fn from_vehicle(vehicle: &SelectedVehicle) -> Self {
        Self {
            make: vehicle.make_id,
            model: vehicle.model_id,
            year: vehicle.year,
            ..Self::default()
        }
    }

    /// Fill in the vehicle when the query names none.
    pub fn apply_vehicle(&mut self, vehicle: Option<&SelectedVehicle>) {
        if self.make.is_some() || self.model.is_some() || self.year.is_some() {
            return;
        }
        if let Some(vehicle) = vehicle {
            self.make = vehicle.make_id;
            self.model = vehicle.model_id;
            self.year = vehicle.year;
        }
    }

    #[must_use]
    pub fn sort(&self) -> SortOption {
        self.sort.unwrap_or_default()
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Number of filters narrowing the results (sort and page excluded).
    #[must_use]
    pub fn active_count(&self) -> usize {
        [
            self.search.is_some(),
            self.category.is_some(),
            self.make.is_some(),
            self.model.is_some(),
            self.year.is_some(),
            self.min_price.is_some() || self.max_price.is_some(),
            self.in_stock == Some(true),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// The API query for these filters.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        ProductQuery {
            vehicle_make: self.make,
            vehicle_model: self.model,
            vehicle_year: self.year,
            category: self.category,
            price_min: self.min_price,
            price_max: self.max_price,
            in_stock: self.in_stock.filter(|only| *only),
            search: self.search.clone(),
            ordering: Some(self.sort().ordering().to_string()),
            page: Some(self.page()),
            page_size: Some(DEFAULT_PAGE_SIZE),
        }
    }

    /// The same filters on another page, for the load-more link.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Encode back into a `/search` query string.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(category) = self.category {
            params.push(("category", category.to_string()));
        }
        if let Some(make) = self.make {
            params.push(("make", make.to_string()));
        }
        if let Some(model) = self.model {
            params.push(("model", model.to_string()));
        }
        if let Some(year) = self.year {
            params.push(("year", year.to_string()));
        }
        if let Some(min) = self.min_price {
            params.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("max_price", max.to_string()));
        }
        if self.in_stock == Some(true) {
            params.push(("in_stock", "true".to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_str().to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }

        params
            .into_iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

// =============================================================================
// Stock
// =============================================================================

/// How urgently a product needs restocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    Critical,
    Low,
    InStock,
}

impl StockLevel {
    pub const LOW_THRESHOLD: i64 = 10;
    pub const CRITICAL_THRESHOLD: i64 = 3;

    #[must_use]
    pub const fn from_available(available: i64) -> Self {
        if available <= 0 {
            Self::OutOfStock
        } else if available <= Self::CRITICAL_THRESHOLD {
            Self::Critical
        } else if available <= Self::LOW_THRESHOLD {
            Self::Low
        } else {
            Self::InStock
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OutOfStock => "out of stock",
            Self::Critical => "critical",
            Self::Low => "low stock",
            Self::InStock => "in stock",
        }
    }

    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::OutOfStock | Self::Critical => "badge-danger",
            Self::Low => "badge-warning",
            Self::InStock => "badge-success",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_ordering() {
        assert_eq!(SortOption::Newest.ordering(), "-created_at");
        assert_eq!(SortOption::PriceAsc.ordering(), "price");
        assert_eq!(SortOption::PriceDesc.ordering(), "-price");
        assert_eq!(SortOption::Popular.ordering(), "-sales_count");
        assert_eq!(SortOption::Rating.ordering(), "-rating");
        assert_eq!("price-desc".parse::<SortOption>().unwrap(), SortOption::PriceDesc);
        assert!("cheapest".parse::<SortOption>().is_err());
    }

    #[test]
    fn test_filters_from_query_string_ignore_empty_values() {
        let filters: ProductFilters = serde_json::from_value(serde_json::json!({
            "q": "brake",
            "category": "",
            "make": "3",
            "sort": "price-asc",
            "in_stock": "true"
        }))
        .unwrap();

        assert_eq!(filters.search.as_deref(), Some("brake"));
        assert_eq!(filters.category, None);
        assert_eq!(filters.make, Some(MakeId::new(3)));
        assert_eq!(filters.sort(), SortOption::PriceAsc);
        assert_eq!(filters.active_count(), 3);
    }

    #[test]
    fn test_to_query() {
        let filters = ProductFilters {
            make: Some(MakeId::new(1)),
            year: Some(2015),
            in_stock: Some(false),
            page: Some(0),
            ..ProductFilters::default()
        };
        let query = filters.to_query();
        assert_eq!(query.vehicle_make, Some(MakeId::new(1)));
        assert_eq!(query.vehicle_year, Some(2015));
        assert_eq!(query.in_stock, None);
        assert_eq!(query.page, Some(1));
        assert_eq!(query.ordering.as_deref(), Some("-created_at"));
        assert_eq!(query.page_size, Some(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_apply_vehicle_only_when_unset() {
        let vehicle = SelectedVehicle {
            make_id: Some(MakeId::new(1)),
            model_id: Some(ModelId::new(2)),
            year: Some(2015),
            ..SelectedVehicle::default()
        };

        let mut filters = ProductFilters::default();
        filters.apply_vehicle(Some(&vehicle));
        assert_eq!(filters, ProductFilters::from_vehicle(&vehicle));

        let mut explicit = ProductFilters {
            make: Some(MakeId::new(9)),
            ..ProductFilters::default()
        };
        explicit.apply_vehicle(Some(&vehicle));
        assert_eq!(explicit.model, None);
    }

    #[test]
    fn test_query_string_round_trip_for_load_more() {
        let filters = ProductFilters {
            search: Some("oil filter".to_string()),
            sort: Some(SortOption::Rating),
            ..ProductFilters::default()
        };
        assert_eq!(
            filters.with_page(2).query_string(),
            "search=oil%20filter&sort=rating&page=2"
        );
    }

    #[test]
    fn test_stock_levels() {
        assert_eq!(StockLevel::from_available(0), StockLevel::OutOfStock);
        assert_eq!(StockLevel::from_available(-2), StockLevel::OutOfStock);
        assert_eq!(StockLevel::from_available(3), StockLevel::Critical);
        assert_eq!(StockLevel::from_available(10), StockLevel::Low);
        assert_eq!(StockLevel::from_available(11), StockLevel::InStock);
        assert_eq!(StockLevel::Low.label(), "low stock");
    }
}
