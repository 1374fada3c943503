//! Catalog endpoints (cached).

use autoparts_core::{CategoryId, MakeId, ModelId, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    Category, ListOrPage, MAX_PAGE_SIZE, Paginated, Product, VehicleMake, VehicleModel,
};
use super::{ApiClient, ApiError, ApiRequest};

/// Query parameters accepted by `GET /products/products/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_make: Option<MakeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<ModelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl ProductQuery {
    fn cache_key(request: &ApiRequest) -> String {
        request
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl ApiClient {
    /// List products. Free-text searches bypass the cache.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Paginated<Product>, ApiError> {
        let request = ApiRequest::get("/products/products/").with_query(query)?;
        let cacheable = query.search.as_deref().is_none_or(|s| s.trim().is_empty());
        let key = CacheKey::Products(ProductQuery::cache_key(&request));

        if cacheable && let Some(CacheValue::Products(page)) = self.cache().get(&key).await {
            return Ok(page);
        }

        let page: Paginated<Product> = self.send_public(&request).await?;
        if cacheable {
            self.cache()
                .insert(key, CacheValue::Products(page.clone()))
                .await;
        }
        Ok(page)
    }

    /// Fetch one product with its gallery and compatibility list.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` for unknown or inactive products.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache().get(&key).await {
            return Ok(*product);
        }

        let product: Product = self
            .send_public(&ApiRequest::get(format!("/products/products/{id}/")))
            .await?;
        self.cache()
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Featured(products)) = self.cache().get(&CacheKey::Featured).await {
            return Ok(products);
        }

        let products = self
            .send_public::<ListOrPage<Product>>(&ApiRequest::get("/products/products/featured/"))
            .await?
            .into_vec();
        self.cache()
            .insert(CacheKey::Featured, CacheValue::Featured(products.clone()))
            .await;
        Ok(products)
    }

    /// All active categories, ordered for display.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache().get(&CacheKey::Categories).await
        {
            return Ok(categories);
        }

        let request = ApiRequest::get("/products/categories/").param("page_size", MAX_PAGE_SIZE);
        let mut categories: Vec<Category> = self
            .send_public::<ListOrPage<Category>>(&request)
            .await?
            .into_vec()
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });

        self.cache()
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    /// All vehicle makes, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip(self))]
    pub async fn vehicle_makes(&self) -> Result<Vec<VehicleMake>, ApiError> {
        if let Some(CacheValue::VehicleMakes(makes)) =
            self.cache().get(&CacheKey::VehicleMakes).await
        {
            return Ok(makes);
        }

        let request = ApiRequest::get("/vehicles/makes/")
            .param("ordering", "name")
            .param("page_size", MAX_PAGE_SIZE);
        let makes = self
            .send_public::<ListOrPage<VehicleMake>>(&request)
            .await?
            .into_vec();

        self.cache()
            .insert(CacheKey::VehicleMakes, CacheValue::VehicleMakes(makes.clone()))
            .await;
        Ok(makes)
    }

    /// Models for one make, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip(self))]
    pub async fn vehicle_models(&self, make: MakeId) -> Result<Vec<VehicleModel>, ApiError> {
        let key = CacheKey::VehicleModels(make);
        if let Some(CacheValue::VehicleModels(models)) = self.cache().get(&key).await {
            return Ok(models);
        }

        let request = ApiRequest::get("/vehicles/models/")
            .param("make", make)
            .param("ordering", "name")
            .param("page_size", MAX_PAGE_SIZE);
        let models = self
            .send_public::<ListOrPage<VehicleModel>>(&request)
            .await?
            .into_vec();

        self.cache()
            .insert(key, CacheValue::VehicleModels(models.clone()))
            .await;
        Ok(models)
    }

    /// Drop all cached catalog data.
    pub async fn invalidate_catalog(&self) {
        self.cache().invalidate_all().await;
    }
}
