//! In-memory cache for catalog reads.
//!
//! Products change often (stock, price) so they live for 5 minutes. Vehicle
//! makes, models and categories are reference data and live for 24 hours.

use std::time::Duration;

use autoparts_core::{MakeId, ProductId};
use moka::future::Cache;

use super::types::{Category, Paginated, Product, VehicleMake, VehicleModel};

const PRODUCT_TTL: Duration = Duration::from_secs(5 * 60);
const REFERENCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    /// A product listing, keyed by its encoded query string.
    Products(String),
    Featured,
    Categories,
    VehicleMakes,
    VehicleModels(MakeId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Paginated<Product>),
    Featured(Vec<Product>),
    Categories(Vec<Category>),
    VehicleMakes(Vec<VehicleMake>),
    VehicleModels(Vec<VehicleModel>),
}

/// Two-tier catalog cache.
pub struct CatalogCache {
    products: Cache<CacheKey, CacheValue>,
    reference: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            products: Cache::builder()
                .max_capacity(1000)
                .time_to_live(PRODUCT_TTL)
                .build(),
            reference: Cache::builder()
                .max_capacity(200)
                .time_to_live(REFERENCE_TTL)
                .build(),
        }
    }

    fn tier(&self, key: &CacheKey) -> &Cache<CacheKey, CacheValue> {
        match key {
            CacheKey::Product(_) | CacheKey::Products(_) | CacheKey::Featured => &self.products,
            CacheKey::Categories | CacheKey::VehicleMakes | CacheKey::VehicleModels(_) => {
                &self.reference
            }
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.tier(key).get(key).await
    }

    pub async fn insert(&self, key: CacheKey, value: CacheValue) {
        self.tier(&key).insert(key, value).await;
    }

    /// Drop every cached product and listing.
    ///
    /// Called after an admin creates, edits or deletes a product.
    pub async fn invalidate_products(&self) {
        self.products.invalidate_all();
        self.products.run_pending_tasks().await;
    }

    /// Drop everything.
    pub async fn invalidate_all(&self) {
        self.products.invalidate_all();
        self.reference.invalidate_all();
        self.products.run_pending_tasks().await;
        self.reference.run_pending_tasks().await;
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_products_keeps_reference_data() {
        let cache = CatalogCache::new();
        cache
            .insert(CacheKey::Featured, CacheValue::Featured(Vec::new()))
            .await;
        cache
            .insert(CacheKey::Categories, CacheValue::Categories(Vec::new()))
            .await;

        cache.invalidate_products().await;

        assert!(cache.get(&CacheKey::Featured).await.is_none());
        assert!(matches!(
            cache.get(&CacheKey::Categories).await,
            Some(CacheValue::Categories(_))
        ));
    }
}
