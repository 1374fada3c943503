//! Saved-for-later products.

use autoparts_core::{Ksh, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PersistedStore;
use crate::api::Product;

/// Snapshot of a favorited product, enough to render a card without a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteProduct {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: Ksh,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl FavoriteProduct {
    /// Price after the snapshot discount.
    #[must_use]
    pub fn effective_price(&self) -> Ksh {
        self.price.discounted(self.discount_percentage)
    }
}

impl From<&Product> for FavoriteProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            price: product.price,
            discount_percentage: product.discount_percentage,
            primary_image: product.image_url().map(str::to_string),
            category: product.category_name().map(str::to_string),
        }
    }
}

/// Favorites persisted under `autoparts-favorites`, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesStore {
    #[serde(default)]
    favorites: Vec<FavoriteProduct>,
}

impl PersistedStore for FavoritesStore {
    const KEY: &'static str = "autoparts-favorites";
    const VERSION: u32 = 1;
}

impl FavoritesStore {
    /// Add a product. Adding one that is already present changes nothing.
    pub fn add(&mut self, product: FavoriteProduct) {
        if !self.contains(product.id) {
            self.favorites.push(product);
        }
    }

    pub fn remove(&mut self, id: ProductId) {
        self.favorites.retain(|fav| fav.id != id);
    }

    /// Flip membership; returns whether the product is now a favorite.
    pub fn toggle(&mut self, product: FavoriteProduct) -> bool {
        if self.contains(product.id) {
            self.remove(product.id);
            false
        } else {
            self.favorites.push(product);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.favorites.iter().any(|fav| fav.id == id)
    }

    pub fn clear(&mut self) {
        self.favorites.clear();
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.favorites.len()
    }

    #[must_use]
    pub fn items(&self) -> &[FavoriteProduct] {
        &self.favorites
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn favorite(id: i64) -> FavoriteProduct {
        FavoriteProduct {
            id: ProductId::new(id),
            name: "Air filter".to_string(),
            sku: format!("AF-{id}"),
            price: Ksh::from_shillings(1_200),
            discount_percentage: Decimal::from(25),
            primary_image: None,
            category: Some("Filters".to_string()),
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = FavoritesStore::default();
        store.add(favorite(1));
        store.add(favorite(1));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_toggle_reports_membership() {
        let mut store = FavoritesStore::default();
        assert!(store.toggle(favorite(3)));
        assert!(store.contains(ProductId::new(3)));
        assert!(!store.toggle(favorite(3)));
        assert!(!store.contains(ProductId::new(3)));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = FavoritesStore::default();
        store.add(favorite(1));
        store.add(favorite(2));
        store.remove(ProductId::new(1));
        assert_eq!(store.items()[0].id, ProductId::new(2));
        store.remove(ProductId::new(42));
        assert_eq!(store.count(), 1);
        store.clear();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(favorite(1).effective_price(), Ksh::from_shillings(900));
    }
}
