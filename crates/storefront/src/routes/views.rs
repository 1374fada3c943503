//! Display data for templates.
//!
//! Prices and dates are formatted here so templates only print strings.

use autoparts_core::format::{
    format_date_short, format_datetime, format_discount_percentage, format_rating, format_sku,
};
use autoparts_core::{OrderStatus, PaymentStatus, ProductId, format_phone_display};

use crate::api::{Order, Product};
use crate::catalog::StockLevel;
use crate::stores::{CartLine, CartStore, FavoriteProduct};

// =============================================================================
// Products
// =============================================================================

/// A product in a grid.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: String,
    /// Price before discount, shown struck through.
    pub original_price: Option<String>,
    pub discount_label: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub in_stock: bool,
    pub stock_label: &'static str,
    pub stock_class: &'static str,
    pub rating: String,
    pub is_favorite: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, is_favorite: bool) -> Self {
        let stock = StockLevel::from_available(product.available());
        Self {
            id: product.id,
            name: product.name.clone(),
            sku: format_sku(&product.sku),
            price: product.effective_price().display(),
            original_price: product.has_discount().then(|| product.price.display()),
            discount_label: format_discount_percentage(product.discount_percentage),
            image: product.image_url().map(str::to_string),
            category: product.category_name().map(str::to_string),
            in_stock: product.in_stock(),
            stock_label: stock.label(),
            stock_class: stock.badge_class(),
            rating: format_rating(product.rating),
            is_favorite,
        }
    }

    /// Card for a saved favorite; stock is unknown until the product is opened.
    #[must_use]
    pub fn from_favorite(favorite: &FavoriteProduct) -> Self {
        let discounted = favorite.effective_price();
        Self {
            id: favorite.id,
            name: favorite.name.clone(),
            sku: format_sku(&favorite.sku),
            price: discounted.display(),
            original_price: (discounted != favorite.price).then(|| favorite.price.display()),
            discount_label: format_discount_percentage(favorite.discount_percentage),
            image: favorite.primary_image.clone(),
            category: favorite.category.clone(),
            in_stock: true,
            stock_label: "",
            stock_class: "",
            rating: format_rating(None),
            is_favorite: true,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    pub image: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.product_name.clone(),
            sku: format_sku(&line.sku),
            unit_price: line.unit_price.display(),
            quantity: line.quantity,
            line_total: line.line_total().display(),
            image: line.image.clone(),
        }
    }
}

/// Cart summary. Totals come straight from the store's computed reads.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub delivery_tier: Option<String>,
    pub delivery_label: String,
    pub delivery_fee: String,
    pub total: String,
}

impl From<&CartStore> for CartView {
    fn from(cart: &CartStore) -> Self {
        let delivery = cart.delivery();
        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal().display(),
            delivery_tier: delivery.map(|d| d.tier.as_str().to_string()),
            delivery_label: delivery.map_or_else(
                || "Choose at checkout".to_string(),
                |d| d.tier.label().to_string(),
            ),
            delivery_fee: cart.delivery_fee().display(),
            total: cart.total().display(),
        }
    }
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub name: String,
    pub sku: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// An order row or detail page.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: i64,
    pub order_number: String,
    pub placed_on: String,
    pub placed_at: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub units: u32,
    pub subtotal: String,
    pub delivery: String,
    pub total: String,
    pub recipient: String,
    pub recipient_phone: String,
    pub address: String,
    pub contact_email: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            order_number: order.order_number.clone(),
            placed_on: format_date_short(order.created_at),
            placed_at: format_datetime(order.created_at),
            status: order.order_status,
            payment_status: order.payment_status,
            units: order.units(),
            subtotal: order.subtotal.display(),
            delivery: order.delivery_cost.display(),
            total: order.total_amount.display(),
            recipient: order.recipient_name.clone(),
            recipient_phone: format_phone_display(&order.recipient_phone),
            address: autoparts_core::format::format_address(
                &order.delivery_address,
                &order.delivery_city,
                &order.delivery_postal_code,
                None,
            ),
            contact_email: order.contact_email().map(str::to_string),
            notes: order.customer_notes.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    sku: format_sku(&item.sku),
                    unit_price: item.unit_price.display(),
                    quantity: item.quantity,
                    line_total: item.line_total.display(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autoparts_core::{DeliveryTier, Ksh};

    use super::*;

    fn product(discount: i64, stock: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 5,
            "name": "Oil filter",
            "sku": "of-5",
            "price": 2000,
            "discount_percentage": discount,
            "stock": stock
        }))
        .unwrap()
    }

    #[test]
    fn test_card_shows_discount() {
        let card = ProductCard::new(&product(10, 2), false);
        assert_eq!(card.price, "KSh 1,800");
        assert_eq!(card.original_price.as_deref(), Some("KSh 2,000"));
        assert_eq!(card.discount_label, "10% off");
        assert_eq!(card.sku, "OF-5");
        assert_eq!(card.stock_label, "critical");
    }

    #[test]
    fn test_card_without_discount() {
        let card = ProductCard::new(&product(0, 0), true);
        assert_eq!(card.original_price, None);
        assert!(!card.in_stock);
        assert!(card.is_favorite);
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = CartStore::default();
        cart.add_item(CartLine {
            product_id: ProductId::new(1),
            product_name: "Brake pads".to_string(),
            sku: "bp-1".to_string(),
            unit_price: Ksh::from_shillings(1_500),
            quantity: 2,
            image: None,
        });
        cart.set_delivery(DeliveryTier::Express.into());

        let view = CartView::from(&cart);
        assert_eq!(view.subtotal, "KSh 3,000");
        assert_eq!(view.delivery_fee, "KSh 3,000");
        assert_eq!(view.total, "KSh 6,000");
        assert_eq!(view.delivery_tier.as_deref(), Some("express"));
        assert_eq!(view.lines[0].line_total, "KSh 3,000");
    }
}
