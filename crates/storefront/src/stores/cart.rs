//! Shopping cart.
//!
//! Prices are snapshots taken when the item was added; the API re-prices
//! everything at checkout. Totals are never stored: `subtotal`, `delivery_fee`
//! and `total` are computed from the lines and delivery choice on every call.

use autoparts_core::{DeliveryTier, Ksh, ProductId};
use serde::{Deserialize, Serialize};

use super::PersistedStore;
use crate::api::CheckoutItem;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Ksh,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Ksh {
        self.unit_price.times(self.quantity)
    }
}

/// The selected delivery tier and the flat fee it costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryChoice {
    pub tier: DeliveryTier,
    pub flat_fee: Ksh,
}

impl From<DeliveryTier> for DeliveryChoice {
    fn from(tier: DeliveryTier) -> Self {
        Self {
            tier,
            flat_fee: tier.fee(),
        }
    }
}

/// Cart state persisted under `autoparts-cart`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartStore {
    #[serde(default)]
    lines: Vec<CartLine>,
    #[serde(default)]
    delivery: Option<DeliveryChoice>,
    #[serde(default)]
    guest_email: Option<String>,
    #[serde(default)]
    guest_phone: Option<String>,
}

impl PersistedStore for CartStore {
    const KEY: &'static str = "autoparts-cart";
    const VERSION: u32 = 1;
}

impl CartStore {
    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a line, merging with an existing line for the same product.
    ///
    /// A line with quantity 0 is ignored.
    pub fn add_item(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => self.lines.push(line),
        }
    }

    /// Remove the line for `product_id`, if any.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) {
        let Ok(quantity) = u32::try_from(quantity) else {
            if quantity <= 0 {
                self.remove_item(product_id);
            }
            return;
        };
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    /// Choose a delivery tier, replacing any earlier choice.
    pub fn set_delivery(&mut self, choice: DeliveryChoice) {
        self.delivery = Some(choice);
    }

    pub fn clear_delivery(&mut self) {
        self.delivery = None;
    }

    /// Remember the guest's contact details for checkout.
    pub fn set_guest_info(&mut self, email: impl Into<String>, phone: impl Into<String>) {
        self.guest_email = Some(email.into());
        self.guest_phone = Some(phone.into());
    }

    /// Empty the cart, dropping the delivery choice and guest contact too.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    #[must_use]
    pub const fn delivery(&self) -> Option<DeliveryChoice> {
        self.delivery
    }

    #[must_use]
    pub fn guest_email(&self) -> Option<&str> {
        self.guest_email.as_deref()
    }

    #[must_use]
    pub fn guest_phone(&self) -> Option<&str> {
        self.guest_phone.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines (the header badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Number of distinct products.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// `Σ unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Ksh {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Flat fee of the chosen tier, or zero when none is chosen.
    #[must_use]
    pub fn delivery_fee(&self) -> Ksh {
        self.delivery.map_or_else(Ksh::zero, |d| d.flat_fee)
    }

    /// `subtotal + delivery_fee`.
    #[must_use]
    pub fn total(&self) -> Ksh {
        self.subtotal() + self.delivery_fee()
    }

    /// Lines in the shape the checkout endpoint expects.
    #[must_use]
    pub fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.lines
            .iter()
            .map(|line| CheckoutItem {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect()
    }
}
