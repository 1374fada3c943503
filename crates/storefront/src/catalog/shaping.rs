//! Reshaping lists that were already fetched, without another API call.

use std::cmp::Ordering;

use autoparts_core::OrderStatus;

use super::SortOption;
use crate::api::{Order, Product};

/// Keep only products with units available.
#[must_use]
pub fn filter_in_stock(products: Vec<Product>) -> Vec<Product> {
    products.into_iter().filter(Product::in_stock).collect()
}

/// Stable sort by the given option. Missing values sort last.
pub fn sort_products(products: &mut [Product], sort: SortOption) {
    match sort {
        SortOption::Newest => products.sort_by(|a, b| desc_option(a.created_at, b.created_at)),
        SortOption::PriceAsc => products.sort_by_key(Product::effective_price),
        SortOption::PriceDesc => {
            products.sort_by(|a, b| b.effective_price().cmp(&a.effective_price()));
        }
        SortOption::Popular => products.sort_by(|a, b| desc_option(a.sales_count, b.sales_count)),
        SortOption::Rating => products.sort_by(|a, b| match (a.rating, b.rating) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
}

fn desc_option<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Orders with the given status, or all of them for `None`.
#[must_use]
pub fn filter_orders_by_status(orders: &[Order], status: Option<OrderStatus>) -> Vec<&Order> {
    orders
        .iter()
        .filter(|order| status.is_none_or(|s| order.order_status == s))
        .collect()
}

/// How many orders are in each status, in display order, including zeros.
#[must_use]
pub fn status_counts(orders: &[Order]) -> Vec<(OrderStatus, usize)> {
    OrderStatus::ALL
        .iter()
        .map(|&status| {
            let count = orders.iter().filter(|o| o.order_status == status).count();
            (status, count)
        })
        .collect()
}
