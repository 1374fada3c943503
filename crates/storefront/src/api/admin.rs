//! Owner-only analytics, order processing and product management.
//!
//! Every call here requires an owner account; the API answers 403 otherwise.

use autoparts_core::{OrderId, ProductId};
use tracing::instrument;

use super::catalog::ProductQuery;
use super::types::{
    DashboardSummary, ListOrPage, LowStockAlert, Order, OrderFilters, OrderStatusUpdate,
    Paginated, Product, ProductInput, ProfitLine, RevenueAnalytics, StatusBucket, TopProduct,
};
use super::{ApiClient, ApiError, ApiRequest};
use crate::stores::AuthSession;

// =============================================================================
// Analytics
// =============================================================================

impl ApiClient {
    /// Headline numbers for the dashboard.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip_all)]
    pub async fn dashboard(&self, auth: &mut AuthSession) -> Result<DashboardSummary, ApiError> {
        self.send_authed(&ApiRequest::get("/analytics/dashboard/"), auth)
            .await
    }

    /// Revenue for today, this week and this month.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip_all)]
    pub async fn revenue(&self, auth: &mut AuthSession) -> Result<RevenueAnalytics, ApiError> {
        self.send_authed(&ApiRequest::get("/analytics/revenue/"), auth)
            .await
    }

    /// Best sellers by quantity.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip(self, auth))]
    pub async fn top_products(
        &self,
        limit: u32,
        auth: &mut AuthSession,
    ) -> Result<Vec<TopProduct>, ApiError> {
        let request = ApiRequest::get("/analytics/top-products/").param("limit", limit);
        Ok(self
            .send_authed::<ListOrPage<TopProduct>>(&request, auth)
            .await?
            .into_vec())
    }

    /// Products at or below the API's low-stock threshold.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip_all)]
    pub async fn low_stock(&self, auth: &mut AuthSession) -> Result<Vec<LowStockAlert>, ApiError> {
        Ok(self
            .send_authed::<ListOrPage<LowStockAlert>>(
                &ApiRequest::get("/analytics/low-stock/"),
                auth,
            )
            .await?
            .into_vec())
    }

    /// Order counts grouped by order status.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip_all)]
    pub async fn order_status_distribution(
        &self,
        auth: &mut AuthSession,
    ) -> Result<Vec<StatusBucket>, ApiError> {
        self.send_authed(&ApiRequest::get("/analytics/order-status/"), auth)
            .await
    }

    /// Order counts grouped by payment status.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip_all)]
    pub async fn payment_status_distribution(
        &self,
        auth: &mut AuthSession,
    ) -> Result<Vec<StatusBucket>, ApiError> {
        self.send_authed(&ApiRequest::get("/analytics/payment-status/"), auth)
            .await
    }

    /// Revenue, cost and margin per product.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip(self, auth))]
    pub async fn profit_analysis(
        &self,
        limit: u32,
        auth: &mut AuthSession,
    ) -> Result<Vec<ProfitLine>, ApiError> {
        let request = ApiRequest::get("/analytics/profit/").param("limit", limit);
        Ok(self
            .send_authed::<ListOrPage<ProfitLine>>(&request, auth)
            .await?
            .into_vec())
    }
}

// =============================================================================
// Orders
// =============================================================================

impl ApiClient {
    /// All orders, filtered by status.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip(self, auth))]
    pub async fn admin_orders(
        &self,
        filters: &OrderFilters,
        auth: &mut AuthSession,
    ) -> Result<Paginated<Order>, ApiError> {
        let request = ApiRequest::get("/orders/admin/orders/").with_query(filters)?;
        self.send_authed(&request, auth).await
    }

    /// Move an order to a new status. The API enforces allowed transitions.
    ///
    /// # Errors
    ///
    /// `ApiError::InvalidRequest` for a disallowed transition.
    #[instrument(skip(self, auth), fields(status = %update.order_status))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        update: &OrderStatusUpdate,
        auth: &mut AuthSession,
    ) -> Result<Order, ApiError> {
        let request = ApiRequest::patch(format!("/orders/admin/orders/{id}/"), update)?;
        let order: Order = self.send_authed(&request, auth).await?;
        tracing::info!(order_number = %order.order_number, status = %order.order_status, "Order status updated");
        Ok(order)
    }
}

// =============================================================================
// Products
// =============================================================================

impl ApiClient {
    /// Product listing for the admin table. Never cached, so edits show up
    /// immediately.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip(self, auth))]
    pub async fn admin_products(
        &self,
        query: &ProductQuery,
        auth: &mut AuthSession,
    ) -> Result<Paginated<Product>, ApiError> {
        let request = ApiRequest::get("/products/products/").with_query(query)?;
        self.send_authed(&request, auth).await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// `ApiError::InvalidRequest` with field messages (duplicate SKU, missing
    /// price).
    #[instrument(skip_all, fields(sku = ?input.sku))]
    pub async fn create_product(
        &self,
        input: &ProductInput,
        auth: &mut AuthSession,
    ) -> Result<Product, ApiError> {
        let request = ApiRequest::post("/products/products/", input)?;
        let product: Product = self.send_authed(&request, auth).await?;
        self.cache().invalidate_products().await;
        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Patch a product. Absent fields are left unchanged.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::create_product`].
    #[instrument(skip(self, input, auth))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        auth: &mut AuthSession,
    ) -> Result<Product, ApiError> {
        let request = ApiRequest::patch(format!("/products/products/{id}/"), input)?;
        let product: Product = self.send_authed(&request, auth).await?;
        self.cache().invalidate_products().await;
        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip(self, auth))]
    pub async fn delete_product(
        &self,
        id: ProductId,
        auth: &mut AuthSession,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::delete(format!("/products/products/{id}/"));
        let _: serde_json::Value = self.send_authed(&request, auth).await?;
        self.cache().invalidate_products().await;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
