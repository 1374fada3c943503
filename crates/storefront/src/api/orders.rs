//! Checkout and order history.

use tracing::instrument;

use super::types::{CheckoutRequest, CheckoutResponse, Order, OrderFilters, Paginated};
use super::{ApiClient, ApiError, ApiRequest};
use crate::stores::AuthSession;

impl ApiClient {
    /// Place an order.
    ///
    /// Signed-in customers check out with their bearer token; guests post the
    /// same body with `guest_email`/`guest_phone` set and no credentials.
    ///
    /// # Errors
    ///
    /// `ApiError::InvalidRequest` for stock or address problems, otherwise the
    /// mapped transport or status error.
    #[instrument(skip_all, fields(items = request.items.len(), tier = %request.delivery_type))]
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
        auth: &mut AuthSession,
    ) -> Result<CheckoutResponse, ApiError> {
        let api_request = ApiRequest::post("/orders/checkout/", request)?;
        let response: CheckoutResponse = if auth.is_authenticated() {
            self.send_authed(&api_request, auth).await?
        } else {
            self.send_public(&api_request).await?
        };

        tracing::info!(
            order_number = %response.order_number,
            total = %response.total_amount,
            "Order placed"
        );
        Ok(response)
    }

    /// The signed-in customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    #[instrument(skip(self, auth))]
    pub async fn my_orders(
        &self,
        filters: &OrderFilters,
        auth: &mut AuthSession,
    ) -> Result<Paginated<Order>, ApiError> {
        let request = ApiRequest::get("/orders/my-orders/").with_query(filters)?;
        self.send_authed(&request, auth).await
    }

    /// One of the signed-in customer's orders, by order number.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` when the order does not exist or belongs to
    /// someone else.
    #[instrument(skip(self, auth))]
    pub async fn order_detail(
        &self,
        order_number: &str,
        auth: &mut AuthSession,
    ) -> Result<Order, ApiError> {
        let path = format!("/orders/order/{}/", urlencoding::encode(order_number));
        self.send_authed(&ApiRequest::get(path), auth).await
    }
}
