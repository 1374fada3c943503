//! M-Pesa STK push.

use autoparts_core::OrderId;
use tracing::instrument;

use super::types::{PaymentStatusResponse, StkPushRequest, StkPushResponse};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Ask the API to send an STK push prompt to the customer's phone.
    ///
    /// The API checks `amount` against the order total before prompting.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip_all, fields(order_id = %request.order_id))]
    pub async fn initiate_stk_push(
        &self,
        request: &StkPushRequest,
    ) -> Result<StkPushResponse, ApiError> {
        let response: StkPushResponse = self
            .send_public(&ApiRequest::post("/payments/initiate-stk-push/", request)?)
            .await?;

        if !response.success {
            tracing::warn!(
                response_code = ?response.response_code,
                description = ?response.response_description,
                "STK push was not accepted"
            );
        }
        Ok(response)
    }

    /// Current payment state of an order.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport or status error.
    #[instrument(skip(self))]
    pub async fn check_payment_status(
        &self,
        order_id: OrderId,
    ) -> Result<PaymentStatusResponse, ApiError> {
        let request = ApiRequest::get("/payments/check-status/").param("order_id", order_id);
        self.send_public(&request).await
    }
}
