//! Account endpoints: login, registration, token refresh and profile.

use tracing::instrument;

use super::types::{
    LoginRequest, LoginResponse, ProfileResponse, RegisterRequest, TokenRefreshRequest,
    TokenRefreshResponse, UpdateProfileRequest,
};
use super::{ApiClient, ApiError, ApiRequest};
use crate::stores::AuthSession;

impl ApiClient {
    /// Exchange credentials for tokens and the user record.
    ///
    /// # Errors
    ///
    /// `ApiError::Unauthenticated` for bad credentials, otherwise the mapped
    /// transport or status error.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.send_public(&ApiRequest::post("/users/token/", request)?)
            .await
    }

    /// Create an account. The API signs the new user in immediately.
    ///
    /// # Errors
    ///
    /// `ApiError::InvalidRequest` carries per-field messages (duplicate
    /// email, weak password).
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<LoginResponse, ApiError> {
        self.send_public(&ApiRequest::post("/users/register/", request)?)
            .await
    }

    /// Trade a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns the mapped error when the refresh token is expired or revoked.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, refresh: &str) -> Result<String, ApiError> {
        let body = TokenRefreshRequest {
            refresh: refresh.to_string(),
        };
        let response: TokenRefreshResponse = self
            .send_public(&ApiRequest::post("/users/token/refresh/", &body)?)
            .await?;
        Ok(response.access)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    pub async fn get_profile(&self, auth: &mut AuthSession) -> Result<ProfileResponse, ApiError> {
        self.send_authed(&ApiRequest::get("/users/profile/"), auth)
            .await
    }

    /// Patch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_authed`].
    pub async fn update_profile(
        &self,
        update: &UpdateProfileRequest,
        auth: &mut AuthSession,
    ) -> Result<ProfileResponse, ApiError> {
        self.send_authed(&ApiRequest::patch("/users/profile/", update)?, auth)
            .await
    }
}
