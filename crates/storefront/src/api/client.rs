//! HTTP transport and the 401 refresh policy.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::ApiError;
use super::cache::CatalogCache;
use crate::config::ApiConfig;
use crate::stores::AuthSession;

/// A request to the REST API, kept as plain data so it can be re-sent
/// verbatim after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the API base, with leading and trailing slashes
    /// (`/products/products/`).
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `DELETE path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the body cannot be serialized.
    pub fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ApiError> {
        Self::new(Method::POST, path).with_body(body)
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the body cannot be serialized.
    pub fn patch(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ApiError> {
        Self::new(Method::PATCH, path).with_body(body)
    }

    fn with_body(mut self, body: &impl Serialize) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Append the fields of a flat struct as query parameters.
    ///
    /// `None` fields are skipped; nested values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if `params` does not serialize to an object.
    pub fn with_query(mut self, params: &impl Serialize) -> Result<Self, ApiError> {
        match serde_json::to_value(params)? {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let rendered = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Number(n) => n.to_string(),
                        serde_json::Value::Bool(b) => b.to_string(),
                        _ => continue,
                    };
                    self.query.push((key, rendered));
                }
                Ok(self)
            }
            serde_json::Value::Null => Ok(self),
            other => Err(ApiError::Decode(format!(
                "query parameters must be an object, got {other}"
            ))),
        }
    }

    /// Append a single query parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Client for the AutoParts REST API.
///
/// Cheap to clone; all clones share one connection pool and one catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    cache: CatalogCache,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache: CatalogCache::new(),
            }),
        })
    }

    pub(super) fn cache(&self) -> &CatalogCache {
        &self.inner.cache
    }

    /// Send a request without credentials.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] for transport failures, non-success
    /// statuses, or bodies that do not decode as `T`.
    pub async fn send_public<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        self.dispatch(request, None).await
    }

    /// Send a request on behalf of a signed-in user.
    ///
    /// A 401 triggers exactly one refresh with the stored refresh token and
    /// one re-send. When there is no refresh token, the refresh fails, or the
    /// re-sent request is rejected again, `auth` is logged out and
    /// [`ApiError::Unauthenticated`] is returned. Other errors are returned
    /// untouched and never retried.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_public`].
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn send_authed<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        auth: &mut AuthSession,
    ) -> Result<T, ApiError> {
        match self.dispatch(request, auth.access_token()).await {
            Err(ApiError::Unauthenticated) => {}
            other => return other,
        }

        let Some(refresh) = auth.refresh_token().map(str::to_owned) else {
            tracing::info!("Access token rejected and no refresh token stored; logging out");
            auth.logout();
            return Err(ApiError::Unauthenticated);
        };

        match self.refresh_token(&refresh).await {
            Ok(access) => auth.set_access_token(access),
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed; logging out");
                auth.logout();
                return Err(ApiError::Unauthenticated);
            }
        }

        let retried = self.dispatch(request, auth.access_token()).await;
        if matches!(retried, Err(ApiError::Unauthenticated)) {
            tracing::warn!("Refreshed token rejected; logging out");
            auth.logout();
        }
        retried
    }

    /// Issue one HTTP request and decode the response.
    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, %url, "AutoParts API request failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        let text = response.text().await.map_err(|e| {
            tracing::warn!(error = %e, %url, "Failed to read AutoParts API response body");
            ApiError::Network(e.to_string())
        })?;

        if !status.is_success() {
            let mut err = ApiError::from_status(status, &text);
            if let ApiError::RateLimited { retry_after: slot } = &mut err {
                *slot = retry_after;
            }
            if err.is_server_fault() {
                tracing::error!(
                    status = %status,
                    body = %text.chars().take(500).collect::<String>(),
                    "AutoParts API returned server error"
                );
            } else {
                tracing::debug!(status = %status, %url, "AutoParts API returned error status");
            }
            return Err(err);
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to decode AutoParts API response"
            );
            ApiError::Decode(e.to_string())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::OrderFilters;
    use autoparts_core::OrderStatus;

    #[test]
    fn test_with_query_skips_none_and_renders_scalars() {
        let filters = OrderFilters {
            order_status: Some(OrderStatus::Shipped),
            payment_status: None,
            page: Some(2),
            page_size: None,
        };
        let request = ApiRequest::get("/orders/my-orders/")
            .with_query(&filters)
            .unwrap();
        assert_eq!(
            request.query,
            vec![
                ("order_status".to_string(), "shipped".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_with_query_rejects_non_object() {
        assert!(ApiRequest::get("/x/").with_query(&[1, 2]).is_err());
    }

    #[test]
    fn test_post_captures_body() {
        let request = ApiRequest::post("/users/token/refresh/", &serde_json::json!({"refresh": "r"}))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap()["refresh"], "r");
    }
}
