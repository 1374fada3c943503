//! Gateway to the AutoParts REST API.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per process, shared through `AppState`
//! - The API is the source of truth: no local persistence of catalog or orders
//! - Catalog reads are cached in-memory via `moka` (products 5 min, vehicles
//!   and categories 24 h); admin product mutations invalidate the cache
//! - Authenticated calls go through [`ApiClient::send_authed`], which owns the
//!   single 401 → refresh → retry attempt
//!
//! # Example
//!
//! ```rust,ignore
//! use autoparts_storefront::api::{ApiClient, ProductQuery};
//!
//! let client = ApiClient::new(&config.api)?;
//! let page = client.products(&ProductQuery::default()).await?;
//! let order = client.checkout(&request, &mut auth).await?;
//! ```

mod admin;
mod auth;
mod cache;
mod catalog;
mod client;
mod orders;
mod payments;
pub mod types;

pub use catalog::ProductQuery;
pub use client::{ApiClient, ApiRequest};
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the REST API gateway.
///
/// Only [`ApiError::Unauthenticated`] triggers recovery (inside
/// [`ApiClient::send_authed`]); every other variant is shown to the user as a
/// transient notification and never retried.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// 400 with optional per-field messages.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// First field message, `detail`, or a generic fallback.
        message: String,
        /// Field name to first message, in the order the API sent them.
        fields: Vec<(String, String)>,
    },

    /// 401, or a failed refresh.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// 403.
    #[error("Forbidden")]
    Forbidden,

    /// 404.
    #[error("Not found")]
    NotFound,

    /// 409.
    #[error("Conflict")]
    Conflict,

    /// 429.
    #[error("Rate limited (retry after {retry_after:?}s)")]
    RateLimited {
        /// Seconds from the `Retry-After` header, when present.
        retry_after: Option<u64>,
    },

    /// 500 or 503. Other 5xx statuses are [`ApiError::Unknown`].
    #[error("Server error (HTTP {status})")]
    Server {
        /// HTTP status code.
        status: u16,
    },

    /// Any other non-success status.
    #[error("Unexpected response (HTTP {status})")]
    Unknown {
        /// HTTP status code.
        status: u16,
    },

    /// A success response whose body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Taxonomy class of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Network,
    InvalidRequest,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    Server,
    Unknown,
}

/// Messages shown to customers.
pub mod messages {
    pub const NETWORK: &str = "Network error. Please check your connection.";
    pub const INVALID_REQUEST: &str = "Invalid request. Please check your input.";
    pub const UNAUTHENTICATED: &str = "Invalid email or password";
    pub const FORBIDDEN: &str = "You do not have permission to perform this action.";
    pub const NOT_FOUND: &str = "Resource not found.";
    pub const CONFLICT: &str = "Conflict. This item may already exist.";
    pub const RATE_LIMITED: &str = "Too many requests. Please try again later.";
    pub const SERVER: &str = "Server error. Please try again later.";
    pub const UNAVAILABLE: &str = "Service temporarily unavailable. Please try again later.";
    pub const GENERIC: &str = "Something went wrong";
}

impl ApiError {
    /// Map a non-success HTTP status and its body to the taxonomy.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 => {
                let fields = parse_field_errors(body);
                let message = fields
                    .first()
                    .map_or_else(|| messages::INVALID_REQUEST.to_string(), |(_, m)| m.clone());
                Self::InvalidRequest { message, fields }
            }
            401 => Self::Unauthenticated,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited { retry_after: None },
            status @ (500 | 503) => Self::Server { status },
            status => Self::Unknown { status },
        }
    }

    /// Taxonomy class.
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Network(_) => ApiErrorKind::Network,
            Self::InvalidRequest { .. } => ApiErrorKind::InvalidRequest,
            Self::Unauthenticated => ApiErrorKind::Unauthenticated,
            Self::Forbidden => ApiErrorKind::Forbidden,
            Self::NotFound => ApiErrorKind::NotFound,
            Self::Conflict => ApiErrorKind::Conflict,
            Self::RateLimited { .. } => ApiErrorKind::RateLimited,
            Self::Server { .. } => ApiErrorKind::Server,
            Self::Unknown { .. } | Self::Decode(_) => ApiErrorKind::Unknown,
        }
    }

    /// Message suitable for a customer-facing notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => messages::NETWORK.to_string(),
            Self::InvalidRequest { message, .. } => message.clone(),
            Self::Unauthenticated => messages::UNAUTHENTICATED.to_string(),
            Self::Forbidden => messages::FORBIDDEN.to_string(),
            Self::NotFound => messages::NOT_FOUND.to_string(),
            Self::Conflict => messages::CONFLICT.to_string(),
            Self::RateLimited { .. } => messages::RATE_LIMITED.to_string(),
            Self::Server { status: 503 } => messages::UNAVAILABLE.to_string(),
            Self::Server { .. } => messages::SERVER.to_string(),
            Self::Unknown { .. } | Self::Decode(_) => messages::GENERIC.to_string(),
        }
    }

    /// Message for a specific form field, if the API reported one.
    #[must_use]
    pub fn field_message(&self, field: &str) -> Option<&str> {
        match self {
            Self::InvalidRequest { fields, .. } => fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, message)| message.as_str()),
            _ => None,
        }
    }

    /// Whether this error indicates a fault on the API side worth reporting.
    ///
    /// Gateway failures (502, 504) count even though customers see the
    /// generic message for them.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        match self {
            Self::Server { .. } | Self::Decode(_) => true,
            Self::Unknown { status } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Extract field messages from a 400 body.
///
/// Accepts `{"field": ["msg", ...]}`, `{"field": "msg"}` and
/// `{"detail": "msg"}`. Keys keep the order the API sent them.
fn parse_field_errors(body: &str) -> Vec<(String, String)> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return Vec::new();
    };

    map.into_iter()
        .filter_map(|(field, value)| {
            let message = match value {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Array(items) => items.into_iter().find_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                }),
                _ => None,
            }?;
            Some((field, message))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (401, ApiErrorKind::Unauthenticated),
            (403, ApiErrorKind::Forbidden),
            (404, ApiErrorKind::NotFound),
            (409, ApiErrorKind::Conflict),
            (429, ApiErrorKind::RateLimited),
            (500, ApiErrorKind::Server),
            (503, ApiErrorKind::Server),
            (502, ApiErrorKind::Unknown),
            (504, ApiErrorKind::Unknown),
            (418, ApiErrorKind::Unknown),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ApiError::from_status(status, "").kind(), kind, "status {code}");
        }
    }

    #[test]
    fn test_gateway_errors_get_generic_message() {
        let unavailable = ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(unavailable.user_message(), messages::UNAVAILABLE);

        let gateway = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(gateway.user_message(), messages::GENERIC);
        assert!(gateway.is_server_fault());

        let timeout = ApiError::from_status(StatusCode::GATEWAY_TIMEOUT, "");
        assert_eq!(timeout.user_message(), messages::GENERIC);
        assert!(!ApiError::from_status(StatusCode::IM_A_TEAPOT, "").is_server_fault());
    }

    #[test]
    fn test_field_errors_first_wins_in_body_order() {
        let body = r#"{"recipient_phone": ["Enter a valid phone number."], "delivery_city": "Required."}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.user_message(), "Enter a valid phone number.");
        assert_eq!(err.field_message("delivery_city"), Some("Required."));
        assert_eq!(err.field_message("missing"), None);
    }

    #[test]
    fn test_detail_message() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail": "Out of stock."}"#);
        assert_eq!(err.user_message(), "Out of stock.");
    }

    #[test]
    fn test_bad_request_without_body_uses_fallback() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert_eq!(err.user_message(), messages::INVALID_REQUEST);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ApiError::Server { status: 503 }.user_message(),
            messages::UNAVAILABLE
        );
        assert_eq!(ApiError::Server { status: 500 }.user_message(), messages::SERVER);
        assert_eq!(
            ApiError::Network("connection refused".into()).user_message(),
            messages::NETWORK
        );
        assert_eq!(ApiError::Decode("eof".into()).user_message(), messages::GENERIC);
        assert_eq!(ApiError::Unauthenticated.user_message(), messages::UNAUTHENTICATED);
    }
}
