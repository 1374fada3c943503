//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-class errors are
//! captured to Sentry before the error page is rendered; an expired sign-in
//! becomes a redirect to the login page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::api::ApiError;
use crate::stores::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// The REST API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A persisted store could not be written back to the session.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Api(err) => match err {
                ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ApiError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                ApiError::Forbidden => StatusCode::FORBIDDEN,
                ApiError::NotFound => StatusCode::NOT_FOUND,
                ApiError::Conflict => StatusCode::CONFLICT,
                ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                ApiError::Network(_)
                | ApiError::Server { .. }
                | ApiError::Unknown { .. }
                | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
            Self::NotFound(_) => "We couldn't find that page.".to_string(),
            Self::BadRequest(message) => message.clone(),
        }
    }

    const fn is_server_fault(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_fault() || matches!(err, ApiError::Network(_)),
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }
}

/// Standalone error page; it does not depend on the session being readable.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The gateway already cleared the auth store.
        if matches!(self, Self::Api(ApiError::Unauthenticated)) {
            return Redirect::to("/auth/login").into_response();
        }

        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let page = ErrorTemplate {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.user_message(),
        };
        (status, page).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Associate later Sentry events with the signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a customer action so it shows up in the trail of a later error.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");
    }

    #[test]
    fn test_api_errors_map_to_statuses() {
        assert_eq!(status_of(ApiError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ApiError::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ApiError::Conflict.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ApiError::RateLimited { retry_after: None }.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(ApiError::Server { status: 503 }.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::Network("refused".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let response = AppError::from(ApiError::Unauthenticated).into_response();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[LOCATION], "/auth/login");
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Internal("db password is hunter2".to_string());
        assert!(!err.user_message().contains("hunter2"));
        assert_eq!(
            AppError::from(ApiError::Server { status: 503 }).user_message(),
            crate::api::messages::UNAVAILABLE
        );
    }
}
