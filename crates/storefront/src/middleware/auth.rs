//! Authentication extractors.
//!
//! Each extractor loads the `AuthSession` store from the visitor's session.
//! Handlers that call the API with it must save it back afterwards, since a
//! refresh or a forced logout may have changed it.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::stores::{self, AuthSession};

/// Login page URL that returns to `next` afterwards.
#[must_use]
pub fn login_redirect_url(next: &str) -> String {
    match safe_next(next) {
        Some(next) if next != "/" => format!("/auth/login?next={}", urlencoding::encode(next)),
        _ => "/auth/login".to_string(),
    }
}

/// Accept only same-site relative paths as a post-login destination.
#[must_use]
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    (next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')).then_some(next)
}

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in (or not an owner): go to the login page.
    RedirectToLogin { next: String },
    /// The session layer is missing from the stack.
    NoSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                Redirect::to(&login_redirect_url(&next)).into_response()
            }
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

async fn load_auth(parts: &Parts) -> Result<AuthSession, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::NoSession)?;
    Ok(stores::load::<AuthSession>(session).await)
}

fn redirect_for(parts: &Parts) -> AuthRejection {
    let next = parts
        .uri
        .path_and_query()
        .map_or_else(|| "/".to_string(), ToString::to_string);
    AuthRejection::RedirectToLogin { next }
}

/// A signed-in visitor.
pub struct RequireAuth(pub AuthSession);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = load_auth(parts).await?;
        if auth.is_authenticated() {
            Ok(Self(auth))
        } else {
            Err(redirect_for(parts))
        }
    }
}

/// A signed-in owner. Everyone else is sent to the login page.
pub struct RequireOwner(pub AuthSession);

impl<S> FromRequestParts<S> for RequireOwner
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = load_auth(parts).await?;
        if auth.is_owner() {
            Ok(Self(auth))
        } else {
            if auth.is_authenticated() {
                tracing::warn!(path = %parts.uri.path(), "Non-owner requested an admin page");
            }
            Err(redirect_for(parts))
        }
    }
}

/// The auth store whether or not anyone is signed in.
pub struct OptionalAuth(pub AuthSession);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        load_auth(parts).await.map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_offsite() {
        assert_eq!(safe_next("/orders"), Some("/orders"));
        assert_eq!(safe_next("//evil.example"), None);
        assert_eq!(safe_next("https://evil.example"), None);
        assert_eq!(safe_next("/\\evil.example"), None);
    }

    #[test]
    fn test_login_redirect_url() {
        assert_eq!(login_redirect_url("/"), "/auth/login");
        assert_eq!(
            login_redirect_url("/orders?page=2"),
            "/auth/login?next=%2Forders%3Fpage%3D2"
        );
        assert_eq!(login_redirect_url("//x"), "/auth/login");
    }
}
