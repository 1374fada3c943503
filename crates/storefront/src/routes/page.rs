//! Data every full page needs for the layout.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use tower_sessions::Session;

use crate::flash::{self, Flash};
use crate::middleware::CspNonce;
use crate::stores::{self, AuthSession, CartStore, FavoritesStore, VehicleStore};

/// Layout context: header badges, the signed-in name, queued notifications.
///
/// Extracting it drains the flash queue, so use it only for full-page
/// responses.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub nonce: String,
    pub path: String,
    pub user_name: Option<String>,
    pub is_owner: bool,
    pub cart_count: u32,
    pub favorites_count: usize,
    pub vehicle_label: Option<String>,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Whether the nav link for `prefix` should be highlighted.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.path == "/"
        } else {
            self.path.starts_with(prefix)
        }
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;
        let path = parts.uri.path().to_string();

        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            tracing::warn!("Session missing while building page context");
            return Ok(Self {
                nonce,
                path,
                ..Self::default()
            });
        };

        let auth = stores::load::<AuthSession>(&session).await;
        let cart = stores::load::<CartStore>(&session).await;
        let favorites = stores::load::<FavoritesStore>(&session).await;
        let vehicle = stores::load::<VehicleStore>(&session).await;

        Ok(Self {
            nonce,
            path,
            user_name: auth.user().map(|u| u.display_name().to_string()),
            is_owner: auth.is_owner(),
            cart_count: cart.item_count(),
            favorites_count: favorites.count(),
            vehicle_label: vehicle
                .selected()
                .map(|v| v.label())
                .filter(|label| !label.is_empty()),
            flashes: flash::take(&session).await,
        })
    }
}

/// Whether the request was made by HTMX rather than a full navigation.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|v| v.as_bytes() == b"true")
}
