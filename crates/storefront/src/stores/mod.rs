//! Persisted client stores.
//!
//! Each store is an independent slice of the visitor's session, saved under a
//! fixed key inside a `{ "version": n, "state": ... }` envelope. Handlers load
//! a store, mutate it through its methods, and save it back; there are no
//! transactions across stores.
//!
//! An entry that is missing, does not decode, or carries another version
//! rehydrates to the store's default state.

mod auth;
mod cart;
mod favorites;
mod vehicle;

pub use auth::AuthSession;
pub use cart::{CartLine, CartStore, DeliveryChoice};
pub use favorites::{FavoriteProduct, FavoritesStore};
pub use vehicle::{SelectedVehicle, VehicleStore};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

/// A store persisted in the session.
pub trait PersistedStore: Default + Serialize + DeserializeOwned {
    /// Session key the store lives under.
    const KEY: &'static str;
    /// Schema version. Entries with any other version are discarded.
    const VERSION: u32;
}

/// Errors writing a store back to the session.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, S> {
    version: u32,
    state: &'a S,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u32,
}

/// Why a stored entry could not be used.
#[derive(Debug, PartialEq, Eq)]
enum Rejected {
    Version { found: u32 },
    Malformed(String),
}

fn decode<S: PersistedStore>(mut value: serde_json::Value) -> Result<S, Rejected> {
    let header =
        EnvelopeHeader::deserialize(&value).map_err(|e| Rejected::Malformed(e.to_string()))?;
    if header.version != S::VERSION {
        return Err(Rejected::Version {
            found: header.version,
        });
    }

    let state = value
        .get_mut("state")
        .map(serde_json::Value::take)
        .unwrap_or_default();
    serde_json::from_value(state).map_err(|e| Rejected::Malformed(e.to_string()))
}

/// Rehydrate a store from the session.
///
/// Never fails: unusable entries fall back to `S::default()`.
pub async fn load<S: PersistedStore>(session: &Session) -> S {
    let value = match session.get::<serde_json::Value>(S::KEY).await {
        Ok(Some(value)) => value,
        Ok(None) => return S::default(),
        Err(e) => {
            tracing::warn!(key = S::KEY, error = %e, "Failed to read store from session");
            return S::default();
        }
    };

    match decode::<S>(value) {
        Ok(state) => state,
        Err(Rejected::Version { found }) => {
            tracing::warn!(
                key = S::KEY,
                found,
                expected = S::VERSION,
                "Discarding store with mismatched version"
            );
            S::default()
        }
        Err(Rejected::Malformed(e)) => {
            tracing::warn!(key = S::KEY, error = %e, "Discarding undecodable store");
            S::default()
        }
    }
}

/// Write a store back to the session.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session cannot be updated.
pub async fn save<S: PersistedStore>(session: &Session, store: &S) -> Result<(), StoreError> {
    session
        .insert(
            S::KEY,
            EnvelopeRef {
                version: S::VERSION,
                state: store,
            },
        )
        .await?;
    Ok(())
}

/// Remove a store from the session entirely.
///
/// # Errors
///
/// Returns `StoreError::Session` if the session cannot be updated.
pub async fn forget<S: PersistedStore>(session: &Session) -> Result<(), StoreError> {
    session.remove::<serde_json::Value>(S::KEY).await?;
    Ok(())
}
