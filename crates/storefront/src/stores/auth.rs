//! The signed-in user and their API tokens.
//!
//! Tokens never reach the browser: they live in the server-side session row
//! and the visitor only holds the session cookie.

use serde::{Deserialize, Serialize};

use super::PersistedStore;
use crate::api::{AuthTokens, ProfileResponse, User};

/// Auth state persisted under `autoparts-auth`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    tokens: Option<AuthTokens>,
}

impl PersistedStore for AuthSession {
    const KEY: &'static str = "autoparts-auth";
    const VERSION: u32 = 1;
}

impl AuthSession {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn tokens(&self) -> Option<&AuthTokens> {
        self.tokens.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether the user may use the admin panel.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.profile.is_owner)
    }

    pub fn login(&mut self, tokens: AuthTokens, user: User) {
        self.tokens = Some(tokens);
        self.user = Some(user);
    }

    /// Forget the user and both tokens.
    pub fn logout(&mut self) {
        self.user = None;
        self.tokens = None;
    }

    /// Replace the user record. `None` signs the user out.
    pub fn set_user(&mut self, user: Option<User>) {
        if user.is_none() {
            self.logout();
        } else {
            self.user = user;
        }
    }

    /// Store a refreshed access token, keeping the refresh token.
    pub fn set_access_token(&mut self, access: String) {
        match &mut self.tokens {
            Some(tokens) => tokens.access = access,
            None => {
                self.tokens = Some(AuthTokens {
                    access,
                    refresh: String::new(),
                });
            }
        }
    }

    /// Copy fresh profile fields onto the stored user.
    pub fn update_profile(&mut self, profile: &ProfileResponse) {
        let Some(user) = &mut self.user else {
            return;
        };
        user.profile.phone_number.clone_from(&profile.phone_number);
        user.profile.avatar_url.clone_from(&profile.avatar_url);
        user.profile.bio.clone_from(&profile.bio);
        user.profile.is_owner = profile.is_owner;
        if profile.first_name.is_some() {
            user.first_name.clone_from(&profile.first_name);
        }
        if profile.last_name.is_some() {
            user.last_name.clone_from(&profile.last_name);
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.tokens
            .as_ref()
            .map(|t| t.access.as_str())
            .filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens
            .as_ref()
            .map(|t| t.refresh.as_str())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autoparts_core::UserId;

    use super::*;
    use crate::api::UserProfile;

    fn user(is_owner: bool) -> User {
        User {
            id: UserId::new(5),
            username: "wanjiru".to_string(),
            email: "wanjiru@example.co.ke".to_string(),
            first_name: Some("Wanjiru".to_string()),
            last_name: None,
            profile: UserProfile {
                is_owner,
                ..UserProfile::default()
            },
        }
    }

    fn tokens() -> AuthTokens {
        AuthTokens {
            access: "access-1".to_string(),
            refresh: "refresh-1".to_string(),
        }
    }

    #[test]
    fn test_login_and_logout() {
        let mut auth = AuthSession::default();
        assert!(!auth.is_authenticated());

        auth.login(tokens(), user(false));
        assert!(auth.is_authenticated());
        assert!(!auth.is_owner());
        assert_eq!(auth.access_token(), Some("access-1"));
        assert_eq!(auth.refresh_token(), Some("refresh-1"));

        auth.logout();
        assert_eq!(auth, AuthSession::default());
        assert!(auth.access_token().is_none());
    }

    #[test]
    fn test_set_access_token_keeps_refresh() {
        let mut auth = AuthSession::default();
        auth.login(tokens(), user(true));
        auth.set_access_token("access-2".to_string());
        assert_eq!(auth.access_token(), Some("access-2"));
        assert_eq!(auth.refresh_token(), Some("refresh-1"));
        assert!(auth.is_owner());
    }

    #[test]
    fn test_set_user_none_logs_out() {
        let mut auth = AuthSession::default();
        auth.login(tokens(), user(false));
        auth.set_user(None);
        assert!(auth.tokens().is_none());
    }

    #[test]
    fn test_update_profile_grants_owner() {
        let mut auth = AuthSession::default();
        auth.login(tokens(), user(false));
        let profile: ProfileResponse = serde_json::from_str(
            r#"{"phone_number": "254722123456", "is_owner": true, "last_name": "Kamau"}"#,
        )
        .unwrap();

        auth.update_profile(&profile);

        let user = auth.user().unwrap();
        assert!(auth.is_owner());
        assert_eq!(user.profile.phone_number, "254722123456");
        assert_eq!(user.full_name(), "Wanjiru Kamau");
    }

    #[test]
    fn test_update_profile_when_signed_out_is_noop() {
        let mut auth = AuthSession::default();
        let profile: ProfileResponse = serde_json::from_str(r#"{"is_owner": true}"#).unwrap();
        auth.update_profile(&profile);
        assert!(!auth.is_owner());
    }
}
