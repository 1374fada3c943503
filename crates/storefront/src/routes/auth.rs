//! Authentication route handlers.
//!
//! Login and registration go straight to the REST API; the returned tokens
//! are kept in the server-side session, never in the browser. Registration is
//! collected over three screens (details, phone, password) and the draft is
//! kept in the session between them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::api::{ApiError, LoginRequest, LoginResponse, RegisterRequest};
use crate::checkout::{FieldError, SESSION_KEY as CHECKOUT_KEY, validation};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::flash;
use crate::middleware::{OptionalAuth, safe_next};
use crate::state::AppState;
use crate::stores::{self, AuthSession};

const REGISTER_DRAFT_KEY: &str = "register-draft";
const MIN_PASSWORD_LENGTH: usize = 8;
const BAD_CREDENTIALS: &str = "Invalid username or password";

fn destination(next: Option<&str>) -> String {
    next.and_then(safe_next).unwrap_or("/").to_string()
}

/// Store the tokens, refresh the profile and rotate the session id.
async fn sign_in(state: &AppState, session: &Session, response: LoginResponse) -> Result<String> {
    let (tokens, user) = response.into_parts();
    let greeting = user.display_name().to_string();
    set_sentry_user(&user.id, Some(&user.email));

    session.cycle_id().await?;
    let mut auth = stores::load::<AuthSession>(session).await;
    auth.login(tokens, user);

    match state.api().get_profile(&mut auth).await {
        Ok(profile) => auth.update_profile(&profile),
        Err(e) => tracing::warn!(error = %e, "Could not refresh profile after sign-in"),
    }
    stores::save(session, &auth).await?;
    Ok(greeting)
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: String,
    pub username: String,
    pub error: Option<String>,
}

#[instrument(skip(page, auth))]
pub async fn login_page(
    page: PageContext,
    OptionalAuth(auth): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = destination(query.next.as_deref());
    if auth.is_authenticated() {
        return Redirect::to(&next).into_response();
    }
    LoginTemplate {
        page,
        next,
        username: String::new(),
        error: None,
    }
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username or email.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = destination(form.next.as_deref());
    let rerender = |error: String| LoginTemplate {
        page,
        next: next.clone(),
        username: form.username.clone(),
        error: Some(error),
    };

    if form.username.trim().is_empty() || form.password.is_empty() {
        return Ok(rerender("Enter your username and password".to_string()).into_response());
    }

    let request = LoginRequest {
        username: form.username.trim().to_string(),
        password: form.password.clone(),
    };
    let response = match state.api().login(&request).await {
        Ok(response) => response,
        Err(ApiError::Unauthenticated | ApiError::InvalidRequest { .. }) => {
            tracing::info!("Login rejected");
            return Ok(rerender(BAD_CREDENTIALS.to_string()).into_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Ok(rerender(e.user_message()).into_response());
        }
    };

    let greeting = sign_in(&state, &session, response).await?;
    flash::success(&session, format!("Welcome back, {greeting}")).await?;
    Ok(Redirect::to(&next).into_response())
}

/// Sign out. Cart, favorites and vehicle stay with the visitor.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    stores::forget::<AuthSession>(&session).await?;
    session.remove_value(CHECKOUT_KEY).await?;
    session.cycle_id().await?;
    clear_sentry_user();
    flash::push(&session, flash::FlashLevel::Info, "You have been signed out").await?;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Registration
// =============================================================================

/// Screen of the registration form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterStage {
    #[default]
    Details,
    Phone,
    Password,
}

impl RegisterStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Phone => "phone",
            Self::Password => "password",
        }
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Details => 1,
            Self::Phone => 2,
            Self::Password => 3,
        }
    }

    const fn previous(self) -> Self {
        match self {
            Self::Details | Self::Phone => Self::Details,
            Self::Password => Self::Phone,
        }
    }
}

/// Answers collected so far. The password is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDraft {
    pub stage: RegisterStage,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Normalized; empty when skipped.
    pub phone_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub stage: RegisterStage,
    /// `back` returns to the previous screen.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl RegisterDraft {
    /// Apply one screen of answers and move forward.
    ///
    /// Returns the field errors and leaves the stage alone when the answers
    /// are not acceptable.
    pub fn advance(&mut self, form: &RegisterForm) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        match form.stage {
            RegisterStage::Details => {
                self.username = form.username.trim().to_string();
                self.first_name = form.first_name.trim().to_string();
                self.last_name = form.last_name.trim().to_string();
                self.email = form.email.trim().to_string();
                validation::required(&mut errors, "username", &form.username, "Username is required");
                if let Some(email) = validation::email(&mut errors, "email", &form.email) {
                    self.email = email.into_inner();
                }
                if errors.is_empty() {
                    self.stage = RegisterStage::Phone;
                }
            }
            RegisterStage::Phone => {
                let raw = form.phone_number.trim();
                if raw.is_empty() {
                    self.phone_number.clear();
                } else if let Some(phone) = validation::phone(&mut errors, "phone_number", raw) {
                    self.phone_number = phone;
                } else {
                    self.phone_number = raw.to_string();
                }
                if errors.is_empty() {
                    self.stage = RegisterStage::Password;
                }
            }
            RegisterStage::Password => {
                if form.password.chars().count() < MIN_PASSWORD_LENGTH {
                    errors.push(FieldError::new(
                        "password",
                        format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
                    ));
                } else if form.password != form.password_confirm {
                    errors.push(FieldError::new("password_confirm", "Passwords do not match"));
                }
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    #[must_use]
    pub fn request(&self, form: &RegisterForm) -> RegisterRequest {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
        RegisterRequest {
            username: self.username.clone(),
            email: self.email.clone(),
            password: form.password.clone(),
            password_confirm: form.password_confirm.clone(),
            phone_number: non_empty(&self.phone_number),
            first_name: non_empty(&self.first_name),
            last_name: non_empty(&self.last_name),
        }
    }

    /// Send the visitor back to the screen where the API found a problem.
    pub fn reject(&mut self, err: &ApiError) -> Vec<FieldError> {
        const FIELDS: [(&str, RegisterStage); 7] = [
            ("username", RegisterStage::Details),
            ("email", RegisterStage::Details),
            ("first_name", RegisterStage::Details),
            ("last_name", RegisterStage::Details),
            ("phone_number", RegisterStage::Phone),
            ("password", RegisterStage::Password),
            ("password_confirm", RegisterStage::Password),
        ];
        let errors: Vec<(FieldError, RegisterStage)> = FIELDS
            .iter()
            .filter_map(|&(field, stage)| {
                err.field_message(field)
                    .map(|message| (FieldError::new(field, message), stage))
            })
            .collect();

        match errors.first() {
            Some(&(_, stage)) => {
                self.stage = stage;
                errors
                    .into_iter()
                    .filter(|(_, s)| *s == stage)
                    .map(|(e, _)| e)
                    .collect()
            }
            None => vec![FieldError::new("form", err.user_message())],
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub stage: &'static str,
    pub stage_number: u8,
    pub draft: RegisterDraft,
    pub errors: Vec<FieldError>,
}

impl RegisterTemplate {
    fn new(page: PageContext, draft: RegisterDraft, errors: Vec<FieldError>) -> Self {
        Self {
            page,
            stage: draft.stage.as_str(),
            stage_number: draft.stage.number(),
            draft,
            errors,
        }
    }

    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        validation::message_for(&self.errors, field)
    }
}

async fn load_draft(session: &Session) -> RegisterDraft {
    session
        .get::<RegisterDraft>(REGISTER_DRAFT_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[instrument(skip(session, page, auth))]
pub async fn register_page(
    session: Session,
    page: PageContext,
    OptionalAuth(auth): OptionalAuth,
) -> Response {
    if auth.is_authenticated() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate::new(page, load_draft(&session).await, Vec::new()).into_response()
}

#[instrument(skip_all, fields(stage = ?form.stage))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let mut draft = load_draft(&session).await;

    if form.action.as_deref() == Some("back") {
        draft.stage = form.stage.previous();
        session.insert(REGISTER_DRAFT_KEY, &draft).await?;
        return Ok(RegisterTemplate::new(page, draft, Vec::new()).into_response());
    }

    if let Err(errors) = draft.advance(&form) {
        draft.stage = form.stage;
        session.insert(REGISTER_DRAFT_KEY, &draft).await?;
        return Ok(RegisterTemplate::new(page, draft, errors).into_response());
    }
    if form.stage != RegisterStage::Password {
        session.insert(REGISTER_DRAFT_KEY, &draft).await?;
        return Ok(RegisterTemplate::new(page, draft, Vec::new()).into_response());
    }

    match state.api().register(&draft.request(&form)).await {
        Ok(response) => {
            session.remove_value(REGISTER_DRAFT_KEY).await?;
            let greeting = sign_in(&state, &session, response).await?;
            tracing::info!("Account created");
            flash::success(&session, format!("Welcome to AutoParts Kenya, {greeting}")).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::info!(error = %e, "Registration rejected");
            let errors = draft.reject(&e);
            session.insert(REGISTER_DRAFT_KEY, &draft).await?;
            Ok(RegisterTemplate::new(page, draft, errors).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(stage: RegisterStage) -> RegisterForm {
        RegisterForm {
            stage,
            ..RegisterForm::default()
        }
    }

    #[test]
    fn test_destination_rejects_offsite() {
        assert_eq!(destination(Some("/checkout")), "/checkout");
        assert_eq!(destination(Some("//evil.example")), "/");
        assert_eq!(destination(None), "/");
    }

    #[test]
    fn test_register_stages_advance() {
        let mut draft = RegisterDraft::default();

        let mut details = form(RegisterStage::Details);
        details.username = "otieno".to_string();
        details.email = "Otieno@Example.com".to_string();
        draft.advance(&details).unwrap();
        assert_eq!(draft.stage, RegisterStage::Phone);

        let mut phone = form(RegisterStage::Phone);
        phone.phone_number = "0722 123456".to_string();
        draft.advance(&phone).unwrap();
        assert_eq!(draft.stage, RegisterStage::Password);
        assert_eq!(draft.phone_number, "254722123456");

        let mut password = form(RegisterStage::Password);
        password.password = "correct horse".to_string();
        password.password_confirm = "correct horse".to_string();
        draft.advance(&password).unwrap();
        let request = draft.request(&password);
        assert_eq!(request.username, "otieno");
        assert_eq!(request.phone_number.as_deref(), Some("254722123456"));
        assert_eq!(request.first_name, None);
    }

    #[test]
    fn test_register_phone_is_optional() {
        let mut draft = RegisterDraft {
            stage: RegisterStage::Phone,
            ..RegisterDraft::default()
        };
        draft.advance(&form(RegisterStage::Phone)).unwrap();
        assert_eq!(draft.stage, RegisterStage::Password);
        assert!(draft.phone_number.is_empty());
    }

    #[test]
    fn test_register_details_need_username_and_email() {
        let mut draft = RegisterDraft::default();
        let errors = draft.advance(&form(RegisterStage::Details)).unwrap_err();
        assert_eq!(draft.stage, RegisterStage::Details);
        assert!(validation::message_for(&errors, "username").is_some());
        assert_eq!(validation::message_for(&errors, "email"), Some("Email is required"));
    }

    #[test]
    fn test_register_password_mismatch() {
        let mut draft = RegisterDraft {
            stage: RegisterStage::Password,
            ..RegisterDraft::default()
        };
        let mut password = form(RegisterStage::Password);
        password.password = "longenough".to_string();
        password.password_confirm = "different1".to_string();
        let errors = draft.advance(&password).unwrap_err();
        assert_eq!(errors[0].field, "password_confirm");
    }

    #[test]
    fn test_api_rejection_returns_to_field_stage() {
        let mut draft = RegisterDraft {
            stage: RegisterStage::Password,
            ..RegisterDraft::default()
        };
        let err = ApiError::InvalidRequest {
            message: "email: already registered".to_string(),
            fields: vec![("email".to_string(), "already registered".to_string())],
        };
        let errors = draft.reject(&err);
        assert_eq!(draft.stage, RegisterStage::Details);
        assert_eq!(validation::message_for(&errors, "email"), Some("already registered"));
    }
}
