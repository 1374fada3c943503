//! Checkout wizard handlers.
//!
//! The wizard lives in the session under its own key. Every POST renders the
//! whole checkout page; the forms ask HTMX to swap only `#checkout-step`, and
//! the same page works as a plain form post.

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::format::estimated_delivery;
use autoparts_core::{DeliveryTier, OrderId, PaymentStatus, format_phone_display};
use axum::{
    Form,
    extract::{Path, State},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::cart::{TierOption, tier_options};
use super::views::CartView;
use super::{PageContext, SelectOption};
use crate::api::{ApiError, CheckoutResponse, StkPushRequest};
use crate::checkout::{
    AddressForm, CITIES, CheckoutStep, CheckoutWizard, ContactForm, FieldError, SESSION_KEY,
    WizardError, validation,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::state::AppState;
use crate::stores::{self, AuthSession, CartStore};

// =============================================================================
// Session
// =============================================================================

async fn load_wizard(session: &Session) -> Option<CheckoutWizard> {
    match session.get::<CheckoutWizard>(SESSION_KEY).await {
        Ok(wizard) => wizard,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable checkout wizard");
            None
        }
    }
}

async fn save_wizard(session: &Session, wizard: &CheckoutWizard) -> Result<()> {
    session.insert(SESSION_KEY, wizard).await?;
    Ok(())
}

async fn drop_wizard(session: &Session) -> Result<()> {
    session.remove::<CheckoutWizard>(SESSION_KEY).await?;
    Ok(())
}

// =============================================================================
// Page
// =============================================================================

/// Values shown in the step forms: what the visitor typed, or what the draft
/// and account already know.
#[derive(Debug, Clone, Default)]
pub struct CheckoutFields {
    pub email: String,
    pub phone: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub notes: String,
    pub payment_phone: String,
}

impl CheckoutFields {
    fn from_state(wizard: &CheckoutWizard, cart: &CartStore, auth: &AuthSession) -> Self {
        let draft = wizard.draft();
        let user = auth.user();
        let account_phone = user
            .map(|u| u.profile.phone_number.clone())
            .filter(|p| !p.is_empty());

        let email = draft
            .contact
            .as_ref()
            .map(|c| c.email.clone())
            .or_else(|| cart.guest_email().map(str::to_string))
            .unwrap_or_default();
        let phone = draft
            .contact
            .as_ref()
            .map(|c| c.phone.clone())
            .or_else(|| cart.guest_phone().map(str::to_string))
            .or_else(|| account_phone.clone())
            .unwrap_or_default();

        let mut fields = Self {
            email,
            recipient_name: user.map(crate::api::User::full_name).unwrap_or_default(),
            recipient_phone: phone.clone(),
            payment_phone: draft.payment_phone.clone().unwrap_or_else(|| phone.clone()),
            phone,
            ..Self::default()
        };

        if let Some(address) = &draft.address {
            fields.recipient_name.clone_from(&address.recipient_name);
            fields.recipient_phone.clone_from(&address.recipient_phone);
            fields.street.clone_from(&address.street);
            fields.city.clone_from(&address.city);
            fields.postal_code.clone_from(&address.postal_code);
            fields.notes = address.notes.clone().unwrap_or_default();
            if draft.payment_phone.is_none() {
                fields.payment_phone.clone_from(&address.recipient_phone);
            }
        }

        fields.phone = display_phone(&fields.phone);
        fields.recipient_phone = display_phone(&fields.recipient_phone);
        fields.payment_phone = display_phone(&fields.payment_phone);
        fields
    }

    fn with_contact(mut self, form: &ContactForm) -> Self {
        self.email.clone_from(&form.email);
        self.phone.clone_from(&form.phone);
        self
    }

    fn with_address(mut self, form: &AddressForm) -> Self {
        self.recipient_name.clone_from(&form.recipient_name);
        self.recipient_phone.clone_from(&form.recipient_phone);
        self.street.clone_from(&form.delivery_address);
        self.city.clone_from(&form.delivery_city);
        self.postal_code.clone_from(&form.postal_code);
        self.notes.clone_from(&form.notes);
        self
    }
}

fn display_phone(phone: &str) -> String {
    if phone.is_empty() {
        String::new()
    } else {
        format_phone_display(phone)
    }
}

/// The success screen.
#[derive(Debug, Clone)]
pub struct PlacedView {
    pub order_id: OrderId,
    pub order_number: String,
    pub total: String,
    pub delivery: &'static str,
    pub window: &'static str,
    /// Expected arrival, e.g. `20 Oct 26 - 21 Oct 26`.
    pub arrives: String,
    pub line_count: usize,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub step: &'static str,
    pub signed_in: bool,
    pub fields: CheckoutFields,
    pub errors: Vec<FieldError>,
    pub cities: Vec<SelectOption>,
    pub tiers: Vec<TierOption>,
    pub cart: CartView,
    pub payment_error: Option<String>,
    pub placed: Option<PlacedView>,
    /// Outcome of the M-Pesa prompt, shown on the success screen.
    pub stk_message: Option<String>,
}

impl CheckoutTemplate {
    /// Used by the template as `self.error_for("email")`.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        validation::message_for(&self.errors, field)
    }
}

struct Render<'a> {
    wizard: &'a CheckoutWizard,
    cart: &'a CartStore,
    auth: &'a AuthSession,
}

impl Render<'_> {
    fn page(&self, page: PageContext, fields: CheckoutFields, errors: Vec<FieldError>) -> CheckoutTemplate {
        let selected_tier = self.cart.delivery().map(|d| d.tier);
        CheckoutTemplate {
            page,
            step: self.wizard.step().as_str(),
            signed_in: self.auth.is_authenticated(),
            cities: CITIES
                .iter()
                .map(|city| SelectOption::new(city, *city, *city == fields.city))
                .collect(),
            fields,
            errors,
            tiers: tier_options(Some(selected_tier.unwrap_or(DeliveryTier::Standard))),
            cart: CartView::from(self.cart),
            payment_error: self.wizard.payment_error().map(str::to_string),
            placed: self.wizard.placed().map(|placed| PlacedView {
                order_id: placed.order_id,
                order_number: placed.order_number.clone(),
                total: placed.total.display(),
                delivery: placed.tier.label(),
                window: placed.tier.window(),
                arrives: estimated_delivery(placed.placed_on, placed.tier),
                line_count: placed.line_count,
            }),
            stk_message: None,
        }
    }

    fn current(&self, page: PageContext) -> CheckoutTemplate {
        self.page(
            page,
            CheckoutFields::from_state(self.wizard, self.cart, self.auth),
            Vec::new(),
        )
    }
}

/// Turn a wizard error into form errors, or the flash-style message for a
/// transition that is not allowed from here.
fn wizard_errors(err: &WizardError) -> Vec<FieldError> {
    match err {
        WizardError::Invalid(errors) => errors.clone(),
        other => vec![FieldError::new("form", other.to_string())],
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Start the wizard, or resume it after the login detour.
#[instrument(skip(session, page))]
pub async fn show(session: Session, page: PageContext) -> Result<Response> {
    let cart = stores::load::<CartStore>(&session).await;
    if cart.is_empty() {
        crate::flash::error(&session, WizardError::EmptyCart.to_string()).await?;
        return Ok(Redirect::to("/cart").into_response());
    }
    let auth = stores::load::<AuthSession>(&session).await;

    let wizard = match load_wizard(&session).await {
        Some(mut wizard)
            if wizard.step() == CheckoutStep::Login && auth.is_authenticated() =>
        {
            wizard.resume_authenticated().map_err(|e| AppError::Internal(e.to_string()))?;
            wizard
        }
        _ => CheckoutWizard::start(auth.is_authenticated()),
    };
    save_wizard(&session, &wizard).await?;

    let render = Render {
        wizard: &wizard,
        cart: &cart,
        auth: &auth,
    };
    Ok(render.current(page).into_response())
}

/// Run a transition and re-render. Failures keep the wizard as it was.
async fn transition(
    session: &Session,
    page: PageContext,
    apply: impl FnOnce(&mut CheckoutWizard, &mut CartStore) -> std::result::Result<(), WizardError>,
    echo: impl FnOnce(CheckoutFields) -> CheckoutFields,
) -> Result<Response> {
    let auth = stores::load::<AuthSession>(session).await;
    let mut cart = stores::load::<CartStore>(session).await;
    let mut wizard = load_wizard(session)
        .await
        .unwrap_or_else(|| CheckoutWizard::start(auth.is_authenticated()));

    let before = wizard.clone();
    let outcome = apply(&mut wizard, &mut cart);
    if let Err(e) = &outcome {
        tracing::debug!(step = %before.step(), error = %e, "Checkout step rejected");
        wizard = before;
    }
    save_wizard(session, &wizard).await?;
    stores::save(session, &cart).await?;

    let render = Render {
        wizard: &wizard,
        cart: &cart,
        auth: &auth,
    };
    Ok(match outcome {
        Ok(()) => render.current(page),
        Err(e) => {
            let fields = echo(CheckoutFields::from_state(&wizard, &cart, &auth));
            render.page(page, fields, wizard_errors(&e))
        }
    }
    .into_response())
}

#[instrument(skip(session, page))]
pub async fn guest(session: Session, page: PageContext) -> Result<Response> {
    transition(&session, page, |w, _| w.choose_guest(), |f| f).await
}

/// Park the wizard at `login` and send the visitor to sign in.
#[instrument(skip(session))]
pub async fn login(session: Session) -> Result<Response> {
    let auth = stores::load::<AuthSession>(&session).await;
    let mut wizard = load_wizard(&session)
        .await
        .unwrap_or_else(|| CheckoutWizard::start(auth.is_authenticated()));

    if let Err(e) = wizard.choose_login() {
        tracing::debug!(error = %e, "Login choice ignored");
        return Ok(Redirect::to("/checkout").into_response());
    }
    save_wizard(&session, &wizard).await?;
    Ok(Redirect::to("/auth/login?next=%2Fcheckout").into_response())
}

#[instrument(skip(session, page, form))]
pub async fn contact(
    session: Session,
    page: PageContext,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    transition(
        &session,
        page,
        |wizard, cart| {
            let contact = wizard.submit_contact(&form)?;
            cart.set_guest_info(contact.email.clone(), contact.phone.clone());
            Ok(())
        },
        |fields| fields.with_contact(&form),
    )
    .await
}

#[instrument(skip(session, page, form))]
pub async fn address(
    session: Session,
    page: PageContext,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    transition(
        &session,
        page,
        |wizard, cart| {
            wizard.submit_address(&form)?;
            if let Some(tier) = form.delivery_type {
                cart.set_delivery(tier.into());
            }
            Ok(())
        },
        |fields| fields.with_address(&form),
    )
    .await
}

#[derive(Debug, serde::Deserialize)]
pub struct PayForm {
    #[serde(default)]
    pub mpesa_phone: String,
}

/// Place the order, then ask M-Pesa to prompt the paying phone.
///
/// A failed order placement returns to the payment step with the error. Once
/// the order exists the wizard completes even if the prompt could not be
/// sent; the success screen says so.
#[instrument(skip(state, session, page, form))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<PayForm>,
) -> Result<Response> {
    let mut auth = stores::load::<AuthSession>(&session).await;
    let mut cart = stores::load::<CartStore>(&session).await;
    let Some(mut wizard) = load_wizard(&session).await else {
        return Ok(Redirect::to("/checkout").into_response());
    };

    let request = match wizard.prepare_payment(&form.mpesa_phone, &cart, &auth) {
        Ok(request) => request,
        Err(e) => {
            let render = Render {
                wizard: &wizard,
                cart: &cart,
                auth: &auth,
            };
            let mut fields = CheckoutFields::from_state(&wizard, &cart, &auth);
            fields.payment_phone.clone_from(&form.mpesa_phone);
            return Ok(render.page(page, fields, wizard_errors(&e)).into_response());
        }
    };
    let payment_phone = wizard.draft().payment_phone.clone();

    let placed = state.api().checkout(&request, &mut auth).await;
    stores::save(&session, &auth).await?;

    let order: CheckoutResponse = match placed {
        Ok(order) => order,
        Err(ApiError::Unauthenticated) => {
            save_wizard(&session, &wizard).await?;
            return Err(ApiError::Unauthenticated.into());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Order placement failed");
            wizard
                .payment_failed(e.user_message())
                .map_err(|e| AppError::Internal(e.to_string()))?;
            save_wizard(&session, &wizard).await?;
            let render = Render {
                wizard: &wizard,
                cart: &cart,
                auth: &auth,
            };
            return Ok(render.current(page).into_response());
        }
    };

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    let push = StkPushRequest {
        order_id: order.id,
        phone_number: payment_phone,
        amount: Some(order.total_amount.rounded_shillings()),
    };
    let hint = retry_hint(auth.is_authenticated());
    let stk_message = match state.api().initiate_stk_push(&push).await {
        Ok(response) if response.success => {
            "Check your phone and enter your M-Pesa PIN to pay.".to_string()
        }
        Ok(response) => {
            tracing::warn!(
                order_id = %order.id,
                code = ?response.response_code,
                "STK push declined"
            );
            format!("We couldn't send the M-Pesa prompt. {hint}")
        }
        Err(e) => {
            tracing::warn!(error = %e, order_id = %order.id, "STK push failed");
            format!("{} {hint}", e.user_message())
        }
    };

    wizard
        .complete(&order, &mut cart)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    stores::save(&session, &cart).await?;
    drop_wizard(&session).await?;

    let render = Render {
        wizard: &wizard,
        cart: &cart,
        auth: &auth,
    };
    let mut template = render.current(page);
    template.page.cart_count = 0;
    template.stk_message = Some(stk_message);
    Ok((AppendHeaders([("HX-Trigger", "cart-updated")]), template).into_response())
}

/// What to do when the M-Pesa prompt could not be sent.
const fn retry_hint(signed_in: bool) -> &'static str {
    if signed_in {
        "You can resend it from your order page."
    } else {
        "Quote your order number when you contact us and we will help you pay."
    }
}

#[instrument(skip(session))]
pub async fn restart(session: Session) -> Result<Redirect> {
    drop_wizard(&session).await?;
    Ok(Redirect::to("/checkout"))
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/payment_status.html")]
pub struct PaymentStatusTemplate {
    pub order_id: OrderId,
    pub status: PaymentStatus,
    /// Keep polling until the payment settles.
    pub poll: bool,
}

#[instrument(skip(state))]
pub async fn payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let status = state.api().check_payment_status(order_id).await?;
    Ok(PaymentStatusTemplate {
        order_id,
        status: status.payment_status,
        poll: !status.payment_status.is_settled(),
    })
}
