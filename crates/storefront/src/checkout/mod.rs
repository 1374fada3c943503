//! Checkout wizard.
//!
//! ```text
//! Choice ──guest──▶ GuestForm ──contact──▶ Address ──address──▶ Payment ──▶ Success
//!    └────login──▶ Login ──(authenticated)──┘                     ▲   │
//!                                                                 └───┘ payment failed
//! ```
//!
//! The wizard only moves forward. Every transition is checked against the
//! current step; an invalid one returns [`WizardError::InvalidTransition`]
//! and leaves the wizard untouched, as does a form that fails validation.
//! The only way back is [`CheckoutWizard::restart`].
//!
//! The wizard is kept in the session under [`SESSION_KEY`] while checkout is
//! in progress and removed on success or restart.

pub mod validation;

use autoparts_core::format::nairobi_today;
use autoparts_core::{DeliveryTier, Ksh, OrderId};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use validation::FieldError;

use crate::api::{CheckoutRequest, CheckoutResponse};
use crate::stores::{AuthSession, CartStore};

/// Session key for the in-progress wizard.
pub const SESSION_KEY: &str = "checkout-wizard";

/// Cities offered in the delivery form.
pub const CITIES: [&str; 6] = ["Nairobi", "Mombasa", "Kisumu", "Eldoret", "Nakuru", "Other"];

/// Where the customer is in checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutStep {
    #[default]
    Choice,
    GuestForm,
    Login,
    Address,
    Payment,
    Success,
}

impl CheckoutStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Choice => "choice",
            Self::GuestForm => "guest-form",
            Self::Login => "login",
            Self::Address => "address",
            Self::Payment => "payment",
            Self::Success => "success",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from wizard transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("cannot {action} from the {from} step")]
    InvalidTransition {
        from: CheckoutStep,
        action: &'static str,
    },

    #[error("{}", .0.first().map_or("Please check your input", |e| e.message.as_str()))]
    Invalid(Vec<FieldError>),

    #[error("Your cart is empty")]
    EmptyCart,
}

impl WizardError {
    /// Field messages, empty for non-validation errors.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Guest contact details. `phone` is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
}

/// Where the order goes and who receives it. `recipient_phone` is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub notes: Option<String>,
}

/// Everything collected so far. Dropped on success or restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    /// Checking out with an account rather than as a guest.
    pub signed_in: bool,
    pub contact: Option<ContactInfo>,
    pub address: Option<DeliveryAddress>,
    pub payment_phone: Option<String>,
}

/// Guest contact form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Delivery address form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_phone: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub delivery_type: Option<DeliveryTier>,
}

/// Summary of a placed order, shown on the success screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub total: Ksh,
    pub line_count: usize,
    pub tier: DeliveryTier,
    /// Nairobi calendar day the order was placed.
    #[serde(default)]
    pub placed_on: NaiveDate,
}

// =============================================================================
// Wizard
// =============================================================================

/// The checkout state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutWizard {
    step: CheckoutStep,
    draft: CheckoutDraft,
    payment_error: Option<String>,
    placed: Option<PlacedOrder>,
}

impl CheckoutWizard {
    /// A fresh wizard. Signed-in customers skip straight to the address.
    #[must_use]
    pub fn start(authenticated: bool) -> Self {
        Self {
            step: if authenticated {
                CheckoutStep::Address
            } else {
                CheckoutStep::Choice
            },
            draft: CheckoutDraft {
                signed_in: authenticated,
                ..CheckoutDraft::default()
            },
            payment_error: None,
            placed: None,
        }
    }

    /// Throw everything away and begin again.
    pub fn restart(&mut self, authenticated: bool) {
        *self = Self::start(authenticated);
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn draft(&self) -> &CheckoutDraft {
        &self.draft
    }

    /// Set after a failed payment submission.
    #[must_use]
    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    #[must_use]
    pub const fn placed(&self) -> Option<&PlacedOrder> {
        self.placed.as_ref()
    }

    fn expect(&self, step: CheckoutStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                from: self.step,
                action,
            })
        }
    }

    /// `Choice → GuestForm`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other step.
    pub fn choose_guest(&mut self) -> Result<(), WizardError> {
        self.expect(CheckoutStep::Choice, "continue as guest")?;
        self.step = CheckoutStep::GuestForm;
        Ok(())
    }

    /// `Choice → Login`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other step.
    pub fn choose_login(&mut self) -> Result<(), WizardError> {
        self.expect(CheckoutStep::Choice, "log in")?;
        self.step = CheckoutStep::Login;
        Ok(())
    }

    /// `Login → Address`, once the customer has signed in.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other step.
    pub fn resume_authenticated(&mut self) -> Result<(), WizardError> {
        self.expect(CheckoutStep::Login, "resume after login")?;
        self.draft.signed_in = true;
        self.step = CheckoutStep::Address;
        Ok(())
    }

    /// `GuestForm → Address` with valid contact details.
    ///
    /// # Errors
    ///
    /// `Invalid` with field messages, or `InvalidTransition`.
    pub fn submit_contact(&mut self, form: &ContactForm) -> Result<&ContactInfo, WizardError> {
        self.expect(CheckoutStep::GuestForm, "submit contact details")?;

        let mut errors = Vec::new();
        let email = validation::email(&mut errors, "email", &form.email);
        let phone = validation::phone(&mut errors, "phone", &form.phone);
        let (Some(email), Some(phone)) = (email, phone) else {
            return Err(WizardError::Invalid(errors));
        };

        self.step = CheckoutStep::Address;
        Ok(self.draft.contact.insert(ContactInfo {
            email: email.into_inner(),
            phone,
        }))
    }

    /// `Address → Payment` with a valid address.
    ///
    /// # Errors
    ///
    /// `Invalid` with field messages, or `InvalidTransition` (also when a
    /// guest somehow has no contact details).
    pub fn submit_address(&mut self, form: &AddressForm) -> Result<(), WizardError> {
        self.expect(CheckoutStep::Address, "submit the delivery address")?;
        if !self.draft.signed_in && self.draft.contact.is_none() {
            return Err(WizardError::InvalidTransition {
                from: self.step,
                action: "submit the delivery address without contact details",
            });
        }

        let mut errors = Vec::new();
        let recipient_name = validation::required(
            &mut errors,
            "recipient_name",
            &form.recipient_name,
            "Recipient name is required",
        );
        let recipient_phone =
            validation::phone(&mut errors, "recipient_phone", &form.recipient_phone);
        let street = validation::required(
            &mut errors,
            "delivery_address",
            &form.delivery_address,
            "Delivery address is required",
        );
        let city = validation::required(
            &mut errors,
            "delivery_city",
            &form.delivery_city,
            "City is required",
        );

        let (Some(recipient_name), Some(recipient_phone), Some(street), Some(city)) =
            (recipient_name, recipient_phone, street, city)
        else {
            return Err(WizardError::Invalid(errors));
        };

        let notes = form.notes.trim();
        self.draft.address = Some(DeliveryAddress {
            recipient_name,
            recipient_phone,
            street,
            city,
            postal_code: form.postal_code.trim().to_string(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        });
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Validate the paying number and build the checkout body.
    ///
    /// Stays on `Payment` and clears any earlier payment error. Guests send
    /// their contact details; signed-in customers are identified by token.
    /// Without a delivery choice in the cart, standard delivery is used.
    ///
    /// # Errors
    ///
    /// `Invalid` for a bad phone, `EmptyCart`, or `InvalidTransition`.
    pub fn prepare_payment(
        &mut self,
        phone: &str,
        cart: &CartStore,
        auth: &AuthSession,
    ) -> Result<CheckoutRequest, WizardError> {
        self.expect(CheckoutStep::Payment, "pay")?;

        let mut errors = Vec::new();
        let Some(payment_phone) = validation::phone(&mut errors, "mpesa_phone", phone) else {
            return Err(WizardError::Invalid(errors));
        };
        if cart.is_empty() {
            return Err(WizardError::EmptyCart);
        }
        let Some(address) = self.draft.address.clone() else {
            return Err(WizardError::InvalidTransition {
                from: self.step,
                action: "pay without a delivery address",
            });
        };

        let guest = if auth.is_authenticated() {
            None
        } else {
            self.draft.contact.as_ref()
        };

        self.payment_error = None;
        self.draft.payment_phone = Some(payment_phone);

        Ok(CheckoutRequest {
            items: cart.checkout_items(),
            delivery_address: address.street,
            delivery_city: address.city,
            delivery_postal_code: address.postal_code,
            recipient_name: address.recipient_name,
            recipient_phone: address.recipient_phone,
            delivery_type: cart.delivery().map_or(DeliveryTier::Standard, |d| d.tier),
            guest_email: guest.map(|c| c.email.clone()),
            guest_phone: guest.map(|c| c.phone.clone()),
            customer_notes: address.notes,
        })
    }

    /// Record a failed payment submission. Earlier steps are kept.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the payment step.
    pub fn payment_failed(&mut self, message: impl Into<String>) -> Result<(), WizardError> {
        self.expect(CheckoutStep::Payment, "record a payment failure")?;
        self.payment_error = Some(message.into());
        Ok(())
    }

    /// `Payment → Success`. Empties the cart, including delivery and guest
    /// contact, and drops the draft.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the payment step.
    pub fn complete(
        &mut self,
        order: &CheckoutResponse,
        cart: &mut CartStore,
    ) -> Result<&PlacedOrder, WizardError> {
        self.expect(CheckoutStep::Payment, "complete the order")?;

        let placed = PlacedOrder {
            order_id: order.id,
            order_number: order.order_number.clone(),
            total: order.total_amount,
            line_count: cart.line_count(),
            tier: cart.delivery().map_or(DeliveryTier::Standard, |d| d.tier),
            placed_on: nairobi_today(order.created_at.unwrap_or_else(Utc::now)),
        };
        cart.clear();

        self.step = CheckoutStep::Success;
        self.draft = CheckoutDraft::default();
        self.payment_error = None;
        Ok(self.placed.insert(placed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use autoparts_core::{OrderStatus, ProductId, UserId};
    use chrono::TimeZone;

    use super::*;
    use crate::api::{AuthTokens, User, UserProfile};
    use crate::stores::CartLine;

    fn cart() -> CartStore {
        let mut cart = CartStore::default();
        cart.add_item(CartLine {
            product_id: ProductId::new(1),
            product_name: "Brake pads".to_string(),
            sku: "BP-1".to_string(),
            unit_price: Ksh::from_shillings(2_500),
            quantity: 2,
            image: None,
        });
        cart.set_delivery(DeliveryTier::Express.into());
        cart.set_guest_info("guest@example.com", "254722123456");
        cart
    }

    fn contact() -> ContactForm {
        ContactForm {
            email: "guest@example.com".to_string(),
            phone: "0722123456".to_string(),
        }
    }

    fn address() -> AddressForm {
        AddressForm {
            recipient_name: "Achieng Otieno".to_string(),
            recipient_phone: "0711 222333".to_string(),
            delivery_address: "Moi Avenue, Bazaar Plaza 3rd floor".to_string(),
            delivery_city: "Nairobi".to_string(),
            postal_code: "00100".to_string(),
            notes: String::new(),
            delivery_type: None,
        }
    }

    fn response() -> CheckoutResponse {
        CheckoutResponse {
            id: OrderId::new(77),
            order_number: "AP-2026-0077".to_string(),
            subtotal: Ksh::from_shillings(5_000),
            delivery_cost: Ksh::from_shillings(3_000),
            total_amount: Ksh::from_shillings(8_000),
            order_status: OrderStatus::Pending,
            created_at: Some(Utc.with_ymd_and_hms(2026, 10, 17, 22, 30, 0).unwrap()),
        }
    }

    fn signed_in() -> AuthSession {
        let mut auth = AuthSession::default();
        auth.login(
            AuthTokens {
                access: "a".to_string(),
                refresh: "r".to_string(),
            },
            User {
                id: UserId::new(1),
                username: "kamau".to_string(),
                email: "kamau@example.co.ke".to_string(),
                first_name: None,
                last_name: None,
                profile: UserProfile::default(),
            },
        );
        auth
    }

    fn at_payment() -> CheckoutWizard {
        let mut wizard = CheckoutWizard::start(false);
        wizard.choose_guest().unwrap();
        wizard.submit_contact(&contact()).unwrap();
        wizard.submit_address(&address()).unwrap();
        wizard
    }

    #[test]
    fn test_start_depends_on_auth() {
        assert_eq!(CheckoutWizard::start(false).step(), CheckoutStep::Choice);
        assert_eq!(CheckoutWizard::start(true).step(), CheckoutStep::Address);
    }

    #[test]
    fn test_guest_happy_path() {
        let mut wizard = at_payment();
        assert_eq!(wizard.step(), CheckoutStep::Payment);
        assert_eq!(
            wizard.draft().contact.as_ref().unwrap().phone,
            "254722123456"
        );

        let mut cart = cart();
        let request = wizard
            .prepare_payment("0722123456", &cart, &AuthSession::default())
            .unwrap();
        assert_eq!(request.guest_email.as_deref(), Some("guest@example.com"));
        assert_eq!(request.recipient_phone, "254711222333");
        assert_eq!(request.delivery_type, DeliveryTier::Express);
        assert_eq!(request.items.len(), 1);
        assert!(request.customer_notes.is_none());

        let placed = wizard.complete(&response(), &mut cart).unwrap();
        assert_eq!(placed.order_number, "AP-2026-0077");
        assert_eq!(placed.line_count, 1);
        // 22:30 UTC is already the next day in Nairobi.
        assert_eq!(placed.placed_on, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(wizard.step(), CheckoutStep::Success);
    }

    #[test]
    fn test_success_clears_cart() {
        let mut wizard = at_payment();
        let mut cart = cart();
        wizard.complete(&response(), &mut cart).unwrap();

        assert_eq!(cart.line_count(), 0);
        assert!(cart.delivery().is_none());
        assert!(cart.guest_email().is_none());
        assert_eq!(wizard.draft(), &CheckoutDraft::default());
    }

    #[test]
    fn test_success_is_terminal() {
        let mut wizard = at_payment();
        wizard.complete(&response(), &mut cart()).unwrap();
        let before = wizard.clone();

        assert!(wizard.choose_guest().is_err());
        assert!(wizard.submit_address(&address()).is_err());
        assert!(wizard.payment_failed("late").is_err());
        assert!(wizard.complete(&response(), &mut cart()).is_err());
        assert_eq!(wizard, before);
    }

    #[test]
    fn test_cannot_skip_to_payment() {
        let mut wizard = CheckoutWizard::start(false);
        let err = wizard.submit_address(&address()).unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
        assert!(
            wizard
                .prepare_payment("0722123456", &cart(), &AuthSession::default())
                .is_err()
        );
        assert_eq!(wizard.step(), CheckoutStep::Choice);

        wizard.choose_guest().unwrap();
        assert!(wizard.submit_address(&address()).is_err());
        assert_eq!(wizard.step(), CheckoutStep::GuestForm);
    }

    #[test]
    fn test_invalid_contact_keeps_step() {
        let mut wizard = CheckoutWizard::start(false);
        wizard.choose_guest().unwrap();
        let err = wizard
            .submit_contact(&ContactForm {
                email: "not-an-email".to_string(),
                phone: "0722".to_string(),
            })
            .unwrap_err();

        assert_eq!(err.field_errors().len(), 2);
        assert_eq!(wizard.step(), CheckoutStep::GuestForm);
        assert!(wizard.draft().contact.is_none());
    }

    #[test]
    fn test_invalid_address_lists_every_field() {
        let mut wizard = CheckoutWizard::start(true);
        let err = wizard.submit_address(&AddressForm::default()).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "recipient_name",
                "recipient_phone",
                "delivery_address",
                "delivery_city"
            ]
        );
        assert_eq!(err.to_string(), "Recipient name is required");
        assert_eq!(wizard.step(), CheckoutStep::Address);
    }

    #[test]
    fn test_login_branch_resumes_at_address() {
        let mut wizard = CheckoutWizard::start(false);
        wizard.choose_login().unwrap();
        assert!(wizard.choose_guest().is_err());
        wizard.resume_authenticated().unwrap();
        assert_eq!(wizard.step(), CheckoutStep::Address);

        wizard.submit_address(&address()).unwrap();
        let request = wizard
            .prepare_payment("0722123456", &cart(), &signed_in())
            .unwrap();
        assert!(request.guest_email.is_none());
        assert!(request.guest_phone.is_none());
    }

    #[test]
    fn test_payment_failure_keeps_draft() {
        let mut wizard = at_payment();
        let draft = wizard.draft().clone();
        wizard.payment_failed("Server error. Please try again later.").unwrap();

        assert_eq!(wizard.step(), CheckoutStep::Payment);
        assert_eq!(wizard.payment_error(), Some("Server error. Please try again later."));
        assert_eq!(wizard.draft().address, draft.address);

        wizard
            .prepare_payment("0722123456", &cart(), &AuthSession::default())
            .unwrap();
        assert!(wizard.payment_error().is_none());
    }

    #[test]
    fn test_empty_cart_cannot_pay() {
        let mut wizard = at_payment();
        let err = wizard
            .prepare_payment("0722123456", &CartStore::default(), &AuthSession::default())
            .unwrap_err();
        assert_eq!(err, WizardError::EmptyCart);
    }

    #[test]
    fn test_default_tier_is_standard() {
        let mut wizard = at_payment();
        let mut cart = cart();
        cart.clear_delivery();
        let request = wizard
            .prepare_payment("0722123456", &cart, &AuthSession::default())
            .unwrap();
        assert_eq!(request.delivery_type, DeliveryTier::Standard);
    }

    #[test]
    fn test_restart_discards_everything() {
        let mut wizard = at_payment();
        wizard.restart(false);
        assert_eq!(wizard, CheckoutWizard::start(false));
    }

    #[test]
    fn test_step_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(CheckoutStep::GuestForm).unwrap(),
            "guest-form"
        );
    }
}
