//! Per-step form validation.

use autoparts_core::{Email, is_valid_phone, normalize_phone};
use serde::{Deserialize, Serialize};

pub const PHONE_REQUIRED: &str = "Phone number is required";
pub const PHONE_INVALID: &str = "Invalid Kenyan phone number (0722123456)";

/// A message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_for(&self, field: &str) -> bool {
        self.field == field
    }
}

/// Message for `field` in `errors`, if any. Used by templates.
#[must_use]
pub fn message_for<'a>(errors: &'a [FieldError], field: &str) -> Option<&'a str> {
    errors
        .iter()
        .find(|e| e.is_for(field))
        .map(|e| e.message.as_str())
}

/// Non-blank input, trimmed.
pub fn required(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    message: &str,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, message));
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A Kenyan phone number, normalized to `2547XXXXXXXX`.
pub fn phone(errors: &mut Vec<FieldError>, field: &str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, PHONE_REQUIRED));
        None
    } else if !is_valid_phone(trimmed) {
        errors.push(FieldError::new(field, PHONE_INVALID));
        None
    } else {
        Some(normalize_phone(trimmed))
    }
}

/// An email address.
pub fn email(errors: &mut Vec<FieldError>, field: &str, value: &str) -> Option<Email> {
    match Email::parse(value) {
        Ok(email) => Some(email),
        Err(autoparts_core::EmailError::Empty) => {
            errors.push(FieldError::new(field, "Email is required"));
            None
        }
        Err(_) => {
            errors.push(FieldError::new(field, "Please enter a valid email"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalizes() {
        let mut errors = Vec::new();
        assert_eq!(
            phone(&mut errors, "phone", " 0722 123456 ").as_deref(),
            Some("254722123456")
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_phone_messages() {
        let mut errors = Vec::new();
        assert!(phone(&mut errors, "phone", "").is_none());
        assert!(phone(&mut errors, "mpesa", "12345").is_none());
        assert_eq!(message_for(&errors, "phone"), Some(PHONE_REQUIRED));
        assert_eq!(message_for(&errors, "mpesa"), Some(PHONE_INVALID));
    }

    #[test]
    fn test_email_messages() {
        let mut errors = Vec::new();
        assert!(email(&mut errors, "email", "  ").is_none());
        assert!(email(&mut errors, "other", "nope").is_none());
        assert_eq!(message_for(&errors, "email"), Some("Email is required"));
        assert_eq!(message_for(&errors, "other"), Some("Please enter a valid email"));
    }

    #[test]
    fn test_required_trims() {
        let mut errors = Vec::new();
        assert_eq!(
            required(&mut errors, "city", "  Nakuru ", "City is required").as_deref(),
            Some("Nakuru")
        );
        assert!(required(&mut errors, "name", "\t", "Name is required").is_none());
        assert_eq!(errors.len(), 1);
    }
}
