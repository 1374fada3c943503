//! Kenyan mobile numbers (MSISDN).
//!
//! Customers type numbers in whatever shape they know: `0722 123 456`,
//! `+254722123456`, `722123456`. The API and M-Pesa both expect the
//! international form without a plus sign: `254722123456`.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kenya's country calling code.
pub const COUNTRY_CODE: &str = "254";

/// A normalized number is the country code followed by exactly nine digits.
static NORMALIZED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^254[0-9]{9}$").expect("static MSISDN pattern is valid")
});

/// Errors that can occur when parsing an [`Msisdn`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number is required")]
    Empty,
    /// The input does not normalize to a Kenyan number.
    #[error("please enter a valid Kenyan phone number")]
    Invalid,
}

/// Normalize a phone number to the `254XXXXXXXXX` form.
///
/// Non-digits are stripped, a leading `0` becomes `254`, and `254` is
/// prepended when absent. Normalizing an already-normalized number returns
/// it unchanged. The result is not validated; see [`is_valid_phone`].
///
/// ```
/// use autoparts_core::normalize_phone;
///
/// assert_eq!(normalize_phone("0722123456"), "254722123456");
/// assert_eq!(normalize_phone("254722123456"), "254722123456");
/// assert_eq!(normalize_phone("+254 722 123 456"), "254722123456");
/// ```
#[must_use]
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    if let Some(rest) = digits.strip_prefix('0') {
        return format!("{COUNTRY_CODE}{rest}");
    }
    if digits.starts_with(COUNTRY_CODE) {
        return digits;
    }
    format!("{COUNTRY_CODE}{digits}")
}

/// Whether the input normalizes to a valid Kenyan number.
#[must_use]
pub fn is_valid_phone(input: &str) -> bool {
    NORMALIZED_PATTERN.is_match(&normalize_phone(input))
}

/// Format a number for display as `0XXX XXXXXX`.
///
/// Inputs that do not reduce to a ten-digit local number are returned as-is.
#[must_use]
pub fn format_phone_display(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    let local = digits
        .strip_prefix(COUNTRY_CODE)
        .map_or(digits.clone(), |rest| format!("0{rest}"));

    if local.len() == 10 && local.starts_with('0') {
        let (head, tail) = local.split_at(4);
        return format!("{head} {tail}");
    }
    input.to_string()
}

/// A validated Kenyan mobile number in `254XXXXXXXXX` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Msisdn(String);

impl Msisdn {
    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::Invalid`] when the normalized form is not `254` plus
    /// nine digits.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        if input.trim().is_empty() {
            return Err(PhoneError::Empty);
        }
        let normalized = normalize_phone(input);
        if NORMALIZED_PATTERN.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(PhoneError::Invalid)
        }
    }

    /// The normalized `254XXXXXXXXX` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Msisdn {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Msisdn> for String {
    fn from(value: Msisdn) -> Self {
        value.0
    }
}

impl std::str::FromStr for Msisdn {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_local_number() {
        assert_eq!(normalize_phone("0722123456"), "254722123456");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_phone("0722123456");
        assert_eq!(normalize_phone(&once), once);
        assert_eq!(normalize_phone("254722123456"), "254722123456");
    }

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(normalize_phone("+254 (722) 123-456"), "254722123456");
        assert_eq!(normalize_phone("722123456"), "254722123456");
        assert_eq!(normalize_phone("0110 123456"), "254110123456");
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("0722123456"));
        assert!(is_valid_phone("+254722123456"));
        assert!(!is_valid_phone("072212345"));
        assert!(!is_valid_phone("07221234567"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("not a phone"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Msisdn::parse("   "), Err(PhoneError::Empty));
        assert_eq!(Msisdn::parse("12345"), Err(PhoneError::Invalid));
    }

    #[test]
    fn test_format_phone_display() {
        assert_eq!(format_phone_display("254722123456"), "0722 123456");
        assert_eq!(format_phone_display("+254 722 123456"), "0722 123456");
        assert_eq!(format_phone_display("12"), "12");
    }

    #[test]
    fn test_serde_validates() {
        let ok: Msisdn = serde_json::from_str("\"0722123456\"").unwrap();
        assert_eq!(ok.as_str(), "254722123456");
        assert!(serde_json::from_str::<Msisdn>("\"123\"").is_err());
    }
}
