//! Core types for AutoParts Kenya.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod phone;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Ksh;
pub use phone::{Msisdn, PhoneError, format_phone_display, is_valid_phone, normalize_phone};
pub use status::*;
