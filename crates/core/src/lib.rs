//! AutoParts Core - Shared domain types.
//!
//! This crate provides the types used across the AutoParts Kenya components:
//! - `storefront` - Public-facing storefront and owner admin panel
//! - `cli` - Command-line tools for session-store maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session access. Pricing and order state belong to the
//! AutoParts REST API; the types here only describe and format what it returns.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, shilling amounts, phone numbers, emails, statuses
//! - [`format`] - Display helpers (dates in Nairobi time, SKUs, ratings, text)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod format;
pub mod types;

pub use types::*;
