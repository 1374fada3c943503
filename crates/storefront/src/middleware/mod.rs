//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span)
//! 4. CSP nonce (per-request nonce for the layout's scripts)
//! 5. Security headers (CSP using the nonce, frame and referrer policy)
//! 6. Session layer (tower-sessions with the `PostgreSQL` store)
//!
//! Rate limits are applied per route group (auth and payment routes).

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, RequireOwner, login_redirect_url, safe_next};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::{auth_rate_limiter, payment_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
