//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Rate limiting on `/auth/*` (governor), when enabled
//!
//! Authentication is an extractor ([`RequireAuth`]) rather than a layer so
//! public and protected routes can share a router.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AUTH_REQUIRED, RequireAuth};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
