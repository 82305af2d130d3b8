//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Security headers (CSP, framing, caching)
//!
//! Authentication and the role gate run per handler through the
//! [`Authorized`] and [`Authenticated`] extractors.

pub mod auth;
pub mod csrf;
pub mod flash;
pub mod security_headers;
pub mod session;

pub use auth::{
    Area, AuthRejection, Authenticated, Authorized, ClientIp, RequestContext, area,
    clear_current_user, set_current_user,
};
pub use csrf::{csrf_token, verify_csrf};
pub use flash::{Flash, FlashKind, set_flash, take_flash};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
