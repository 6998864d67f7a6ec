//! HTTP middleware stack for the back-office.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce
//! 5. Session layer (tower-sessions, in-memory, `SameSite=Strict`)
//! 6. Session guard (logs out users whose token the backend refused)
//! 7. Security headers
//! 8. Auth extractors and the login rate limiter (per route)

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalUser, RequireManager, RequireStaff, RequireSuperAdmin, TenantStaff,
    clear_current_user, session_guard_middleware, set_current_user,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, push_flash, take_flash};
