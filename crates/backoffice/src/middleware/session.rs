//! Session middleware configuration for the back-office.
//!
//! Sessions live in memory with stricter settings than the storefront
//! (`SameSite=Strict`, 12 hour inactivity expiry). A restart logs every
//! staff member out.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::BackofficeConfig;
use crate::models::{Flash, session_keys};

/// Session cookie name for the back-office.
pub const SESSION_COOKIE_NAME: &str = "cardapio_gestao_session";

/// Session expiry time in seconds (12 hours, one working shift).
const SESSION_EXPIRY_SECONDS: i64 = 12 * 60 * 60;

/// Create the session layer with the in-memory store.
#[must_use]
pub fn create_session_layer(config: &BackofficeConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        // SameSite=Strict for the back-office (stricter than storefront's Lax)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

/// Queue a flash message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn push_flash(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, flash).await
}

/// Take the pending flash message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
