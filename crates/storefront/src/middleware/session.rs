//! Session middleware configuration and session-backed stores.
//!
//! Sessions live in memory; a restart empties every cart. The cart of each
//! restaurant is stored under its own key and rewritten after every
//! mutation, so concurrent tabs resolve as last write wins.

use cardapio_core::{Carrinho, Slug};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::models::{Flash, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cardapio_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with the in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load a restaurant's cart. Missing or unreadable carts start empty.
pub async fn load_carrinho(session: &Session, slug: &Slug) -> Carrinho {
    match session.get::<Carrinho>(&session_keys::carrinho(slug)).await {
        Ok(carrinho) => carrinho.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(slug = %slug, error = %e, "Discarding unreadable cart");
            Carrinho::new()
        }
    }
}

/// Persist a restaurant's cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_carrinho(
    session: &Session,
    slug: &Slug,
    carrinho: &Carrinho,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(&session_keys::carrinho(slug), carrinho).await
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
