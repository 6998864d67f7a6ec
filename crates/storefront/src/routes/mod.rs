//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness (realtime hub connected)
//!
//! # Menu
//! GET  /{slug}                              - Menu page (?q= filters products)
//! GET  /{slug}/produtos/{id}                - Product modal fragment (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /{slug}/carrinho                     - Cart page
//! POST /{slug}/carrinho/adicionar           - Add line (returns badge, triggers cart-updated)
//! POST /{slug}/carrinho/atualizar           - Set line quantity (returns cart_items fragment)
//! POST /{slug}/carrinho/remover             - Remove line (returns cart_items fragment)
//! POST /{slug}/carrinho/limpar              - Empty cart (returns cart_items fragment)
//! POST /{slug}/carrinho/entrega             - Choose delivery type (returns cart_items fragment)
//! GET  /{slug}/carrinho/contador            - Cart badge fragment
//!
//! # Checkout
//! GET  /{slug}/checkout                     - Checkout form
//! POST /{slug}/checkout                     - Place order (rate limited)
//! GET  /{slug}/checkout/enderecos           - Address suggestions fragment (HTMX)
//!
//! # Tracking
//! GET  /{slug}/pedido/{id}                  - Order tracker
//! GET  /{slug}/pedido/{id}/stream           - Status panel updates (SSE)
//! ```

pub mod cart;
pub mod checkout;
pub mod menu;
pub mod pedido;

use axum::{
    Router,
    routing::{get, post},
};
use cardapio_core::models::Empresa;
use cardapio_core::{OrderGate, Slug};
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// A restaurant resolved from the URL with its current ordering rules.
pub struct TenantContext {
    pub slug: Slug,
    pub empresa: Empresa,
    pub gate: OrderGate,
}

/// Parse the slug path segment; malformed slugs are simply unknown pages.
pub(crate) fn parse_slug(raw: &str) -> Result<Slug> {
    Slug::parse(raw).map_err(|_| AppError::NotFound(format!("cardápio {raw}")))
}

/// Resolve the restaurant for a request and evaluate its ordering gate.
///
/// # Errors
///
/// Returns `NotFound` for malformed or unknown slugs and for inactive
/// restaurants.
pub(crate) async fn load_tenant(state: &AppState, raw_slug: &str) -> Result<TenantContext> {
    let slug = parse_slug(raw_slug)?;
    let empresa = state.api().empresa_por_slug(slug.as_str()).await?;
    if !empresa.ativo {
        return Err(AppError::NotFound(format!("cardápio {slug}")));
    }
    let gate = OrderGate::at(&empresa, Utc::now(), state.config().utc_offset);
    Ok(TenantContext { slug, empresa, gate })
}

/// Create the cart routes.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{slug}/carrinho", get(cart::show))
        .route("/{slug}/carrinho/adicionar", post(cart::add))
        .route("/{slug}/carrinho/atualizar", post(cart::update))
        .route("/{slug}/carrinho/remover", post(cart::remove))
        .route("/{slug}/carrinho/limpar", post(cart::clear))
        .route("/{slug}/carrinho/entrega", post(cart::delivery))
        .route("/{slug}/carrinho/contador", get(cart::count))
}

/// Create the checkout routes.
fn checkout_routes() -> Router<AppState> {
    Router::new()
        // The limiter wraps only the POST registered before it.
        .route(
            "/{slug}/checkout",
            post(checkout::submit)
                .layer(checkout_rate_limiter())
                .get(checkout::show),
        )
        .route("/{slug}/checkout/enderecos", get(checkout::addresses))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Menu
        .route("/{slug}", get(menu::show))
        .route("/{slug}/produtos/{id}", get(menu::produto))
        .merge(cart_routes())
        .merge(checkout_routes())
        // Tracking
        .route("/{slug}/pedido/{id}", get(pedido::show))
        .route("/{slug}/pedido/{id}/stream", get(pedido::stream))
}
