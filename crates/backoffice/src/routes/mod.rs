//! HTTP route handlers for the back-office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness (realtime hub connected)
//! GET  /                                    - Redirect to the user's home page
//!
//! # Auth
//! GET  /login                               - Login page
//! POST /login                               - Log in (rate limited)
//! POST /logout                              - Log out
//!
//! # Orders and cash register (any tenant role)
//! GET  /{slug}/pedidos                      - Kitchen board
//! GET  /{slug}/pedidos/colunas              - Board columns fragment (HTMX)
//! GET  /{slug}/pedidos/stream               - Board updates (SSE)
//! POST /{slug}/pedidos/{id}/avancar         - Move order to its next status
//! POST /{slug}/pedidos/{id}/cancelar        - Cancel order
//! GET  /{slug}/caixa                        - Current cash session
//! POST /{slug}/caixa/abrir                  - Open with an opening amount
//! POST /{slug}/caixa/movimentacoes          - Record suprimento / sangria
//! POST /{slug}/caixa/fechar                 - Close with the counted amount
//!
//! # Catalogue and settings (admin and gerente)
//! GET  /{slug}/produtos                     - Product list (?q= filters)
//! GET  /{slug}/produtos/novo                - New product form
//! POST /{slug}/produtos                     - Create product
//! GET  /{slug}/produtos/{id}                - Edit product form
//! POST /{slug}/produtos/{id}                - Update product
//! POST /{slug}/produtos/{id}/excluir        - Delete product
//!      (same six routes for /funcionarios, /enderecos and /avisos)
//! GET  /{slug}/relatorios                   - Sales report (?inicio&fim&tipo_entrega)
//! GET  /{slug}/configuracoes                - Company settings
//! POST /{slug}/configuracoes                - Save flags and opening hours
//!
//! # Company provisioning (super admin)
//! GET  /admin/empresas                      - Company list (?q= filters)
//! GET  /admin/empresas/nova                 - New company form
//! POST /admin/empresas                      - Create company with its owner
//! GET  /admin/empresas/{id}                 - Edit company form
//! POST /admin/empresas/{id}                 - Update company
//! POST /admin/empresas/{id}/excluir         - Delete company
//! GET  /admin/cnpj                          - Prefill fields from a CNPJ (HTMX)
//! ```

pub mod auth;
pub mod avisos;
pub mod caixa;
pub mod configuracoes;
pub mod empresas;
pub mod enderecos;
pub mod forms;
pub mod funcionarios;
pub mod pedidos;
pub mod produtos;
pub mod relatorios;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use cardapio_client::ApiError;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{CspNonce, OptionalUser, login_rate_limiter, take_flash};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

// =============================================================================
// Layout
// =============================================================================

/// The logged-in user as shown in the navigation bar.
#[derive(Clone, Debug)]
pub struct UserView {
    pub nome: String,
    pub papel: &'static str,
    pub slug: Option<String>,
    pub pode_gerenciar: bool,
    pub super_admin: bool,
}

impl From<&CurrentUser> for UserView {
    fn from(user: &CurrentUser) -> Self {
        Self {
            nome: user.nome.clone(),
            papel: user.role.label(),
            slug: user.empresa_slug.as_ref().map(ToString::to_string),
            pode_gerenciar: user.role.can_manage(),
            super_admin: user.is_super_admin(),
        }
    }
}

/// Data every full page needs from the base layout.
#[derive(Clone, Debug)]
pub struct PageContext {
    pub nonce: String,
    pub flash: Option<Flash>,
    pub user: Option<UserView>,
    /// Navigation entry to highlight.
    pub ativo: &'static str,
}

impl PageContext {
    /// Layout context for a logged-in page. Consumes the pending flash.
    pub(crate) async fn new(
        nonce: CspNonce,
        session: &Session,
        user: &CurrentUser,
        ativo: &'static str,
    ) -> Self {
        Self {
            nonce: nonce.0,
            flash: take_flash(session).await,
            user: Some(UserView::from(user)),
            ativo,
        }
    }

    /// Layout context for the login page.
    pub(crate) async fn anonymous(nonce: CspNonce, session: &Session) -> Self {
        Self {
            nonce: nonce.0,
            flash: take_flash(session).await,
            user: None,
            ativo: "",
        }
    }

    /// Whether a navigation entry is the current page.
    #[must_use]
    pub fn is_ativo(&self, item: &str) -> bool {
        self.ativo == item
    }
}

/// `?q=` filter shared by the list pages.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Message to show on a re-rendered form when the backend refused the
/// submission.
///
/// Client errors (validation, conflicts) become form errors; everything
/// else, including expired tokens, propagates.
pub(crate) fn rejection_message(err: AppError) -> Result<String, AppError> {
    match err {
        AppError::Api(api @ ApiError::Api { status: 400..=499, .. }) => Ok(api.user_message()),
        other => Err(other),
    }
}

// =============================================================================
// Routers
// =============================================================================

async fn home(OptionalUser(user): OptionalUser) -> Redirect {
    match user {
        Some(user) => Redirect::to(&user.home()),
        None => Redirect::to(crate::middleware::auth::LOGIN_PATH),
    }
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        // The limiter wraps only the POST registered before it.
        .route(
            "/login",
            post(auth::login)
                .layer(login_rate_limiter())
                .get(auth::login_page),
        )
        .route("/logout", post(auth::logout))
}

fn operation_routes() -> Router<AppState> {
    Router::new()
        .route("/{slug}/pedidos", get(pedidos::board))
        .route("/{slug}/pedidos/colunas", get(pedidos::columns))
        .route("/{slug}/pedidos/stream", get(pedidos::stream))
        .route("/{slug}/pedidos/{id}/avancar", post(pedidos::avancar))
        .route("/{slug}/pedidos/{id}/cancelar", post(pedidos::cancelar))
        .route("/{slug}/caixa", get(caixa::show))
        .route("/{slug}/caixa/abrir", post(caixa::abrir))
        .route("/{slug}/caixa/movimentacoes", post(caixa::movimentar))
        .route("/{slug}/caixa/fechar", post(caixa::fechar))
}

fn management_routes() -> Router<AppState> {
    Router::new()
        .route("/{slug}/produtos", get(produtos::index).post(produtos::create))
        .route("/{slug}/produtos/novo", get(produtos::new))
        .route("/{slug}/produtos/{id}", get(produtos::edit).post(produtos::update))
        .route("/{slug}/produtos/{id}/excluir", post(produtos::delete))
        .route(
            "/{slug}/funcionarios",
            get(funcionarios::index).post(funcionarios::create),
        )
        .route("/{slug}/funcionarios/novo", get(funcionarios::new))
        .route(
            "/{slug}/funcionarios/{id}",
            get(funcionarios::edit).post(funcionarios::update),
        )
        .route("/{slug}/funcionarios/{id}/excluir", post(funcionarios::delete))
        .route("/{slug}/enderecos", get(enderecos::index).post(enderecos::create))
        .route("/{slug}/enderecos/novo", get(enderecos::new))
        .route("/{slug}/enderecos/{id}", get(enderecos::edit).post(enderecos::update))
        .route("/{slug}/enderecos/{id}/excluir", post(enderecos::delete))
        .route("/{slug}/avisos", get(avisos::index).post(avisos::create))
        .route("/{slug}/avisos/novo", get(avisos::new))
        .route("/{slug}/avisos/{id}", get(avisos::edit).post(avisos::update))
        .route("/{slug}/avisos/{id}/excluir", post(avisos::delete))
        .route("/{slug}/relatorios", get(relatorios::show))
        .route(
            "/{slug}/configuracoes",
            get(configuracoes::show).post(configuracoes::save),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/empresas", get(empresas::index).post(empresas::create))
        .route("/admin/empresas/nova", get(empresas::new))
        .route("/admin/empresas/{id}", get(empresas::edit).post(empresas::update))
        .route("/admin/empresas/{id}/excluir", post(empresas::delete))
        .route("/admin/cnpj", get(empresas::cnpj_lookup))
}

/// Create all routes for the back-office.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .merge(auth_routes())
        .merge(operation_routes())
        .merge(management_routes())
        .merge(admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_validation_errors_become_form_errors() {
        let err = AppError::Api(ApiError::Api {
            status: 422,
            message: "Bairro já cadastrado".to_string(),
        });
        assert_eq!(rejection_message(err).ok().as_deref(), Some("Bairro já cadastrado"));
    }

    #[test]
    fn test_expired_token_is_not_a_form_error() {
        let err = AppError::Api(ApiError::Unauthorized(String::new()));
        assert!(rejection_message(err).is_err());

        let err = AppError::Api(ApiError::Api {
            status: 500,
            message: String::new(),
        });
        assert!(rejection_message(err).is_err());
    }
}
