//! Authentication route handlers.
//!
//! Staff log in with e-mail and password against the backend; the returned
//! token is kept in the server-side session, never in the browser.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_client::ApiError;
use cardapio_core::Email;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::error::Result;
use crate::middleware::auth::LOGIN_PATH;
use crate::middleware::{
    CspNonce, OptionalUser, clear_current_user, push_flash, set_current_user,
};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub erro: Option<String>,
}

/// Login form. The password is wrapped in a secret as soon as it is read.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    senha: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("senha", &"[REDACTED]")
            .finish()
    }
}

/// Render the login page.
///
/// GET /login
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    session: Session,
    nonce: CspNonce,
) -> Response {
    if let Some(user) = user {
        return Redirect::to(&user.home()).into_response();
    }

    LoginTemplate {
        page: PageContext::anonymous(nonce, &session).await,
        email: String::new(),
        erro: None,
    }
    .into_response()
}

/// Log in and store the user in the session.
///
/// POST /login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let LoginForm { email, senha } = form;
    let senha = SecretString::from(senha);

    let parsed = match Email::parse(&email) {
        Ok(parsed) => parsed,
        Err(e) => {
            let status = StatusCode::UNPROCESSABLE_ENTITY;
            return rejected(nonce, &session, email, e.to_string(), status).await;
        }
    };

    let sessao = match state.api().login(&parsed, &senha).await {
        Ok(sessao) => sessao,
        Err(ApiError::Unauthorized(_) | ApiError::Forbidden(_)) => {
            tracing::info!("Login refused");
            return rejected(
                nonce,
                &session,
                email,
                "E-mail ou senha inválidos.".to_string(),
                StatusCode::UNAUTHORIZED,
            )
            .await;
        }
        Err(e @ ApiError::Api { status: 400..=499, .. }) => {
            let status = StatusCode::UNPROCESSABLE_ENTITY;
            return rejected(nonce, &session, email, e.user_message(), status).await;
        }
        Err(e) => return Err(e.into()),
    };

    let user = CurrentUser::from(sessao);
    if !user.is_super_admin() && user.empresa_slug.is_none() {
        tracing::warn!(user_id = %user.id, "Staff account without company");
        return rejected(
            nonce,
            &session,
            email,
            "Usuário sem empresa vinculada. Fale com o administrador.".to_string(),
            StatusCode::FORBIDDEN,
        )
        .await;
    }

    set_current_user(&session, &user).await?;
    push_flash(&session, Flash::sucesso(format!("Bem-vindo, {}!", user.nome))).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Staff logged in");

    Ok(Redirect::to(&user.home()).into_response())
}

/// Logout and clear session.
///
/// POST /logout
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session on logout");
    }
    Redirect::to(LOGIN_PATH)
}

async fn rejected(
    nonce: CspNonce,
    session: &Session,
    email: String,
    erro: String,
    status: StatusCode,
) -> Result<Response> {
    let template = LoginTemplate {
        page: PageContext::anonymous(nonce, session).await,
        email,
        erro: Some(erro),
    };
    Ok((status, template).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_form_debug_hides_password() {
        let form: LoginForm = serde_json::from_str(r#"{"email": "ana@bar.com", "senha": "hunter2"}"#).unwrap();
        let debug = format!("{form:?}");
        assert!(debug.contains("ana@bar.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_login_page_renders_error() {
        let html = LoginTemplate {
            page: PageContext {
                nonce: "n".to_string(),
                flash: None,
                user: None,
                ativo: "",
            },
            email: "ana@bar.com".to_string(),
            erro: Some("E-mail ou senha inválidos.".to_string()),
        }
        .render()
        .unwrap();
        assert!(html.contains("value=\"ana@bar.com\""));
        assert!(html.contains("E-mail ou senha inválidos."));
    }
}
