//! Staff login.

use cardapio_core::Email;
use cardapio_core::models::Sessao;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use crate::{ApiClient, ApiError};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    senha: &'a str,
}

impl ApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for wrong credentials, or any
    /// transport error.
    #[instrument(skip(self, senha), fields(email = %email))]
    pub async fn login(&self, email: &Email, senha: &SecretString) -> Result<Sessao, ApiError> {
        let body = LoginRequest {
            email: email.as_str(),
            senha: senha.expose_secret(),
        };
        self.post("/auth/login", &body, None).await
    }
}
