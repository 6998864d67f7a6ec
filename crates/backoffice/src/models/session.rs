//! Session-related types for back-office authentication.

use core::fmt;

use cardapio_client::BearerToken;
use cardapio_core::models::Sessao;
use cardapio_core::{EmpresaId, Slug, UserRole, UsuarioId};
use serde::{Deserialize, Serialize};

/// Session-stored identity of the logged-in staff member.
///
/// The backend token is kept so every managerial call can be made on the
/// user's behalf. It never appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    token: String,
    pub id: UsuarioId,
    pub nome: String,
    pub email: String,
    pub role: UserRole,
    pub empresa_id: Option<EmpresaId>,
    pub empresa_slug: Option<Slug>,
}

impl CurrentUser {
    /// Bearer credential for backend calls.
    #[must_use]
    pub fn bearer(&self) -> BearerToken {
        BearerToken::new(self.token.clone())
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    /// The tenant this user works for, if it is the one in the URL.
    #[must_use]
    pub fn empresa_em(&self, slug: &Slug) -> Option<EmpresaId> {
        if self.role.is_tenant_staff() && self.empresa_slug.as_ref() == Some(slug) {
            self.empresa_id
        } else {
            None
        }
    }

    /// Where to send the user after login.
    #[must_use]
    pub fn home(&self) -> String {
        match (&self.empresa_slug, self.is_super_admin()) {
            (_, true) => "/admin/empresas".to_string(),
            (Some(slug), false) => format!("/{slug}/pedidos"),
            (None, false) => "/login".to_string(),
        }
    }
}

impl From<Sessao> for CurrentUser {
    fn from(sessao: Sessao) -> Self {
        Self {
            token: sessao.token,
            id: sessao.usuario.id,
            nome: sessao.usuario.nome,
            email: sessao.usuario.email,
            role: sessao.usuario.role,
            empresa_id: sessao.usuario.empresa_id,
            empresa_slug: sessao.usuario.empresa_slug,
        }
    }
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("token", &"[REDACTED]")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("empresa_slug", &self.empresa_slug)
            .finish_non_exhaustive()
    }
}

/// Tone of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Sucesso,
    Erro,
}

impl FlashKind {
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Sucesso => "toast-success",
            Self::Erro => "toast-error",
        }
    }
}

/// A one-shot toast shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub mensagem: String,
}

impl Flash {
    #[must_use]
    pub fn sucesso(mensagem: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Sucesso,
            mensagem: mensagem.into(),
        }
    }

    #[must_use]
    pub fn erro(mensagem: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Erro,
            mensagem: mensagem.into(),
        }
    }
}

/// Session keys for back-office data.
pub mod keys {
    /// Key for storing the logged-in staff member.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sessao(role: &str, slug: Option<&str>) -> Sessao {
        let json = serde_json::json!({
            "token": "tok.en.value",
            "usuario": {
                "id": 5,
                "nome": "Ana",
                "email": "ana@bar.com",
                "role": role,
                "empresa_id": slug.map(|_| 7),
                "empresa_slug": slug,
            }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_staff_belongs_only_to_own_tenant() {
        let user = CurrentUser::from(sessao("gerente", Some("bar-da-ana")));
        let own = Slug::parse("bar-da-ana").unwrap();
        let other = Slug::parse("pizzaria-do-ze").unwrap();

        assert_eq!(user.empresa_em(&own), Some(EmpresaId::new(7)));
        assert_eq!(user.empresa_em(&other), None);
        assert_eq!(user.home(), "/bar-da-ana/pedidos");
    }

    #[test]
    fn test_super_admin_lands_on_company_panel() {
        let user = CurrentUser::from(sessao("super_admin", None));
        assert!(user.is_super_admin());
        assert_eq!(user.home(), "/admin/empresas");
    }

    #[test]
    fn test_debug_and_round_trip_keep_token_private() {
        let user = CurrentUser::from(sessao("funcionario", Some("bar-da-ana")));
        assert!(!format!("{user:?}").contains("tok.en.value"));

        // The session store serializes the token; the bearer accessor reads it back.
        let stored = serde_json::to_value(&user).unwrap();
        let restored: CurrentUser = serde_json::from_value(stored).unwrap();
        assert_eq!(format!("{:?}", restored.bearer()), "BearerToken([REDACTED])");
        assert_eq!(restored.role, UserRole::Funcionario);
    }
}
