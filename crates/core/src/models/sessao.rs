//! Back-office login session.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{EmpresaId, Slug, UserRole, UsuarioId};

/// The authenticated staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usuario {
    pub id: UsuarioId,
    pub nome: String,
    pub email: String,
    pub role: UserRole,
    /// Tenant the user belongs to; `None` for super admins.
    #[serde(default)]
    pub empresa_id: Option<EmpresaId>,
    #[serde(default)]
    pub empresa_slug: Option<Slug>,
}

impl Usuario {
    /// Whether this user may act on the given tenant.
    #[must_use]
    pub fn pertence_a(&self, slug: &Slug) -> bool {
        self.empresa_slug.as_ref() == Some(slug)
    }
}

/// Result of `POST /auth/login`: bearer token plus the user it belongs to.
#[derive(Clone, Serialize, Deserialize)]
pub struct Sessao {
    pub token: String,
    pub usuario: Usuario,
}

impl fmt::Debug for Sessao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sessao")
            .field("token", &"[REDACTED]")
            .field("usuario", &self.usuario)
            .finish()
    }
}
