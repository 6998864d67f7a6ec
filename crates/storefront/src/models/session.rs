//! Session-related types.
//!
//! The storefront has no customer accounts; the session only carries one cart
//! per restaurant and pending flash messages.

use cardapio_core::Slug;
use serde::{Deserialize, Serialize};

/// Tone of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Sucesso,
    Erro,
    Info,
}

impl FlashKind {
    /// CSS modifier used by the toast partial.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Sucesso => "toast-success",
            Self::Erro => "toast-error",
            Self::Info => "toast-info",
        }
    }
}

/// A one-shot message shown on the next rendered page.
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

/// Session keys.
pub mod keys {
    use super::Slug;

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";

    /// Key for a restaurant's cart. Carts never leak between tenants.
    #[must_use]
    pub fn carrinho(slug: &Slug) -> String {
        format!("carrinho:{}", slug.as_str())
    }
}
