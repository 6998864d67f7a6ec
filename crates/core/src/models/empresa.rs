//! Tenant company records.

use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;
use crate::types::{EmpresaId, Price, Slug};

/// A tenant company as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Empresa {
    pub id: EmpresaId,
    pub slug: Slug,
    pub nome: String,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_true")]
    pub ativo: bool,
    /// Whether customers may place orders through the public menu.
    #[serde(default = "default_true")]
    pub permitir_pedidos_online: bool,
    #[serde(default)]
    pub desativar_entrega: bool,
    #[serde(default)]
    pub desativar_retirada: bool,
    /// Fee charged when the neighbourhood has none configured.
    #[serde(default)]
    pub taxa_entrega_padrao: Price,
    #[serde(default)]
    pub horarios: Schedule,
}

const fn default_true() -> bool {
    true
}

/// Flags and opening hours editable from the company settings page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfiguracoesEmpresa {
    pub permitir_pedidos_online: bool,
    pub desativar_entrega: bool,
    pub desativar_retirada: bool,
    pub taxa_entrega_padrao: Price,
    pub horarios: Schedule,
}

impl From<&Empresa> for ConfiguracoesEmpresa {
    fn from(empresa: &Empresa) -> Self {
        Self {
            permitir_pedidos_online: empresa.permitir_pedidos_online,
            desativar_entrega: empresa.desativar_entrega,
            desativar_retirada: empresa.desativar_retirada,
            taxa_entrega_padrao: empresa.taxa_entrega_padrao,
            horarios: empresa.horarios.clone(),
        }
    }
}

/// Payload to create or update a company from the super-admin panel.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmpresaInput {
    pub slug: String,
    pub nome: String,
    pub cnpj: Option<String>,
    pub telefone: Option<String>,
    pub endereco: Option<String>,
    pub logo_url: Option<String>,
    pub ativo: bool,
    /// Initial owner account, only sent on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<NovoAdmin>,
}

/// Owner account created together with a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovoAdmin {
    pub nome: String,
    pub email: String,
    pub senha: String,
}
