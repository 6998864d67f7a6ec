//! Tenant-owned records edited through the back-office list/form pages.

use serde::{Deserialize, Serialize};

use crate::types::{AvisoId, Email, EmpresaId, EnderecoId, FuncionarioId, Price, UserRole};

/// A staff member with back-office access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funcionario {
    pub id: FuncionarioId,
    pub empresa_id: EmpresaId,
    pub nome: String,
    pub email: Email,
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

/// Employee form payload. `senha` is only sent when set or changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncionarioInput {
    pub nome: String,
    pub email: Email,
    pub role: UserRole,
    pub ativo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
}

/// A neighbourhood the company delivers to, with its fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endereco {
    pub id: EnderecoId,
    pub empresa_id: EmpresaId,
    pub bairro: String,
    pub taxa_entrega: Price,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnderecoInput {
    pub bairro: String,
    pub taxa_entrega: Price,
    pub ativo: bool,
}

/// Find the active delivery area matching a neighbourhood name, ignoring case.
#[must_use]
pub fn buscar_bairro<'a>(enderecos: &'a [Endereco], bairro: &str) -> Option<&'a Endereco> {
    let alvo = bairro.trim().to_lowercase();
    enderecos
        .iter()
        .filter(|e| e.ativo)
        .find(|e| e.bairro.trim().to_lowercase() == alvo)
}

/// A notice shown at the top of the public menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aviso {
    pub id: AvisoId,
    pub empresa_id: EmpresaId,
    pub titulo: String,
    #[serde(default)]
    pub mensagem: String,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvisoInput {
    pub titulo: String,
    pub mensagem: String,
    pub ativo: bool,
}

const fn default_true() -> bool {
    true
}
