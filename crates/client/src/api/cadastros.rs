//! Employees, delivery areas and notices.

use cardapio_core::models::{
    Aviso, AvisoInput, Endereco, EnderecoInput, Funcionario, FuncionarioInput,
};
use cardapio_core::types::{AvisoId, EmpresaId, EnderecoId, FuncionarioId};
use tracing::instrument;

use crate::{ApiClient, ApiError, BearerToken};

impl ApiClient {
    // =========================================================================
    // Funcionários
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn listar_funcionarios(
        &self,
        empresa_id: EmpresaId,
        auth: &BearerToken,
    ) -> Result<Vec<Funcionario>, ApiError> {
        self.get(&format!("/empresas/{empresa_id}/funcionarios"), Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the employee.
    #[instrument(skip(self, input, auth), fields(email = %input.email))]
    pub async fn criar_funcionario(
        &self,
        empresa_id: EmpresaId,
        input: &FuncionarioInput,
        auth: &BearerToken,
    ) -> Result<Funcionario, ApiError> {
        self.post(&format!("/empresas/{empresa_id}/funcionarios"), input, Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, input, auth), fields(funcionario_id = %id))]
    pub async fn atualizar_funcionario(
        &self,
        id: FuncionarioId,
        input: &FuncionarioInput,
        auth: &BearerToken,
    ) -> Result<Funcionario, ApiError> {
        self.put(&format!("/funcionarios/{id}"), input, Some(auth)).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(funcionario_id = %id))]
    pub async fn excluir_funcionario(
        &self,
        id: FuncionarioId,
        auth: &BearerToken,
    ) -> Result<(), ApiError> {
        self.delete(&format!("/funcionarios/{id}"), Some(auth)).await
    }

    // =========================================================================
    // Endereços (delivery areas)
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn listar_enderecos(
        &self,
        empresa_id: EmpresaId,
        auth: &BearerToken,
    ) -> Result<Vec<Endereco>, ApiError> {
        self.get(&format!("/empresas/{empresa_id}/enderecos"), Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the area.
    #[instrument(skip(self, input, auth), fields(bairro = %input.bairro))]
    pub async fn criar_endereco(
        &self,
        empresa_id: EmpresaId,
        input: &EnderecoInput,
        auth: &BearerToken,
    ) -> Result<Endereco, ApiError> {
        self.post(&format!("/empresas/{empresa_id}/enderecos"), input, Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, input, auth), fields(endereco_id = %id))]
    pub async fn atualizar_endereco(
        &self,
        id: EnderecoId,
        input: &EnderecoInput,
        auth: &BearerToken,
    ) -> Result<Endereco, ApiError> {
        self.put(&format!("/enderecos/{id}"), input, Some(auth)).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(endereco_id = %id))]
    pub async fn excluir_endereco(&self, id: EnderecoId, auth: &BearerToken) -> Result<(), ApiError> {
        self.delete(&format!("/enderecos/{id}"), Some(auth)).await
    }

    // =========================================================================
    // Avisos
    // =========================================================================

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn listar_avisos(
        &self,
        empresa_id: EmpresaId,
        auth: &BearerToken,
    ) -> Result<Vec<Aviso>, ApiError> {
        self.get(&format!("/empresas/{empresa_id}/avisos"), Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the notice.
    #[instrument(skip(self, input, auth), fields(titulo = %input.titulo))]
    pub async fn criar_aviso(
        &self,
        empresa_id: EmpresaId,
        input: &AvisoInput,
        auth: &BearerToken,
    ) -> Result<Aviso, ApiError> {
        self.post(&format!("/empresas/{empresa_id}/avisos"), input, Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, input, auth), fields(aviso_id = %id))]
    pub async fn atualizar_aviso(
        &self,
        id: AvisoId,
        input: &AvisoInput,
        auth: &BearerToken,
    ) -> Result<Aviso, ApiError> {
        self.put(&format!("/avisos/{id}"), input, Some(auth)).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(aviso_id = %id))]
    pub async fn excluir_aviso(&self, id: AvisoId, auth: &BearerToken) -> Result<(), ApiError> {
        self.delete(&format!("/avisos/{id}"), Some(auth)).await
    }
}
