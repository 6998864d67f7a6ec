//! Company settings and super-admin company management.

use cardapio_core::models::{ConfiguracoesEmpresa, Empresa, EmpresaInput};
use cardapio_core::types::EmpresaId;
use tracing::instrument;

use crate::{ApiClient, ApiError, BearerToken};

impl ApiClient {
    /// Save feature flags and opening hours. Drops the cached company so the
    /// menu served by this process picks the change up.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the settings.
    #[instrument(skip(self, config, auth))]
    pub async fn salvar_configuracoes(
        &self,
        empresa_id: EmpresaId,
        slug: &str,
        config: &ConfiguracoesEmpresa,
        auth: &BearerToken,
    ) -> Result<Empresa, ApiError> {
        let empresa: Empresa = self
            .put(&format!("/empresas/{empresa_id}/configuracoes"), config, Some(auth))
            .await?;
        self.invalidate_empresa(slug).await;
        Ok(empresa)
    }

    /// All tenant companies.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non super admins.
    #[instrument(skip(self, auth))]
    pub async fn listar_empresas(&self, auth: &BearerToken) -> Result<Vec<Empresa>, ApiError> {
        self.get("/empresas", Some(auth)).await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the company.
    #[instrument(skip(self, input, auth), fields(slug = %input.slug))]
    pub async fn criar_empresa(
        &self,
        input: &EmpresaInput,
        auth: &BearerToken,
    ) -> Result<Empresa, ApiError> {
        self.post("/empresas", input, Some(auth)).await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, input, auth), fields(empresa_id = %id))]
    pub async fn atualizar_empresa(
        &self,
        id: EmpresaId,
        input: &EmpresaInput,
        auth: &BearerToken,
    ) -> Result<Empresa, ApiError> {
        let empresa: Empresa = self.put(&format!("/empresas/{id}"), input, Some(auth)).await?;
        self.invalidate_empresa(empresa.slug.as_str()).await;
        Ok(empresa)
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(empresa_id = %id))]
    pub async fn excluir_empresa(&self, id: EmpresaId, auth: &BearerToken) -> Result<(), ApiError> {
        self.delete(&format!("/empresas/{id}"), Some(auth)).await
    }
}
