//! Product catalogue management.

use cardapio_core::models::{Produto, ProdutoInput};
use cardapio_core::types::{EmpresaId, ProdutoId};
use tracing::instrument;

use crate::{ApiClient, ApiError, BearerToken};

impl ApiClient {
    /// All products of a company, including unavailable ones.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn listar_produtos(
        &self,
        empresa_id: EmpresaId,
        auth: &BearerToken,
    ) -> Result<Vec<Produto>, ApiError> {
        self.get(&format!("/empresas/{empresa_id}/produtos"), Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the product.
    #[instrument(skip(self, input, auth), fields(nome = %input.nome))]
    pub async fn criar_produto(
        &self,
        empresa_id: EmpresaId,
        input: &ProdutoInput,
        auth: &BearerToken,
    ) -> Result<Produto, ApiError> {
        self.post(&format!("/empresas/{empresa_id}/produtos"), input, Some(auth))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the backend rejects the update.
    #[instrument(skip(self, input, auth), fields(produto_id = %id))]
    pub async fn atualizar_produto(
        &self,
        id: ProdutoId,
        input: &ProdutoInput,
        auth: &BearerToken,
    ) -> Result<Produto, ApiError> {
        self.put(&format!("/produtos/{id}"), input, Some(auth)).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(produto_id = %id))]
    pub async fn excluir_produto(&self, id: ProdutoId, auth: &BearerToken) -> Result<(), ApiError> {
        self.delete(&format!("/produtos/{id}"), Some(auth)).await
    }
}
