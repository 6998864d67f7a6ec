//! Sales reports.

use cardapio_core::models::{RelatorioFiltro, RelatorioVendas};
use cardapio_core::types::EmpresaId;
use tracing::instrument;

use crate::{ApiClient, ApiError, BearerToken};

impl ApiClient {
    /// Sales report for the filtered period.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn relatorio_vendas(
        &self,
        empresa_id: EmpresaId,
        filtro: &RelatorioFiltro,
        auth: &BearerToken,
    ) -> Result<RelatorioVendas, ApiError> {
        self.get_with_query(
            &format!("/empresas/{empresa_id}/relatorios/vendas"),
            filtro,
            Some(auth),
        )
        .await
    }
}
