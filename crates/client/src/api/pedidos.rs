//! Order board operations.

use cardapio_core::models::{Pedido, StatusUpdate};
use cardapio_core::types::{EmpresaId, PedidoId, PedidoStatus};
use tracing::instrument;

use crate::{ApiClient, ApiError, BearerToken};

impl ApiClient {
    /// Orders of a company, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth))]
    pub async fn listar_pedidos(
        &self,
        empresa_id: EmpresaId,
        status: Option<PedidoStatus>,
        auth: &BearerToken,
    ) -> Result<Vec<Pedido>, ApiError> {
        let path = format!("/empresas/{empresa_id}/pedidos");
        let pedidos: Vec<Pedido> = match status {
            Some(status) => {
                self.get_with_query(&path, &[("status", status.as_str())], Some(auth))
                    .await?
            }
            None => self.get(&path, Some(auth)).await?,
        };
        Ok(pedidos.into_iter().map(Pedido::normalize).collect())
    }

    /// Move an order to `status`.
    ///
    /// The board is not updated here; the change comes back as an
    /// `orderUpdated` event.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the transition.
    #[instrument(skip(self, auth), fields(pedido_id = %id, status = %status))]
    pub async fn atualizar_status(
        &self,
        id: PedidoId,
        status: PedidoStatus,
        auth: &BearerToken,
    ) -> Result<(), ApiError> {
        self.put_unit(&format!("/pedidos/{id}/status"), &StatusUpdate { status }, Some(auth))
            .await
    }
}
