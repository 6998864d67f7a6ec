//! Unauthenticated endpoints used by the public menu.

use cardapio_core::models::{Aviso, Empresa, Endereco, NovoPedido, Pedido, Produto};
use cardapio_core::types::PedidoId;
use tracing::instrument;

use crate::{ApiClient, ApiError};

impl ApiClient {
    /// Get a company by its slug. Cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown slugs.
    #[instrument(skip(self))]
    pub async fn empresa_por_slug(&self, slug: &str) -> Result<Empresa, ApiError> {
        if let Some(empresa) = self.cached_empresa(slug).await {
            return Ok(empresa);
        }
        let empresa: Empresa = self.get(&format!("/public/empresas/{slug}"), None).await?;
        self.cache_empresa(&empresa).await;
        Ok(empresa)
    }

    /// Products on a company's public menu.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn cardapio(&self, slug: &str) -> Result<Vec<Produto>, ApiError> {
        self.get(&format!("/public/empresas/{slug}/produtos"), None)
            .await
    }

    /// Active notices of a company.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn avisos_publicos(&self, slug: &str) -> Result<Vec<Aviso>, ApiError> {
        let avisos: Vec<Aviso> = self
            .get(&format!("/public/empresas/{slug}/avisos"), None)
            .await?;
        Ok(avisos.into_iter().filter(|a| a.ativo).collect())
    }

    /// Neighbourhoods a company delivers to.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn bairros_atendidos(&self, slug: &str) -> Result<Vec<Endereco>, ApiError> {
        let enderecos: Vec<Endereco> = self
            .get(&format!("/public/empresas/{slug}/enderecos"), None)
            .await?;
        Ok(enderecos.into_iter().filter(|e| e.ativo).collect())
    }

    /// Place an order from the public menu.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the order.
    #[instrument(skip(self, pedido), fields(empresa_id = %pedido.empresa_id, tipo = %pedido.tipo_entrega))]
    pub async fn criar_pedido(&self, pedido: &NovoPedido) -> Result<Pedido, ApiError> {
        let criado: Pedido = self.post("/public/pedidos", pedido, None).await?;
        Ok(criado.normalize())
    }

    /// Current state of an order, for the public tracker.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown orders.
    #[instrument(skip(self), fields(pedido_id = %id))]
    pub async fn acompanhar_pedido(&self, id: PedidoId) -> Result<Pedido, ApiError> {
        let pedido: Pedido = self.get(&format!("/public/pedidos/{id}"), None).await?;
        Ok(pedido.normalize())
    }
}
