//! Cash register sessions.

use cardapio_core::models::{AbrirCaixa, Caixa, FecharCaixa, Movimentacao, MovimentacaoInput};
use cardapio_core::types::{CaixaId, EmpresaId, Price};
use tracing::instrument;

use crate::{ApiClient, ApiError, BearerToken};

impl ApiClient {
    /// The open cash session, or `None` when the register is closed.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails for any reason other than
    /// "no open session".
    #[instrument(skip(self, auth))]
    pub async fn caixa_atual(
        &self,
        empresa_id: EmpresaId,
        auth: &BearerToken,
    ) -> Result<Option<Caixa>, ApiError> {
        match self
            .get::<Caixa>(&format!("/empresas/{empresa_id}/caixa/atual"), Some(auth))
            .await
        {
            Ok(caixa) => Ok(Some(caixa)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// # Errors
    ///
    /// Returns error if a session is already open or the request fails.
    #[instrument(skip(self, auth), fields(valor = %valor_abertura))]
    pub async fn abrir_caixa(
        &self,
        empresa_id: EmpresaId,
        valor_abertura: Price,
        auth: &BearerToken,
    ) -> Result<Caixa, ApiError> {
        self.post(
            &format!("/empresas/{empresa_id}/caixa/abrir"),
            &AbrirCaixa { valor_abertura },
            Some(auth),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, auth), fields(caixa_id = %id, valor = %valor_fechamento))]
    pub async fn fechar_caixa(
        &self,
        id: CaixaId,
        valor_fechamento: Price,
        auth: &BearerToken,
    ) -> Result<Caixa, ApiError> {
        self.post(
            &format!("/caixas/{id}/fechar"),
            &FecharCaixa { valor_fechamento },
            Some(auth),
        )
        .await
    }

    /// Record a suprimento or sangria.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input, auth), fields(caixa_id = %id, tipo = input.tipo.as_str()))]
    pub async fn registrar_movimentacao(
        &self,
        id: CaixaId,
        input: &MovimentacaoInput,
        auth: &BearerToken,
    ) -> Result<Movimentacao, ApiError> {
        self.post(&format!("/caixas/{id}/movimentacoes"), input, Some(auth))
            .await
    }
}
