//! Orders: the server-owned record and the creation payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    AdicionalId, EmpresaId, FormaPagamento, OrderFlowError, PedidoId, PedidoStatus, Price,
    ProdutoId, TipoEntrega,
};

use super::Adicional;

/// Courier position reported for delivery orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourierLocation {
    pub lat: f64,
    pub lng: f64,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedidoItem {
    pub produto_id: ProdutoId,
    pub nome: String,
    pub quantidade: u32,
    pub preco_unitario: Price,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub observacoes: String,
    #[serde(default)]
    pub adicionais: Vec<Adicional>,
}

impl PedidoItem {
    /// `(unit price + add-ons) × quantity`.
    #[must_use]
    pub fn total(&self) -> Price {
        let adicionais: Price = self.adicionais.iter().map(|a| a.preco).sum();
        (self.preco_unitario + adicionais) * self.quantidade
    }
}

/// An order as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pedido {
    pub id: PedidoId,
    pub empresa_id: EmpresaId,
    pub cliente_nome: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cliente_telefone: String,
    pub tipo_entrega: TipoEntrega,
    #[serde(default)]
    pub mesa: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub endereco: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bairro: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub observacoes: String,
    #[serde(default)]
    pub forma_pagamento: FormaPagamento,
    #[serde(default)]
    pub troco_para: Option<Price>,
    #[serde(default)]
    pub itens: Vec<PedidoItem>,
    #[serde(default)]
    pub subtotal: Price,
    #[serde(default)]
    pub taxa_entrega: Price,
    pub total: Price,
    pub status: PedidoStatus,
    pub criado_em: DateTime<Utc>,
    #[serde(default)]
    pub atualizado_em: Option<DateTime<Utc>>,
    #[serde(default)]
    pub localizacao_entregador: Option<CourierLocation>,
}

impl Pedido {
    /// Tidy free-text fields after they arrive from the backend.
    ///
    /// Nulls are already empty strings at this point; this trims them and
    /// drops a blank table number.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        for field in [
            &mut self.cliente_telefone,
            &mut self.endereco,
            &mut self.bairro,
            &mut self.observacoes,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        for item in &mut self.itens {
            let trimmed = item.observacoes.trim();
            if trimmed.len() != item.observacoes.len() {
                item.observacoes = trimmed.to_string();
            }
        }
        if self.mesa.as_deref().is_some_and(|m| m.trim().is_empty()) {
            self.mesa = None;
        }
        self
    }

    /// Status the "advance" action moves this order to.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::Terminal`] for delivered or cancelled orders.
    pub const fn proximo_status(&self) -> Result<PedidoStatus, OrderFlowError> {
        self.status.next(self.tipo_entrega)
    }

    /// Short code shown on tickets and the tracker, e.g. `#0042`.
    #[must_use]
    pub fn codigo(&self) -> String {
        format!("#{:04}", self.id.as_i32())
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn quantidade_itens(&self) -> u32 {
        self.itens.iter().map(|i| i.quantidade).sum()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Line of an order creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovoPedidoItem {
    pub produto_id: ProdutoId,
    pub quantidade: u32,
    pub preco_unitario: Price,
    pub observacoes: String,
    pub adicionais: Vec<AdicionalId>,
}

/// Payload for `POST /public/pedidos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovoPedido {
    pub empresa_id: EmpresaId,
    pub cliente_nome: String,
    pub cliente_telefone: String,
    pub tipo_entrega: TipoEntrega,
    pub mesa: Option<String>,
    pub endereco: Option<String>,
    pub bairro: Option<String>,
    pub observacoes: String,
    pub forma_pagamento: FormaPagamento,
    pub troco_para: Option<Price>,
    pub itens: Vec<NovoPedidoItem>,
    pub subtotal: Price,
    pub taxa_entrega: Price,
    pub total: Price,
}

/// Body of `PUT /pedidos/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: PedidoStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PEDIDO_JSON: &str = r#"{
        "id": 42,
        "empresa_id": 1,
        "cliente_nome": "Ana",
        "cliente_telefone": null,
        "tipo_entrega": "mesa",
        "mesa": " ",
        "endereco": null,
        "bairro": null,
        "observacoes": null,
        "forma_pagamento": "pix",
        "itens": [
            {"produto_id": 3, "nome": "Pizza", "quantidade": 2, "preco_unitario": 30,
             "observacoes": null,
             "adicionais": [{"id": 9, "nome": "Borda", "preco": "5.00"}]}
        ],
        "subtotal": 70,
        "total": 70,
        "status": "pronto",
        "criado_em": "2026-10-12T20:15:00Z"
    }"#;

    #[test]
    fn test_null_notes_become_empty_strings() {
        let pedido: Pedido = serde_json::from_str(PEDIDO_JSON).unwrap();
        let pedido = pedido.normalize();
        assert_eq!(pedido.observacoes, "");
        assert_eq!(pedido.cliente_telefone, "");
        assert_eq!(pedido.itens.first().unwrap().observacoes, "");
        assert_eq!(pedido.mesa, None);
    }

    #[test]
    fn test_item_total_includes_addons() {
        let pedido: Pedido = serde_json::from_str(PEDIDO_JSON).unwrap();
        let item = pedido.itens.first().unwrap();
        assert_eq!(item.total(), Price::from_cents(7000));
        assert_eq!(pedido.quantidade_itens(), 2);
    }

    #[test]
    fn test_dine_in_ready_order_advances_to_delivered() {
        let pedido: Pedido = serde_json::from_str(PEDIDO_JSON).unwrap();
        assert_eq!(pedido.proximo_status(), Ok(PedidoStatus::Entregue));
        assert_eq!(pedido.codigo(), "#0042");
    }
}
