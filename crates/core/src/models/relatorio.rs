//! Sales report returned by `GET /empresas/{id}/relatorios/vendas`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Price, TipoEntrega};

/// Query-string filters for the sales report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatorioFiltro {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inicio: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fim: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_entrega: Option<TipoEntrega>,
}

impl RelatorioFiltro {
    /// Swap an inverted range so `inicio <= fim`.
    #[must_use]
    pub fn normalizado(self) -> Self {
        match (self.inicio, self.fim) {
            (Some(inicio), Some(fim)) if inicio > fim => Self {
                inicio: Some(fim),
                fim: Some(inicio),
                ..self
            },
            _ => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendasDia {
    pub data: NaiveDate,
    pub pedidos: u64,
    pub faturamento: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProdutoVendido {
    pub nome: String,
    pub quantidade: u64,
    pub faturamento: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RelatorioVendas {
    pub total_pedidos: u64,
    pub faturamento: Price,
    #[serde(default)]
    pub ticket_medio: Price,
    #[serde(default)]
    pub por_dia: Vec<VendasDia>,
    #[serde(default)]
    pub produtos_mais_vendidos: Vec<ProdutoVendido>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_is_swapped() {
        let a = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 10, 31).unwrap();
        let filtro = RelatorioFiltro {
            inicio: Some(b),
            fim: Some(a),
            tipo_entrega: None,
        }
        .normalizado();
        assert_eq!(filtro.inicio, Some(a));
        assert_eq!(filtro.fim, Some(b));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let r: RelatorioVendas =
            serde_json::from_str(r#"{"total_pedidos": 0, "faturamento": 0}"#).unwrap();
        assert!(r.por_dia.is_empty());
        assert!(r.ticket_medio.is_zero());
    }
}
