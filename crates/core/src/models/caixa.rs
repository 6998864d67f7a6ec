//! Cash-register sessions and their movements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CaixaId, EmpresaId, MovimentacaoId, MovimentacaoTipo, Price};

/// Cash added to (suprimento) or withdrawn from (sangria) the drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movimentacao {
    pub id: MovimentacaoId,
    pub tipo: MovimentacaoTipo,
    pub valor: Price,
    #[serde(default)]
    pub descricao: String,
    pub criado_em: DateTime<Utc>,
}

/// A cash-register session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caixa {
    pub id: CaixaId,
    pub empresa_id: EmpresaId,
    pub aberto_em: DateTime<Utc>,
    #[serde(default)]
    pub fechado_em: Option<DateTime<Utc>>,
    pub valor_abertura: Price,
    #[serde(default)]
    pub valor_fechamento: Option<Price>,
    /// Cash sales recorded while the session was open.
    #[serde(default)]
    pub vendas_dinheiro: Price,
    #[serde(default)]
    pub movimentacoes: Vec<Movimentacao>,
}

impl Caixa {
    #[must_use]
    pub const fn aberto(&self) -> bool {
        self.fechado_em.is_none()
    }

    /// Sum of movements of one kind.
    #[must_use]
    pub fn total_por_tipo(&self, tipo: MovimentacaoTipo) -> Price {
        self.movimentacoes
            .iter()
            .filter(|m| m.tipo == tipo)
            .map(|m| m.valor)
            .sum()
    }

    /// Opening amount plus cash sales and supplies, minus withdrawals.
    #[must_use]
    pub fn saldo_esperado(&self) -> Price {
        self.valor_abertura + self.vendas_dinheiro + self.total_por_tipo(MovimentacaoTipo::Suprimento)
            - self.total_por_tipo(MovimentacaoTipo::Sangria)
    }

    /// Counted minus expected, once the session is closed.
    #[must_use]
    pub fn diferenca(&self) -> Option<Price> {
        self.valor_fechamento.map(|contado| contado - self.saldo_esperado())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbrirCaixa {
    pub valor_abertura: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FecharCaixa {
    pub valor_fechamento: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovimentacaoInput {
    pub tipo: MovimentacaoTipo,
    pub valor: Price,
    pub descricao: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mov(id: i32, tipo: MovimentacaoTipo, cents: i64) -> Movimentacao {
        Movimentacao {
            id: MovimentacaoId::new(id),
            tipo,
            valor: Price::from_cents(cents),
            descricao: String::new(),
            criado_em: "2026-10-12T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_saldo_esperado() {
        let mut caixa = Caixa {
            id: CaixaId::new(1),
            empresa_id: EmpresaId::new(1),
            aberto_em: "2026-10-12T10:00:00Z".parse().unwrap(),
            fechado_em: None,
            valor_abertura: Price::from_cents(10_000),
            valor_fechamento: None,
            vendas_dinheiro: Price::from_cents(4_550),
            movimentacoes: vec![
                mov(1, MovimentacaoTipo::Suprimento, 2_000),
                mov(2, MovimentacaoTipo::Sangria, 5_000),
                mov(3, MovimentacaoTipo::Sangria, 500),
            ],
        };
        assert!(caixa.aberto());
        assert_eq!(caixa.saldo_esperado(), Price::from_cents(11_050));
        assert_eq!(caixa.diferenca(), None);

        caixa.fechado_em = Some("2026-10-12T23:00:00Z".parse().unwrap());
        caixa.valor_fechamento = Some(Price::from_cents(11_000));
        assert!(!caixa.aberto());
        assert_eq!(caixa.diferenca(), Some(Price::from_cents(-50)));
    }
}
