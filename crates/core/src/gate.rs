//! Ordering rules for the public menu: whether the cart accepts items and
//! which delivery types can be chosen right now.

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::Empresa;
use crate::types::TipoEntrega;

/// Reason shown when ordering is blocked.
pub const MOTIVO_FECHADO: &str = "Estamos fechados no momento. Confira nossos horários.";
pub const MOTIVO_ONLINE_DESATIVADO: &str = "Pedidos online estão desativados no momento.";
pub const MOTIVO_INATIVA: &str = "Este cardápio está indisponível.";

/// What the customer may do on the menu at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderGate {
    pub pode_adicionar: bool,
    pub pode_finalizar: bool,
    pub entrega_habilitada: bool,
    pub retirada_habilitada: bool,
    pub mesa_habilitada: bool,
    pub motivo: Option<&'static str>,
}

impl OrderGate {
    /// Evaluate the gate for a company given whether it is open now.
    #[must_use]
    pub const fn evaluate(empresa: &Empresa, is_open: bool) -> Self {
        let motivo = if !empresa.ativo {
            Some(MOTIVO_INATIVA)
        } else if !empresa.permitir_pedidos_online {
            Some(MOTIVO_ONLINE_DESATIVADO)
        } else if !is_open {
            Some(MOTIVO_FECHADO)
        } else {
            None
        };
        let liberado = motivo.is_none();

        Self {
            pode_adicionar: liberado,
            pode_finalizar: liberado,
            entrega_habilitada: liberado && !empresa.desativar_entrega,
            retirada_habilitada: liberado && !empresa.desativar_retirada,
            mesa_habilitada: liberado,
            motivo,
        }
    }

    /// Evaluate the gate against the company's schedule at `now`.
    #[must_use]
    pub fn at(empresa: &Empresa, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::evaluate(empresa, empresa.horarios.is_open(now, offset))
    }

    /// Whether `tipo` can be chosen.
    #[must_use]
    pub const fn permite(&self, tipo: TipoEntrega) -> bool {
        match tipo {
            TipoEntrega::Delivery => self.entrega_habilitada,
            TipoEntrega::Retirada => self.retirada_habilitada,
            TipoEntrega::Mesa => self.mesa_habilitada,
        }
    }

    /// Delivery types currently allowed, in menu order.
    #[must_use]
    pub fn tipos_permitidos(&self) -> Vec<TipoEntrega> {
        TipoEntrega::ALL
            .into_iter()
            .filter(|tipo| self.permite(*tipo))
            .collect()
    }
}
