//! Client-side views of live orders, reconciled from realtime events.
//!
//! [`OrderBoard`] is the kitchen board of one company; [`TrackedOrder`] is the
//! customer's view of a single order. Both start from a REST snapshot and
//! then apply events in arrival order, last message winning.

use std::collections::BTreeMap;

use crate::events::RealtimeEvent;
use crate::models::Pedido;
use crate::types::{EmpresaId, PedidoId, PedidoStatus};

/// One board column.
#[derive(Debug, Clone)]
pub struct Coluna<'a> {
    pub status: PedidoStatus,
    pub pedidos: Vec<&'a Pedido>,
}

/// Orders of one company that are still in progress.
#[derive(Debug, Clone)]
pub struct OrderBoard {
    empresa_id: EmpresaId,
    pedidos: BTreeMap<PedidoId, Pedido>,
}

impl OrderBoard {
    /// Statuses the board displays.
    pub const VISIBLE: [PedidoStatus; 4] = PedidoStatus::BOARD;

    #[must_use]
    pub fn new(empresa_id: EmpresaId) -> Self {
        Self {
            empresa_id,
            pedidos: BTreeMap::new(),
        }
    }

    /// Build a board from a REST snapshot, keeping only visible orders.
    #[must_use]
    pub fn from_snapshot(empresa_id: EmpresaId, pedidos: Vec<Pedido>) -> Self {
        let mut board = Self::new(empresa_id);
        for pedido in pedidos {
            if pedido.empresa_id == empresa_id && is_visible(pedido.status) {
                board.pedidos.insert(pedido.id, pedido.normalize());
            }
        }
        board
    }

    #[must_use]
    pub const fn empresa_id(&self) -> EmpresaId {
        self.empresa_id
    }

    #[must_use]
    pub fn get(&self, id: PedidoId) -> Option<&Pedido> {
        self.pedidos.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pedidos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pedidos.is_empty()
    }

    /// Apply one event. Returns whether the board changed.
    pub fn apply(&mut self, event: &RealtimeEvent) -> bool {
        match event {
            RealtimeEvent::NewOrder(pedido) => {
                if !self.owns(pedido)
                    || !is_visible(pedido.status)
                    || self.pedidos.contains_key(&pedido.id)
                {
                    return false;
                }
                self.pedidos.insert(pedido.id, pedido.clone());
                true
            }
            RealtimeEvent::OrderUpdated(pedido) => {
                if !self.owns(pedido) {
                    return false;
                }
                if is_visible(pedido.status) {
                    self.pedidos.insert(pedido.id, pedido.clone());
                    true
                } else {
                    self.pedidos.remove(&pedido.id).is_some()
                }
            }
            RealtimeEvent::OrderFinalized(r) | RealtimeEvent::OrderDeleted(r) => {
                if r.empresa_id.is_some_and(|id| id != self.empresa_id) {
                    return false;
                }
                self.pedidos.remove(&r.id).is_some()
            }
            RealtimeEvent::PedidoUpdated(_) => false,
        }
    }

    /// Orders grouped by status in board order, oldest first.
    #[must_use]
    pub fn columns(&self) -> Vec<Coluna<'_>> {
        Self::VISIBLE
            .into_iter()
            .map(|status| {
                let mut pedidos: Vec<&Pedido> =
                    self.pedidos.values().filter(|p| p.status == status).collect();
                pedidos.sort_by_key(|p| (p.criado_em, p.id));
                Coluna { status, pedidos }
            })
            .collect()
    }

    fn owns(&self, pedido: &Pedido) -> bool {
        pedido.empresa_id == self.empresa_id
    }
}

fn is_visible(status: PedidoStatus) -> bool {
    OrderBoard::VISIBLE.contains(&status)
}

/// The customer's view of one order.
#[derive(Debug, Clone)]
pub struct TrackedOrder {
    pedido: Pedido,
}

impl TrackedOrder {
    #[must_use]
    pub fn new(pedido: Pedido) -> Self {
        Self {
            pedido: pedido.normalize(),
        }
    }

    #[must_use]
    pub const fn pedido(&self) -> &Pedido {
        &self.pedido
    }

    #[must_use]
    pub fn into_inner(self) -> Pedido {
        self.pedido
    }

    /// Replace the record when a `pedidoUpdated` for this order arrives.
    /// Returns whether the record changed.
    pub fn apply(&mut self, event: &RealtimeEvent) -> bool {
        match event {
            RealtimeEvent::PedidoUpdated(pedido) if pedido.id == self.pedido.id => {
                self.pedido = pedido.clone();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::PedidoRef;
    use crate::types::{FormaPagamento, Price, TipoEntrega};
    use chrono::{DateTime, Duration, Utc};

    fn pedido(id: i32, status: PedidoStatus, minutes_ago: i64) -> Pedido {
        let base: DateTime<Utc> = "2026-10-12T20:00:00Z".parse().unwrap();
        Pedido {
            id: PedidoId::new(id),
            empresa_id: EmpresaId::new(1),
            cliente_nome: format!("Cliente {id}"),
            cliente_telefone: String::new(),
            tipo_entrega: TipoEntrega::Delivery,
            mesa: None,
            endereco: String::new(),
            bairro: String::new(),
            observacoes: String::new(),
            forma_pagamento: FormaPagamento::Pix,
            troco_para: None,
            itens: vec![],
            subtotal: Price::from_cents(1000),
            taxa_entrega: Price::ZERO,
            total: Price::from_cents(1000),
            status,
            criado_em: base - Duration::minutes(minutes_ago),
            atualizado_em: None,
            localizacao_entregador: None,
        }
    }

    fn board() -> OrderBoard {
        OrderBoard::from_snapshot(
            EmpresaId::new(1),
            vec![
                pedido(1, PedidoStatus::Pendente, 10),
                pedido(2, PedidoStatus::EmPreparo, 20),
                pedido(3, PedidoStatus::Entregue, 30),
            ],
        )
    }

    #[test]
    fn test_snapshot_keeps_only_visible() {
        let board = board();
        assert_eq!(board.len(), 2);
        assert!(board.get(PedidoId::new(3)).is_none());
    }

    #[test]
    fn test_new_order_appends_once() {
        let mut board = board();
        let novo = pedido(4, PedidoStatus::Pendente, 0);
        assert!(board.apply(&RealtimeEvent::NewOrder(novo.clone())));
        assert!(!board.apply(&RealtimeEvent::NewOrder(novo)));
        assert_eq!(board.len(), 3);
        assert!(!board.apply(&RealtimeEvent::NewOrder(pedido(5, PedidoStatus::Cancelado, 0))));
    }

    #[test]
    fn test_new_order_from_other_company_is_ignored() {
        let mut board = board();
        let mut outro = pedido(9, PedidoStatus::Pendente, 0);
        outro.empresa_id = EmpresaId::new(2);
        assert!(!board.apply(&RealtimeEvent::NewOrder(outro)));
    }

    #[test]
    fn test_update_moves_drops_and_inserts() {
        let mut board = board();

        assert!(board.apply(&RealtimeEvent::OrderUpdated(pedido(1, PedidoStatus::Pronto, 10))));
        assert_eq!(board.get(PedidoId::new(1)).unwrap().status, PedidoStatus::Pronto);

        assert!(board.apply(&RealtimeEvent::OrderUpdated(pedido(2, PedidoStatus::Entregue, 20))));
        assert!(board.get(PedidoId::new(2)).is_none());

        // Unknown order that became visible, e.g. missed creation event.
        assert!(board.apply(&RealtimeEvent::OrderUpdated(pedido(8, PedidoStatus::EmPreparo, 5))));
        assert!(board.get(PedidoId::new(8)).is_some());

        assert!(!board.apply(&RealtimeEvent::OrderUpdated(pedido(99, PedidoStatus::Cancelado, 0))));
    }

    #[test]
    fn test_finalized_and_deleted_remove() {
        let mut board = board();
        let fim = PedidoRef {
            id: PedidoId::new(1),
            empresa_id: Some(EmpresaId::new(1)),
        };
        assert!(board.apply(&RealtimeEvent::OrderFinalized(fim)));
        let sem_empresa = PedidoRef {
            id: PedidoId::new(2),
            empresa_id: None,
        };
        assert!(board.apply(&RealtimeEvent::OrderDeleted(sem_empresa)));
        assert!(board.is_empty());
        assert!(!board.apply(&RealtimeEvent::OrderDeleted(sem_empresa)));
    }

    #[test]
    fn test_columns_group_in_board_order_oldest_first() {
        let mut board = board();
        board.apply(&RealtimeEvent::NewOrder(pedido(4, PedidoStatus::Pendente, 40)));
        let columns = board.columns();
        let statuses: Vec<PedidoStatus> = columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, PedidoStatus::BOARD.to_vec());

        let pendentes: Vec<i32> = columns
            .first()
            .unwrap()
            .pedidos
            .iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(pendentes, vec![4, 1]);
        assert!(columns.get(2).unwrap().pedidos.is_empty());
    }

    #[test]
    fn test_tracked_order_replaces_only_same_id() {
        let mut tracked = TrackedOrder::new(pedido(1, PedidoStatus::Pendente, 0));
        assert!(!tracked.apply(&RealtimeEvent::PedidoUpdated(pedido(2, PedidoStatus::Pronto, 0))));
        assert!(!tracked.apply(&RealtimeEvent::OrderUpdated(pedido(1, PedidoStatus::Pronto, 0))));
        assert!(tracked.apply(&RealtimeEvent::PedidoUpdated(pedido(1, PedidoStatus::SaiuParaEntrega, 0))));
        assert_eq!(tracked.pedido().status, PedidoStatus::SaiuParaEntrega);
    }
}
