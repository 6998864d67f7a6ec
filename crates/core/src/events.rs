//! Realtime order events pushed by the backend's socket channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Pedido;
use crate::types::{EmpresaId, PedidoId};

/// Server event names.
pub mod names {
    pub const NEW_ORDER: &str = "newOrder";
    pub const ORDER_UPDATED: &str = "orderUpdated";
    pub const ORDER_FINALIZED: &str = "orderFinalized";
    pub const ORDER_DELETED: &str = "orderDeleted";
    pub const PEDIDO_UPDATED: &str = "pedidoUpdated";
}

/// A channel a view can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Room {
    /// All order activity of one company (kitchen board).
    Company(EmpresaId),
    /// Updates of a single order (public tracker).
    Pedido(PedidoId),
}

impl Room {
    #[must_use]
    pub const fn join_event(&self) -> &'static str {
        match self {
            Self::Company(_) => "join_company_room",
            Self::Pedido(_) => "join_pedido_room",
        }
    }

    #[must_use]
    pub const fn leave_event(&self) -> &'static str {
        match self {
            Self::Company(_) => "leave_company_room",
            Self::Pedido(_) => "leave_pedido_room",
        }
    }

    /// Argument sent with join and leave events.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Company(id) => Value::from(id.as_i32()),
            Self::Pedido(id) => Value::from(id.as_i32()),
        }
    }
}

impl core::fmt::Display for Room {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Company(id) => write!(f, "empresa:{id}"),
            Self::Pedido(id) => write!(f, "pedido:{id}"),
        }
    }
}

/// Reference to an order that left the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedidoRef {
    #[serde(alias = "pedido_id")]
    pub id: PedidoId,
    #[serde(default)]
    pub empresa_id: Option<EmpresaId>,
}

/// A decoded server event.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    NewOrder(Pedido),
    OrderUpdated(Pedido),
    OrderFinalized(PedidoRef),
    OrderDeleted(PedidoRef),
    PedidoUpdated(Pedido),
}

impl RealtimeEvent {
    /// Decode an event by name. Unknown names yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when a known event carries a malformed payload.
    pub fn decode(name: &str, payload: Value) -> Result<Option<Self>, serde_json::Error> {
        let event = match name {
            names::NEW_ORDER => Self::NewOrder(pedido(payload)?),
            names::ORDER_UPDATED => Self::OrderUpdated(pedido(payload)?),
            names::ORDER_FINALIZED => Self::OrderFinalized(pedido_ref(payload)?),
            names::ORDER_DELETED => Self::OrderDeleted(pedido_ref(payload)?),
            names::PEDIDO_UPDATED => Self::PedidoUpdated(pedido(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewOrder(_) => names::NEW_ORDER,
            Self::OrderUpdated(_) => names::ORDER_UPDATED,
            Self::OrderFinalized(_) => names::ORDER_FINALIZED,
            Self::OrderDeleted(_) => names::ORDER_DELETED,
            Self::PedidoUpdated(_) => names::PEDIDO_UPDATED,
        }
    }

    #[must_use]
    pub const fn pedido_id(&self) -> PedidoId {
        match self {
            Self::NewOrder(p) | Self::OrderUpdated(p) | Self::PedidoUpdated(p) => p.id,
            Self::OrderFinalized(r) | Self::OrderDeleted(r) => r.id,
        }
    }

    /// Room this event belongs to.
    ///
    /// `None` means a company event without a company id; listeners on every
    /// company room should see it and ignore ids they do not hold.
    #[must_use]
    pub const fn room(&self) -> Option<Room> {
        match self {
            Self::NewOrder(p) | Self::OrderUpdated(p) => Some(Room::Company(p.empresa_id)),
            Self::OrderFinalized(r) | Self::OrderDeleted(r) => match r.empresa_id {
                Some(id) => Some(Room::Company(id)),
                None => None,
            },
            Self::PedidoUpdated(p) => Some(Room::Pedido(p.id)),
        }
    }
}

fn pedido(payload: Value) -> Result<Pedido, serde_json::Error> {
    // Some emitters wrap the record as `{ "pedido": {...} }`.
    let payload = match payload {
        Value::Object(mut map) if map.contains_key("pedido") && !map.contains_key("id") => {
            map.remove("pedido").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value::<Pedido>(payload).map(Pedido::normalize)
}

fn pedido_ref(payload: Value) -> Result<PedidoRef, serde_json::Error> {
    match payload {
        Value::Number(_) => Ok(PedidoRef {
            id: serde_json::from_value(payload)?,
            empresa_id: None,
        }),
        other => serde_json::from_value(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pedido_json(id: i32, status: &str) -> Value {
        json!({
            "id": id,
            "empresa_id": 5,
            "cliente_nome": "Ana",
            "tipo_entrega": "delivery",
            "observacoes": null,
            "total": 25,
            "status": status,
            "criado_em": "2026-10-12T20:00:00Z"
        })
    }

    #[test]
    fn test_decode_company_events_route_by_empresa() {
        let event = RealtimeEvent::decode("newOrder", pedido_json(1, "pendente"))
            .unwrap()
            .unwrap();
        assert_eq!(event.room(), Some(Room::Company(EmpresaId::new(5))));
        assert_eq!(event.pedido_id(), PedidoId::new(1));
    }

    #[test]
    fn test_pedido_updated_routes_by_order_id() {
        let event = RealtimeEvent::decode("pedidoUpdated", pedido_json(9, "pronto"))
            .unwrap()
            .unwrap();
        assert_eq!(event.room(), Some(Room::Pedido(PedidoId::new(9))));
    }

    #[test]
    fn test_wrapped_payload_is_unwrapped() {
        let event = RealtimeEvent::decode("orderUpdated", json!({"pedido": pedido_json(3, "em_preparo")}))
            .unwrap()
            .unwrap();
        assert_eq!(event.pedido_id(), PedidoId::new(3));
    }

    #[test]
    fn test_finalized_accepts_bare_id_or_object() {
        let bare = RealtimeEvent::decode("orderFinalized", json!(7)).unwrap().unwrap();
        assert_eq!(bare.room(), None);
        let full = RealtimeEvent::decode("orderDeleted", json!({"id": 7, "empresa_id": 5}))
            .unwrap()
            .unwrap();
        assert_eq!(full.room(), Some(Room::Company(EmpresaId::new(5))));
        assert_eq!(full.pedido_id(), PedidoId::new(7));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert!(RealtimeEvent::decode("typing", json!({})).unwrap().is_none());
        assert!(RealtimeEvent::decode("newOrder", json!({"id": "x"})).is_err());
    }

    #[test]
    fn test_room_events() {
        let room = Room::Pedido(PedidoId::new(4));
        assert_eq!(room.join_event(), "join_pedido_room");
        assert_eq!(room.leave_event(), "leave_pedido_room");
        assert_eq!(room.payload(), json!(4));
        assert_eq!(room.to_string(), "pedido:4");
    }
}
