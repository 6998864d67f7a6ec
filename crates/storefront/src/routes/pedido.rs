//! Order tracking route handlers.
//!
//! The tracker page renders the order once; the status panel then follows
//! the order over Server-Sent Events. Each event carries the re-rendered
//! panel, swapped in by the HTMX `sse` extension.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use cardapio_client::SubscriptionError;
use cardapio_core::models::{Empresa, Pedido, PedidoItem};
use cardapio_core::{PedidoId, PedidoStatus, Room, TipoEntrega, TrackedOrder};
use chrono::FixedOffset;
use tower_sessions::Session;
use tracing::instrument;

use super::menu::EmpresaView;
use super::{TenantContext, load_tenant};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, take_flash};
use crate::models::Flash;
use crate::state::AppState;

/// SSE event carrying the status panel.
pub const STATUS_EVENT: &str = "pedido";

/// SSE event sent once the order can no longer change.
pub const CLOSE_EVENT: &str = "encerrado";

// =============================================================================
// Views
// =============================================================================

/// One step of the progress bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EtapaView {
    pub label: &'static str,
    pub concluida: bool,
    pub atual: bool,
}

/// Steps an order of this type goes through, marked against `status`.
///
/// Cancelled orders have no progress bar.
#[must_use]
pub fn etapas(status: PedidoStatus, tipo: TipoEntrega) -> Vec<EtapaView> {
    if status == PedidoStatus::Cancelado {
        return Vec::new();
    }

    let mut fluxo = vec![PedidoStatus::Pendente];
    let mut atual = PedidoStatus::Pendente;
    while let Ok(next) = atual.next(tipo) {
        fluxo.push(next);
        atual = next;
    }

    let posicao = fluxo.iter().position(|s| *s == status).unwrap_or(0);
    fluxo
        .into_iter()
        .enumerate()
        .map(|(i, s)| EtapaView {
            label: s.label(),
            concluida: i < posicao || (i == posicao && s.is_terminal()),
            atual: i == posicao,
        })
        .collect()
}

/// Order line display data.
#[derive(Clone)]
pub struct PedidoItemView {
    pub nome: String,
    pub quantidade: u32,
    pub adicionais: Vec<String>,
    pub observacoes: Option<String>,
    pub total: String,
}

impl From<&PedidoItem> for PedidoItemView {
    fn from(item: &PedidoItem) -> Self {
        Self {
            nome: item.nome.clone(),
            quantidade: item.quantidade,
            adicionais: item.adicionais.iter().map(|a| a.nome.clone()).collect(),
            observacoes: Some(item.observacoes.clone()).filter(|o| !o.is_empty()),
            total: item.total().display(),
        }
    }
}

/// Courier position for the map.
#[derive(Clone)]
pub struct LocalizacaoView {
    pub lat: String,
    pub lng: String,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct PedidoView {
    pub id: i32,
    pub codigo: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub cancelado: bool,
    pub encerrado: bool,
    pub etapas: Vec<EtapaView>,
    pub tipo_label: &'static str,
    pub mesa: Option<String>,
    pub endereco: Option<String>,
    pub cliente_nome: String,
    pub itens: Vec<PedidoItemView>,
    pub subtotal: String,
    pub taxa_entrega: Option<String>,
    pub total: String,
    pub forma_pagamento: &'static str,
    pub troco_para: Option<String>,
    pub criado_em: String,
    pub localizacao: Option<LocalizacaoView>,
}

impl PedidoView {
    /// Build the view, showing times in the restaurant's offset.
    #[must_use]
    pub fn new(pedido: &Pedido, offset: FixedOffset) -> Self {
        let endereco = (pedido.tipo_entrega == TipoEntrega::Delivery)
            .then(|| match pedido.bairro.as_str() {
                "" => pedido.endereco.clone(),
                bairro => format!("{} - {bairro}", pedido.endereco),
            });
        Self {
            id: pedido.id.as_i32(),
            codigo: pedido.codigo(),
            status: pedido.status.as_str(),
            status_label: pedido.status.label(),
            cancelado: pedido.status == PedidoStatus::Cancelado,
            encerrado: pedido.status.is_terminal(),
            etapas: etapas(pedido.status, pedido.tipo_entrega),
            tipo_label: pedido.tipo_entrega.label(),
            mesa: pedido.mesa.clone(),
            endereco,
            cliente_nome: pedido.cliente_nome.clone(),
            itens: pedido.itens.iter().map(PedidoItemView::from).collect(),
            subtotal: pedido.subtotal.display(),
            taxa_entrega: (!pedido.taxa_entrega.is_zero()).then(|| pedido.taxa_entrega.display()),
            total: pedido.total.display(),
            forma_pagamento: pedido.forma_pagamento.label(),
            troco_para: pedido.troco_para.map(|t| t.display()),
            criado_em: pedido
                .criado_em
                .with_timezone(&offset)
                .format("%d/%m/%Y %H:%M")
                .to_string(),
            localizacao: pedido.localizacao_entregador.map(|l| LocalizacaoView {
                lat: l.lat.to_string(),
                lng: l.lng.to_string(),
            }),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Order tracker page template.
#[derive(Template, WebTemplate)]
#[template(path = "pedido/show.html")]
pub struct PedidoTemplate {
    pub nonce: String,
    pub flash: Option<Flash>,
    pub empresa: EmpresaView,
    pub pedido: PedidoView,
}

/// Status panel fragment, pushed over SSE.
#[derive(Template)]
#[template(path = "partials/pedido_status.html")]
pub struct PedidoStatusTemplate {
    pub pedido: PedidoView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the order tracker.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path((slug, id)): Path<(String, i32)>,
) -> Result<PedidoTemplate> {
    let TenantContext { empresa, .. } = load_tenant(&state, &slug).await?;
    let pedido = fetch_pedido(&state, &empresa, PedidoId::new(id)).await?;
    let tracked = TrackedOrder::new(pedido);

    Ok(PedidoTemplate {
        nonce,
        flash: take_flash(&session).await,
        empresa: EmpresaView::from(&empresa),
        pedido: PedidoView::new(tracked.pedido(), state.config().utc_offset),
    })
}

/// Stream status panel updates (SSE).
///
/// The stream owns the realtime subscription, so the room is left as soon
/// as the browser disconnects. It ends after the order reaches a terminal
/// status.
#[instrument(skip(state))]
pub async fn stream(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i32)>,
) -> Result<Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>>> {
    let TenantContext { empresa, .. } = load_tenant(&state, &slug).await?;
    let id = PedidoId::new(id);

    // Subscribe before the snapshot so no update falls in between.
    let mut subscription = state
        .realtime()
        .subscribe(Room::Pedido(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let pedido = fetch_pedido(&state, &empresa, id).await?;

    let api = state.api().clone();
    let offset = state.config().utc_offset;

    let stream = async_stream::stream! {
        let mut tracked = TrackedOrder::new(pedido);
        yield Ok::<Event, Infallible>(status_event(tracked.pedido(), offset));

        while !tracked.pedido().status.is_terminal() {
            match subscription.recv().await {
                Ok(event) => {
                    if tracked.apply(&event) {
                        yield Ok(status_event(tracked.pedido(), offset));
                    }
                }
                Err(reason @ (SubscriptionError::Lagged(_) | SubscriptionError::Resynced)) => {
                    tracing::warn!(pedido_id = %id, %reason, "Tracker out of sync, refetching order");
                    match api.acompanhar_pedido(id).await {
                        Ok(pedido) => {
                            tracked = TrackedOrder::new(pedido);
                            yield Ok(status_event(tracked.pedido(), offset));
                        }
                        Err(e) => tracing::warn!(pedido_id = %id, error = %e, "Refetch failed"),
                    }
                }
                Err(SubscriptionError::Closed) => break,
            }
        }

        if tracked.pedido().status.is_terminal() {
            yield Ok(Event::default().event(CLOSE_EVENT).data(tracked.pedido().status.as_str()));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Fetch an order and make sure it belongs to this restaurant.
async fn fetch_pedido(state: &AppState, empresa: &Empresa, id: PedidoId) -> Result<Pedido> {
    let pedido = state.api().acompanhar_pedido(id).await?;
    if pedido.empresa_id != empresa.id {
        return Err(AppError::NotFound(format!("pedido {id}")));
    }
    Ok(pedido)
}

fn status_event(pedido: &Pedido, offset: FixedOffset) -> Event {
    let template = PedidoStatusTemplate {
        pedido: PedidoView::new(pedido, offset),
    };
    match template.render() {
        Ok(html) => Event::default().event(STATUS_EVENT).data(html),
        Err(e) => {
            tracing::error!(pedido_id = %pedido.id, error = %e, "Failed to render status panel");
            Event::default().comment("render failed")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::models::CourierLocation;
    use cardapio_core::{EmpresaId, FormaPagamento, Price};

    fn pedido(status: PedidoStatus, tipo: TipoEntrega) -> Pedido {
        Pedido {
            id: PedidoId::new(42),
            empresa_id: EmpresaId::new(1),
            cliente_nome: "Ana".to_string(),
            cliente_telefone: "11999990000".to_string(),
            tipo_entrega: tipo,
            mesa: None,
            endereco: "Rua A, 10".to_string(),
            bairro: "Centro".to_string(),
            observacoes: String::new(),
            forma_pagamento: FormaPagamento::Pix,
            troco_para: None,
            itens: vec![],
            subtotal: Price::from_cents(4000),
            taxa_entrega: Price::from_cents(500),
            total: Price::from_cents(4500),
            status,
            criado_em: "2026-10-12T23:30:00Z".parse().unwrap(),
            atualizado_em: None,
            localizacao_entregador: None,
        }
    }

    // =========================================================================
    // Progress Steps Tests
    // =========================================================================

    #[test]
    fn test_delivery_orders_have_five_steps() {
        let steps = etapas(PedidoStatus::Pronto, TipoEntrega::Delivery);
        let labels: Vec<_> = steps.iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                "Aguardando confirmação",
                "Em preparo",
                "Pronto",
                "Saiu para entrega",
                "Entregue"
            ]
        );
        assert!(steps[0].concluida && steps[1].concluida);
        assert!(steps[2].atual && !steps[2].concluida);
        assert!(!steps[3].concluida);
    }

    #[test]
    fn test_pickup_orders_skip_courier_step() {
        let steps = etapas(PedidoStatus::Entregue, TipoEntrega::Retirada);
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|e| e.concluida));
        assert!(steps[3].atual);
    }

    #[test]
    fn test_cancelled_orders_have_no_steps() {
        assert!(etapas(PedidoStatus::Cancelado, TipoEntrega::Mesa).is_empty());
    }

    // =========================================================================
    // PedidoView Tests
    // =========================================================================

    #[test]
    fn test_pedido_view_uses_restaurant_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let view = PedidoView::new(&pedido(PedidoStatus::Pendente, TipoEntrega::Delivery), offset);
        assert_eq!(view.codigo, "#0042");
        assert_eq!(view.criado_em, "12/10/2026 20:30");
        assert_eq!(view.endereco.as_deref(), Some("Rua A, 10 - Centro"));
        assert_eq!(view.taxa_entrega.as_deref(), Some("R$ 5,00"));
        assert!(!view.encerrado);
    }

    #[test]
    fn test_pedido_view_hides_address_for_pickup() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let view = PedidoView::new(&pedido(PedidoStatus::Cancelado, TipoEntrega::Retirada), offset);
        assert!(view.endereco.is_none());
        assert!(view.cancelado && view.encerrado);
    }

    #[test]
    fn test_status_panel_renders_courier_location() {
        let mut pedido = pedido(PedidoStatus::SaiuParaEntrega, TipoEntrega::Delivery);
        pedido.localizacao_entregador = Some(CourierLocation {
            lat: -23.55,
            lng: -46.63,
        });
        let html = PedidoStatusTemplate {
            pedido: PedidoView::new(&pedido, FixedOffset::east_opt(0).unwrap()),
        }
        .render()
        .unwrap();

        assert!(html.contains("Saiu para entrega"));
        assert!(html.contains("data-lat=\"-23.55\""));
        assert!(html.contains("data-lng=\"-46.63\""));
    }
}
