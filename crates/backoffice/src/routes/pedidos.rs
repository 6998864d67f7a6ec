//! Kitchen board route handlers.
//!
//! The board page renders the columns once and then follows the company
//! room over Server-Sent Events. Status changes are sent to the backend and
//! come back as realtime events; nothing is applied optimistically.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Response, Sse};
use cardapio_client::SubscriptionError;
use cardapio_core::board::Coluna;
use cardapio_core::models::{Pedido, PedidoItem};
use cardapio_core::{OrderBoard, PedidoId, PedidoStatus, Room, TipoEntrega};
use chrono::FixedOffset;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireStaff, TenantStaff};
use crate::state::AppState;

/// SSE event carrying the re-rendered columns.
pub const BOARD_EVENT: &str = "pedidos";

/// Client event that makes the board refetch its columns.
pub const REFRESH_TRIGGER: &str = "board-refresh";

// =============================================================================
// Views
// =============================================================================

/// Label of the button that moves an order forward.
#[must_use]
pub const fn acao_avancar(status: PedidoStatus, tipo: TipoEntrega) -> Option<&'static str> {
    match (status, tipo) {
        (PedidoStatus::Pendente, _) => Some("Aceitar"),
        (PedidoStatus::EmPreparo, _) => Some("Marcar pronto"),
        (PedidoStatus::Pronto, TipoEntrega::Delivery) => Some("Saiu para entrega"),
        (PedidoStatus::Pronto | PedidoStatus::SaiuParaEntrega, _) => Some("Entregue"),
        (PedidoStatus::Entregue | PedidoStatus::Cancelado, _) => None,
    }
}

/// Board column heading. Staff read "Novos" where customers read
/// "Aguardando confirmação".
const fn titulo_coluna(status: PedidoStatus) -> &'static str {
    match status {
        PedidoStatus::Pendente => "Novos",
        other => other.label(),
    }
}

/// Order line as printed on the card.
#[derive(Clone, Debug)]
pub struct ItemCardView {
    pub quantidade: u32,
    pub nome: String,
    pub adicionais: String,
    pub observacoes: Option<String>,
}

impl From<&PedidoItem> for ItemCardView {
    fn from(item: &PedidoItem) -> Self {
        Self {
            quantidade: item.quantidade,
            nome: item.nome.clone(),
            adicionais: item
                .adicionais
                .iter()
                .map(|a| a.nome.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            observacoes: Some(item.observacoes.clone()).filter(|o| !o.is_empty()),
        }
    }
}

/// Order card display data.
#[derive(Clone, Debug)]
pub struct PedidoCardView {
    pub id: i32,
    pub codigo: String,
    pub cliente_nome: String,
    pub cliente_telefone: String,
    pub tipo_label: &'static str,
    pub destino: Option<String>,
    pub itens: Vec<ItemCardView>,
    pub observacoes: Option<String>,
    pub total: String,
    pub pagamento: String,
    pub hora: String,
    pub acao: Option<&'static str>,
}

impl PedidoCardView {
    #[must_use]
    pub fn new(pedido: &Pedido, offset: FixedOffset) -> Self {
        let destino = match pedido.tipo_entrega {
            TipoEntrega::Mesa => pedido.mesa.as_ref().map(|m| format!("Mesa {m}")),
            TipoEntrega::Delivery => Some(match pedido.bairro.as_str() {
                "" => pedido.endereco.clone(),
                bairro => format!("{} - {bairro}", pedido.endereco),
            }),
            TipoEntrega::Retirada => None,
        };
        let pagamento = match pedido.troco_para {
            Some(troco) => format!(
                "{} (troco para {})",
                pedido.forma_pagamento.label(),
                troco.display()
            ),
            None => pedido.forma_pagamento.label().to_string(),
        };

        Self {
            id: pedido.id.as_i32(),
            codigo: pedido.codigo(),
            cliente_nome: pedido.cliente_nome.clone(),
            cliente_telefone: pedido.cliente_telefone.clone(),
            tipo_label: pedido.tipo_entrega.label(),
            destino,
            itens: pedido.itens.iter().map(ItemCardView::from).collect(),
            observacoes: Some(pedido.observacoes.clone()).filter(|o| !o.is_empty()),
            total: pedido.total.display(),
            pagamento,
            hora: pedido.criado_em.with_timezone(&offset).format("%H:%M").to_string(),
            acao: acao_avancar(pedido.status, pedido.tipo_entrega),
        }
    }
}

/// One board column.
#[derive(Clone, Debug)]
pub struct ColunaView {
    pub status: &'static str,
    pub titulo: &'static str,
    pub pedidos: Vec<PedidoCardView>,
}

impl ColunaView {
    fn new(coluna: &Coluna<'_>, offset: FixedOffset) -> Self {
        Self {
            status: coluna.status.as_str(),
            titulo: titulo_coluna(coluna.status),
            pedidos: coluna
                .pedidos
                .iter()
                .map(|p| PedidoCardView::new(p, offset))
                .collect(),
        }
    }
}

fn colunas(board: &OrderBoard, offset: FixedOffset) -> Vec<ColunaView> {
    board
        .columns()
        .iter()
        .map(|c| ColunaView::new(c, offset))
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Kitchen board page template.
#[derive(Template, WebTemplate)]
#[template(path = "pedidos/board.html")]
pub struct BoardTemplate {
    pub page: PageContext,
    pub slug: String,
    pub colunas: Vec<ColunaView>,
}

/// Board columns fragment, pushed over SSE and served to HTMX refreshes.
#[derive(Template, WebTemplate)]
#[template(path = "partials/board.html")]
pub struct BoardColumnsTemplate {
    pub slug: String,
    pub colunas: Vec<ColunaView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the kitchen board.
///
/// GET /{slug}/pedidos
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn board(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<BoardTemplate> {
    let board = fetch_board(&state, &staff).await?;

    Ok(BoardTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "pedidos").await,
        slug: staff.slug.to_string(),
        colunas: colunas(&board, state.config().utc_offset),
    })
}

/// Board columns fragment.
///
/// GET /{slug}/pedidos/colunas
#[instrument(skip(state, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn columns(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<BoardColumnsTemplate> {
    let board = fetch_board(&state, &staff).await?;

    Ok(BoardColumnsTemplate {
        slug: staff.slug.to_string(),
        colunas: colunas(&board, state.config().utc_offset),
    })
}

/// Stream board updates (SSE).
///
/// The stream owns the company room subscription, so the room is left as
/// soon as the last open board disconnects.
///
/// GET /{slug}/pedidos/stream
#[instrument(skip(state, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn stream(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>>> {
    let empresa_id = staff.empresa_id;

    // Subscribe before the snapshot so no update falls in between.
    let mut subscription = state
        .realtime()
        .subscribe(Room::Company(empresa_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let mut board = fetch_board(&state, &staff).await?;

    let api = state.api().clone();
    let bearer = staff.user.bearer();
    let slug = staff.slug.to_string();
    let offset = state.config().utc_offset;

    let stream = async_stream::stream! {
        yield Ok::<Event, Infallible>(board_event(&board, &slug, offset));

        loop {
            match subscription.recv().await {
                Ok(event) => {
                    if board.apply(&event) {
                        yield Ok(board_event(&board, &slug, offset));
                    }
                }
                Err(reason @ (SubscriptionError::Lagged(_) | SubscriptionError::Resynced)) => {
                    tracing::warn!(%empresa_id, %reason, "Board out of sync, refetching orders");
                    match api.listar_pedidos(empresa_id, None, &bearer).await {
                        Ok(pedidos) => {
                            board = OrderBoard::from_snapshot(empresa_id, pedidos);
                            yield Ok(board_event(&board, &slug, offset));
                        }
                        Err(e) => tracing::warn!(%empresa_id, error = %e, "Refetch failed"),
                    }
                }
                Err(SubscriptionError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Move an order to the next status of its flow.
///
/// POST /{slug}/pedidos/{id}/avancar
#[instrument(skip(state, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn avancar(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Response> {
    let pedido = fetch_pedido(&state, &staff, PedidoId::new(id)).await?;
    let next = pedido
        .proximo_status()
        .map_err(|e| AppError::BadRequest(format!("Pedido {}: {e}", pedido.codigo())))?;

    state
        .api()
        .atualizar_status(pedido.id, next, &staff.user.bearer())
        .await?;
    tracing::info!(pedido_id = %pedido.id, status = %next, "Order advanced");

    Ok(status_changed(&state))
}

/// Cancel an order that is still in progress.
///
/// POST /{slug}/pedidos/{id}/cancelar
#[instrument(skip(state, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn cancelar(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Response> {
    let pedido = fetch_pedido(&state, &staff, PedidoId::new(id)).await?;
    if pedido.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Pedido {} já está {}.",
            pedido.codigo(),
            pedido.status.label().to_lowercase()
        )));
    }

    state
        .api()
        .atualizar_status(pedido.id, PedidoStatus::Cancelado, &staff.user.bearer())
        .await?;
    tracing::info!(pedido_id = %pedido.id, "Order cancelled");

    Ok(status_changed(&state))
}

async fn fetch_board(state: &AppState, staff: &TenantStaff) -> Result<OrderBoard> {
    let pedidos = state
        .api()
        .listar_pedidos(staff.empresa_id, None, &staff.user.bearer())
        .await?;
    Ok(OrderBoard::from_snapshot(staff.empresa_id, pedidos))
}

/// Find one order of the company. There is no single-order endpoint for
/// staff, so it comes from the company's list.
async fn fetch_pedido(state: &AppState, staff: &TenantStaff, id: PedidoId) -> Result<Pedido> {
    state
        .api()
        .listar_pedidos(staff.empresa_id, None, &staff.user.bearer())
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("pedido {id}")))
}

/// Response to a status change. The board picks the change up from the
/// realtime event; without a live connection it is told to refetch.
fn status_changed(state: &AppState) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    if !state.realtime().is_connected() {
        response
            .headers_mut()
            .insert("hx-trigger", HeaderValue::from_static(REFRESH_TRIGGER));
    }
    response
}

fn board_event(board: &OrderBoard, slug: &str, offset: FixedOffset) -> Event {
    let template = BoardColumnsTemplate {
        slug: slug.to_string(),
        colunas: colunas(board, offset),
    };
    match template.render() {
        Ok(html) => Event::default().event(BOARD_EVENT).data(html),
        Err(e) => {
            tracing::error!(empresa_id = %board.empresa_id(), error = %e, "Failed to render board");
            Event::default().comment("render failed")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::{EmpresaId, FormaPagamento, Price};

    fn pedido(id: i32, status: PedidoStatus, tipo: TipoEntrega) -> Pedido {
        Pedido {
            id: PedidoId::new(id),
            empresa_id: EmpresaId::new(1),
            cliente_nome: "Ana".to_string(),
            cliente_telefone: "11999990000".to_string(),
            tipo_entrega: tipo,
            mesa: (tipo == TipoEntrega::Mesa).then(|| "7".to_string()),
            endereco: "Rua A, 10".to_string(),
            bairro: "Centro".to_string(),
            observacoes: String::new(),
            forma_pagamento: FormaPagamento::Dinheiro,
            troco_para: Some(Price::from_cents(5000)),
            itens: vec![],
            subtotal: Price::from_cents(4000),
            taxa_entrega: Price::ZERO,
            total: Price::from_cents(4000),
            status,
            criado_em: "2026-10-12T23:30:00Z".parse().unwrap(),
            atualizado_em: None,
            localizacao_entregador: None,
        }
    }

    // =========================================================================
    // Action Label Tests
    // =========================================================================

    #[test]
    fn test_ready_delivery_goes_out_pickup_is_delivered() {
        assert_eq!(
            acao_avancar(PedidoStatus::Pronto, TipoEntrega::Delivery),
            Some("Saiu para entrega")
        );
        assert_eq!(acao_avancar(PedidoStatus::Pronto, TipoEntrega::Retirada), Some("Entregue"));
        assert_eq!(acao_avancar(PedidoStatus::Entregue, TipoEntrega::Mesa), None);
    }

    // =========================================================================
    // Card View Tests
    // =========================================================================

    #[test]
    fn test_card_shows_table_and_change() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let card = PedidoCardView::new(&pedido(3, PedidoStatus::Pendente, TipoEntrega::Mesa), offset);
        assert_eq!(card.codigo, "#0003");
        assert_eq!(card.destino.as_deref(), Some("Mesa 7"));
        assert_eq!(card.pagamento, "Dinheiro (troco para R$ 50,00)");
        assert_eq!(card.hora, "20:30");
        assert_eq!(card.acao, Some("Aceitar"));
    }

    #[test]
    fn test_columns_fragment_renders_cards_in_board_order() {
        let board = OrderBoard::from_snapshot(
            EmpresaId::new(1),
            vec![
                pedido(1, PedidoStatus::EmPreparo, TipoEntrega::Delivery),
                pedido(2, PedidoStatus::Pendente, TipoEntrega::Retirada),
                pedido(3, PedidoStatus::Cancelado, TipoEntrega::Retirada),
            ],
        );
        let html = BoardColumnsTemplate {
            slug: "bar-da-ana".to_string(),
            colunas: colunas(&board, FixedOffset::east_opt(0).unwrap()),
        }
        .render()
        .unwrap();

        let novos = html.find("Novos").unwrap();
        let preparo = html.find("Em preparo").unwrap();
        assert!(novos < preparo);
        assert!(html.contains("/bar-da-ana/pedidos/2/avancar"));
        assert!(html.contains("Rua A, 10 - Centro"));
        assert!(!html.contains("#0003"));
    }
}
