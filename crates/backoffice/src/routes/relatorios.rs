//! Sales report route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cardapio_core::models::{RelatorioFiltro, RelatorioVendas};
use cardapio_core::{Price, TipoEntrega};
use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::error::Result;
use crate::middleware::{CspNonce, RequireManager};
use crate::state::AppState;

/// Date format of `<input type="date">`.
const DATA_INPUT: &str = "%Y-%m-%d";

/// Report filters as typed in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelatorioQuery {
    #[serde(default)]
    pub inicio: String,
    #[serde(default)]
    pub fim: String,
    #[serde(default)]
    pub tipo_entrega: String,
}

impl RelatorioQuery {
    /// Parse the filters. Missing dates default to the current month so far.
    ///
    /// # Errors
    ///
    /// Returns the message to show when a date or the delivery type is invalid.
    pub fn parse(&self, hoje: NaiveDate) -> std::result::Result<RelatorioFiltro, String> {
        let inicio = parse_data(&self.inicio, "inicial")?.or_else(|| hoje.with_day(1));
        let fim = parse_data(&self.fim, "final")?.or(Some(hoje));
        let tipo_entrega = match self.tipo_entrega.trim() {
            "" => None,
            tipo => Some(
                tipo.parse::<TipoEntrega>()
                    .map_err(|_| "Tipo de entrega inválido.".to_string())?,
            ),
        };

        Ok(RelatorioFiltro {
            inicio,
            fim,
            tipo_entrega,
        }
        .normalizado())
    }
}

fn parse_data(raw: &str, qual: &str) -> std::result::Result<Option<NaiveDate>, String> {
    match raw.trim() {
        "" => Ok(None),
        raw => NaiveDate::parse_from_str(raw, DATA_INPUT)
            .map(Some)
            .map_err(|_| format!("Data {qual} inválida.")),
    }
}

// =============================================================================
// Views
// =============================================================================

#[derive(Clone, Debug)]
pub struct TipoOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct DiaView {
    pub data: String,
    pub pedidos: u64,
    pub faturamento: String,
    /// Revenue in cents, for the bar.
    pub valor: i64,
}

#[derive(Clone, Debug)]
pub struct ProdutoVendidoView {
    pub nome: String,
    pub quantidade: u64,
    pub faturamento: String,
}

#[derive(Clone, Debug)]
pub struct RelatorioView {
    pub total_pedidos: u64,
    pub faturamento: String,
    pub ticket_medio: String,
    pub dias: Vec<DiaView>,
    /// Largest daily revenue in cents, the bars' scale.
    pub maior_dia: i64,
    pub produtos: Vec<ProdutoVendidoView>,
}

impl From<&RelatorioVendas> for RelatorioView {
    fn from(relatorio: &RelatorioVendas) -> Self {
        let dias: Vec<DiaView> = relatorio
            .por_dia
            .iter()
            .map(|dia| DiaView {
                data: dia.data.format("%d/%m").to_string(),
                pedidos: dia.pedidos,
                faturamento: dia.faturamento.display(),
                valor: dia.faturamento.to_cents(),
            })
            .collect();

        // The backend may omit the average; it is total over orders.
        let ticket_medio = if relatorio.ticket_medio.is_zero() {
            relatorio
                .faturamento
                .dividido_por(relatorio.total_pedidos)
                .unwrap_or(Price::ZERO)
        } else {
            relatorio.ticket_medio
        };

        Self {
            total_pedidos: relatorio.total_pedidos,
            faturamento: relatorio.faturamento.display(),
            ticket_medio: ticket_medio.display(),
            maior_dia: dias.iter().map(|d| d.valor).max().unwrap_or(0).max(1),
            dias,
            produtos: relatorio
                .produtos_mais_vendidos
                .iter()
                .map(|p| ProdutoVendidoView {
                    nome: p.nome.clone(),
                    quantidade: p.quantidade,
                    faturamento: p.faturamento.display(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "relatorios/show.html")]
pub struct RelatorioTemplate {
    pub page: PageContext,
    pub slug: String,
    pub inicio: String,
    pub fim: String,
    pub tipos: Vec<TipoOption>,
    pub relatorio: Option<RelatorioView>,
    pub erro: Option<String>,
}

/// Sales report.
///
/// GET /{slug}/relatorios
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn show(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<RelatorioQuery>,
) -> Result<Response> {
    let hoje = hoje(state.config().utc_offset);
    let page = PageContext::new(nonce, &session, &staff.user, "relatorios").await;

    let filtro = match query.parse(hoje) {
        Ok(filtro) => filtro,
        Err(erro) => {
            let template = RelatorioTemplate {
                page,
                slug: staff.slug.to_string(),
                inicio: query.inicio.trim().to_string(),
                fim: query.fim.trim().to_string(),
                tipos: tipos(None),
                relatorio: None,
                erro: Some(erro),
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
    };

    let relatorio = state
        .api()
        .relatorio_vendas(staff.empresa_id, &filtro, &staff.user.bearer())
        .await?;

    Ok(RelatorioTemplate {
        page,
        slug: staff.slug.to_string(),
        inicio: filtro.inicio.map(|d| d.format(DATA_INPUT).to_string()).unwrap_or_default(),
        fim: filtro.fim.map(|d| d.format(DATA_INPUT).to_string()).unwrap_or_default(),
        tipos: tipos(filtro.tipo_entrega),
        relatorio: Some(RelatorioView::from(&relatorio)),
        erro: None,
    }
    .into_response())
}

fn hoje(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

fn tipos(selecionado: Option<TipoEntrega>) -> Vec<TipoOption> {
    TipoEntrega::ALL
        .into_iter()
        .map(|tipo| TipoOption {
            value: tipo.as_str(),
            label: tipo.label(),
            selected: selecionado == Some(tipo),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::models::{ProdutoVendido, VendasDia};

    fn data(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_empty_query_defaults_to_month_so_far() {
        let filtro = RelatorioQuery::default().parse(data(14)).unwrap();
        assert_eq!(filtro.inicio, Some(data(1)));
        assert_eq!(filtro.fim, Some(data(14)));
        assert_eq!(filtro.tipo_entrega, None);
    }

    #[test]
    fn test_query_parses_and_swaps_range() {
        let query = RelatorioQuery {
            inicio: "2026-10-20".to_string(),
            fim: "2026-10-05".to_string(),
            tipo_entrega: "delivery".to_string(),
        };
        let filtro = query.parse(data(14)).unwrap();
        assert_eq!(filtro.inicio, Some(data(5)));
        assert_eq!(filtro.fim, Some(data(20)));
        assert_eq!(filtro.tipo_entrega, Some(TipoEntrega::Delivery));
    }

    #[test]
    fn test_invalid_date_is_reported() {
        let query = RelatorioQuery {
            inicio: "14/10/2026".to_string(),
            ..RelatorioQuery::default()
        };
        assert_eq!(query.parse(data(14)).unwrap_err(), "Data inicial inválida.");
    }

    #[test]
    fn test_report_view_scales_bars_and_fills_average() {
        let relatorio = RelatorioVendas {
            total_pedidos: 4,
            faturamento: Price::from_cents(20_000),
            ticket_medio: Price::ZERO,
            por_dia: vec![
                VendasDia {
                    data: data(1),
                    pedidos: 1,
                    faturamento: Price::from_cents(5_000),
                },
                VendasDia {
                    data: data(2),
                    pedidos: 3,
                    faturamento: Price::from_cents(15_000),
                },
            ],
            produtos_mais_vendidos: vec![ProdutoVendido {
                nome: "X-Burger".to_string(),
                quantidade: 6,
                faturamento: Price::from_cents(12_000),
            }],
        };
        let view = RelatorioView::from(&relatorio);
        assert_eq!(view.ticket_medio, "R$ 50,00");
        assert_eq!(view.maior_dia, 15_000);
        assert_eq!(view.dias.first().unwrap().data, "01/10");
        assert_eq!(view.produtos.first().unwrap().quantidade, 6);
    }
}
