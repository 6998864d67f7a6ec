//! Checkout route handlers.
//!
//! The checkout page collects customer data for the cart's delivery type.
//! Submitting re-checks the ordering rules, resolves the delivery fee from
//! the restaurant's delivery areas and creates the order on the backend.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_client::external::AddressSuggestion;
use cardapio_core::models::{Empresa, Endereco, buscar_bairro};
use cardapio_core::{Carrinho, ClienteInfo, FormaPagamento, OrderGate, Price, Slug, TipoEntrega};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::cart::CartView;
use super::menu::{EmpresaView, GateView};
use super::{TenantContext, load_tenant};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CspNonce, load_carrinho, push_flash, save_carrinho, take_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Address suggestions returned per query.
const SUGGESTION_LIMIT: u8 = 5;

/// Shorter queries are not sent to the geocoder.
const MIN_QUERY_LEN: usize = 4;

// =============================================================================
// Views
// =============================================================================

/// Delivery area option with its fee.
#[derive(Clone)]
pub struct BairroView {
    pub nome: String,
    pub taxa: String,
}

/// Payment method option.
#[derive(Clone)]
pub struct FormaView {
    pub value: &'static str,
    pub label: &'static str,
}

/// Address suggestion shown under the address field.
#[derive(Clone)]
pub struct SugestaoView {
    pub descricao: String,
    pub endereco: String,
    pub bairro: String,
}

impl From<AddressSuggestion> for SugestaoView {
    fn from(s: AddressSuggestion) -> Self {
        let endereco = match (&s.rua, &s.numero) {
            (Some(rua), Some(numero)) => format!("{rua}, {numero}"),
            (Some(rua), None) => rua.clone(),
            _ => s.descricao.clone(),
        };
        Self {
            endereco,
            bairro: s.bairro.unwrap_or_default(),
            descricao: s.descricao,
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Checkout form data. Also used to refill the form after an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub endereco: String,
    #[serde(default)]
    pub bairro: String,
    #[serde(default)]
    pub forma_pagamento: String,
    #[serde(default)]
    pub troco_para: String,
}

/// Address search query. The address input sends itself as `endereco`.
#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    #[serde(default, alias = "endereco")]
    pub q: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub nonce: String,
    pub flash: Option<Flash>,
    pub empresa: EmpresaView,
    pub gate: GateView,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub bairros: Vec<BairroView>,
    pub formas: Vec<FormaView>,
    pub is_delivery: bool,
    pub is_mesa: bool,
    pub mesa: String,
    pub taxa_padrao: String,
    pub erro: Option<String>,
}

impl CheckoutTemplate {
    /// Whether `value` is the payment method to preselect.
    #[must_use]
    pub fn forma_selecionada(&self, value: &str) -> bool {
        if self.form.forma_pagamento.is_empty() {
            value == FormaPagamento::default().as_str()
        } else {
            self.form.forma_pagamento == value
        }
    }
}

/// Address suggestions fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/address_suggestions.html")]
pub struct AddressSuggestionsTemplate {
    pub sugestoes: Vec<SugestaoView>,
}

// =============================================================================
// Checkout Rules
// =============================================================================

/// Fee for a delivery order to `bairro`.
///
/// With no delivery areas configured the company's default fee applies;
/// otherwise the neighbourhood must be one of the active areas.
fn resolve_taxa(empresa: &Empresa, areas: &[Endereco], bairro: &str) -> std::result::Result<Price, String> {
    if bairro.trim().is_empty() {
        // Reported as a missing field by the cart.
        return Ok(Price::ZERO);
    }
    if !areas.iter().any(|a| a.ativo) {
        return Ok(empresa.taxa_entrega_padrao);
    }
    buscar_bairro(areas, bairro)
        .map(|area| area.taxa_entrega)
        .ok_or_else(|| format!("Não entregamos no bairro {}", bairro.trim()))
}

/// Validate the form against the cart and build the customer data.
fn build_cliente(
    empresa: &Empresa,
    gate: &OrderGate,
    carrinho: &Carrinho,
    areas: &[Endereco],
    form: &CheckoutForm,
) -> std::result::Result<ClienteInfo, String> {
    if !gate.pode_finalizar {
        return Err(gate.motivo.unwrap_or_default().to_string());
    }
    if let Some(tipo) = carrinho.entrega.tipo
        && !gate.permite(tipo)
    {
        return Err(format!("{} indisponível no momento", tipo.label()));
    }

    let forma_pagamento = if form.forma_pagamento.trim().is_empty() {
        FormaPagamento::default()
    } else {
        form.forma_pagamento
            .trim()
            .parse::<FormaPagamento>()
            .map_err(|_| "Forma de pagamento inválida".to_string())?
    };

    let taxa_entrega = match carrinho.entrega.tipo {
        Some(TipoEntrega::Delivery) => resolve_taxa(empresa, areas, &form.bairro)?,
        _ => Price::ZERO,
    };

    let troco_para = match forma_pagamento {
        FormaPagamento::Dinheiro if !form.troco_para.trim().is_empty() => {
            let troco = Price::parse_input(&form.troco_para)
                .map_err(|e| format!("Troco: {e}"))?;
            let total = carrinho.calcular_total() + taxa_entrega;
            if !troco.is_zero() && troco < total {
                return Err(format!("O troco deve ser para um valor de pelo menos {}", total.display()));
            }
            Some(troco)
        }
        _ => None,
    };

    Ok(ClienteInfo {
        nome: form.nome.clone(),
        telefone: form.telefone.clone(),
        endereco: form.endereco.clone(),
        bairro: form.bairro.clone(),
        forma_pagamento,
        troco_para,
        taxa_entrega,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Display checkout page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(slug): Path<String>,
) -> Result<Response> {
    let tenant = load_tenant(&state, &slug).await?;
    let carrinho = load_carrinho(&session, &tenant.slug).await;
    if carrinho.is_empty() {
        return Ok(Redirect::to(&format!("/{}/carrinho", tenant.slug)).into_response());
    }

    let areas = load_areas(&state, &tenant.slug).await;
    let flash = take_flash(&session).await;
    Ok(render(tenant, &carrinho, &areas, CheckoutForm::default(), None, nonce, flash).into_response())
}

/// Place the order.
///
/// Validation problems re-render the form with the message and status 422;
/// on success the cart is cleared and the customer lands on the tracker.
#[instrument(skip(state, session, nonce, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(slug): Path<String>,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let tenant = load_tenant(&state, &slug).await?;
    let mut carrinho = load_carrinho(&session, &tenant.slug).await;
    let areas = load_areas(&state, &tenant.slug).await;

    let novo_pedido = build_cliente(&tenant.empresa, &tenant.gate, &carrinho, &areas, &form)
        .and_then(|cliente| {
            carrinho
                .to_novo_pedido(tenant.empresa.id, &cliente)
                .map_err(|e| e.to_string())
        });
    let novo_pedido = match novo_pedido {
        Ok(pedido) => pedido,
        Err(erro) => return Ok(rejected(tenant, &carrinho, &areas, form, erro, nonce)),
    };

    let pedido = match state.api().criar_pedido(&novo_pedido).await {
        Ok(pedido) => pedido,
        Err(e) if matches!(e.status(), Some(400..=499)) => {
            tracing::warn!(slug = %tenant.slug, error = %e, "Backend rejected order");
            let erro = e.user_message();
            return Ok(rejected(tenant, &carrinho, &areas, form, erro, nonce));
        }
        Err(e) => return Err(AppError::Api(e)),
    };

    tracing::info!(
        slug = %tenant.slug,
        pedido_id = %pedido.id,
        total = %pedido.total,
        "Order placed"
    );
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("pedido_id", &pedido.id.to_string())]),
    );

    carrinho.limpar();
    save_carrinho(&session, &tenant.slug, &carrinho).await?;
    push_flash(
        &session,
        Flash::sucesso(format!("Pedido {} recebido!", pedido.codigo())),
    )
    .await?;

    Ok(Redirect::to(&format!("/{}/pedido/{}", tenant.slug, pedido.id)).into_response())
}

/// Address search suggestions (HTMX).
///
/// Geocoder failures degrade to an empty list.
#[instrument(skip(state))]
pub async fn addresses(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<AddressQuery>,
) -> Result<AddressSuggestionsTemplate> {
    super::parse_slug(&slug)?;
    let consulta = query.q.trim();
    if consulta.chars().count() < MIN_QUERY_LEN {
        return Ok(AddressSuggestionsTemplate { sugestoes: Vec::new() });
    }

    let sugestoes = match state.nominatim().buscar(consulta, SUGGESTION_LIMIT).await {
        Ok(found) => found.into_iter().map(SugestaoView::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Address search failed");
            Vec::new()
        }
    };
    Ok(AddressSuggestionsTemplate { sugestoes })
}

// =============================================================================
// Helpers
// =============================================================================

/// Delivery areas for the fee lookup. Failures leave the list empty, which
/// falls back to the default fee.
async fn load_areas(state: &AppState, slug: &Slug) -> Vec<Endereco> {
    state
        .api()
        .bairros_atendidos(slug.as_str())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(slug = %slug, error = %e, "Failed to load delivery areas");
            Vec::new()
        })
}

fn rejected(
    tenant: TenantContext,
    carrinho: &Carrinho,
    areas: &[Endereco],
    form: CheckoutForm,
    erro: String,
    nonce: String,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        render(tenant, carrinho, areas, form, Some(erro), nonce, None),
    )
        .into_response()
}

fn render(
    tenant: TenantContext,
    carrinho: &Carrinho,
    areas: &[Endereco],
    form: CheckoutForm,
    erro: Option<String>,
    nonce: String,
    flash: Option<Flash>,
) -> CheckoutTemplate {
    CheckoutTemplate {
        nonce,
        flash,
        gate: GateView::from(&tenant.gate),
        cart: CartView::from(carrinho),
        form,
        bairros: areas
            .iter()
            .filter(|a| a.ativo)
            .map(|a| BairroView {
                nome: a.bairro.clone(),
                taxa: a.taxa_entrega.display(),
            })
            .collect(),
        formas: FormaPagamento::ALL
            .into_iter()
            .map(|f| FormaView {
                value: f.as_str(),
                label: f.label(),
            })
            .collect(),
        is_delivery: carrinho.entrega.tipo == Some(TipoEntrega::Delivery),
        is_mesa: carrinho.entrega.tipo == Some(TipoEntrega::Mesa),
        mesa: carrinho.entrega.mesa.clone().unwrap_or_default(),
        taxa_padrao: tenant.empresa.taxa_entrega_padrao.display(),
        empresa: EmpresaView::from(&tenant.empresa),
        erro,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::models::Produto;
    use cardapio_core::{EmpresaId, EnderecoId, ProdutoId, Schedule};

    fn empresa() -> Empresa {
        Empresa {
            id: EmpresaId::new(1),
            slug: Slug::parse("pizzaria-do-ze").unwrap(),
            nome: "Pizzaria do Zé".to_string(),
            cnpj: None,
            telefone: None,
            endereco: None,
            logo_url: None,
            ativo: true,
            permitir_pedidos_online: true,
            desativar_entrega: false,
            desativar_retirada: false,
            taxa_entrega_padrao: Price::from_cents(700),
            horarios: Schedule::default(),
        }
    }

    fn area(bairro: &str, cents: i64, ativo: bool) -> Endereco {
        Endereco {
            id: EnderecoId::new(1),
            empresa_id: EmpresaId::new(1),
            bairro: bairro.to_string(),
            taxa_entrega: Price::from_cents(cents),
            ativo,
        }
    }

    fn carrinho(tipo: TipoEntrega) -> Carrinho {
        let produto = Produto {
            id: ProdutoId::new(1),
            empresa_id: EmpresaId::new(1),
            categoria: "Pizzas".to_string(),
            nome: "Calabresa".to_string(),
            descricao: None,
            preco: Price::from_cents(4000),
            em_promocao: false,
            preco_promocional: None,
            disponivel: true,
            imagem_url: None,
            adicionais: vec![],
        };
        let mut carrinho = Carrinho::new();
        carrinho.adicionar_item(&produto, 1, "", &[]);
        carrinho.definir_entrega(tipo, None, "");
        carrinho
    }

    fn open_gate(empresa: &Empresa) -> OrderGate {
        OrderGate::evaluate(empresa, true)
    }

    fn form(bairro: &str, forma: &str, troco: &str) -> CheckoutForm {
        CheckoutForm {
            nome: "Ana".to_string(),
            telefone: "11999990000".to_string(),
            endereco: "Rua A, 10".to_string(),
            bairro: bairro.to_string(),
            forma_pagamento: forma.to_string(),
            troco_para: troco.to_string(),
        }
    }

    // =========================================================================
    // Delivery Fee Tests
    // =========================================================================

    #[test]
    fn test_resolve_taxa_uses_default_without_areas() {
        let taxa = resolve_taxa(&empresa(), &[], "Centro").unwrap();
        assert_eq!(taxa, Price::from_cents(700));

        let inactive = [area("Centro", 300, false)];
        assert_eq!(resolve_taxa(&empresa(), &inactive, "Centro").unwrap(), Price::from_cents(700));
    }

    #[test]
    fn test_resolve_taxa_matches_area_ignoring_case() {
        let areas = [area("Centro", 300, true), area("Vila Nova", 900, true)];
        assert_eq!(
            resolve_taxa(&empresa(), &areas, " vila nova ").unwrap(),
            Price::from_cents(900)
        );
        assert!(resolve_taxa(&empresa(), &areas, "Jardins").is_err());
    }

    // =========================================================================
    // Customer Validation Tests
    // =========================================================================

    #[test]
    fn test_build_cliente_for_delivery() {
        let empresa = empresa();
        let areas = [area("Centro", 300, true)];
        let cliente = build_cliente(
            &empresa,
            &open_gate(&empresa),
            &carrinho(TipoEntrega::Delivery),
            &areas,
            &form("Centro", "dinheiro", "50,00"),
        )
        .unwrap();

        assert_eq!(cliente.taxa_entrega, Price::from_cents(300));
        assert_eq!(cliente.forma_pagamento, FormaPagamento::Dinheiro);
        assert_eq!(cliente.troco_para, Some(Price::from_cents(5000)));
    }

    #[test]
    fn test_build_cliente_rejects_change_below_total() {
        let empresa = empresa();
        let err = build_cliente(
            &empresa,
            &open_gate(&empresa),
            &carrinho(TipoEntrega::Delivery),
            &[],
            &form("Centro", "dinheiro", "20"),
        )
        .unwrap_err();
        assert!(err.contains("R$ 47,00"));
    }

    #[test]
    fn test_build_cliente_ignores_change_for_card() {
        let empresa = empresa();
        let cliente = build_cliente(
            &empresa,
            &open_gate(&empresa),
            &carrinho(TipoEntrega::Retirada),
            &[],
            &form("", "cartao", "abc"),
        )
        .unwrap();
        assert_eq!(cliente.troco_para, None);
        assert_eq!(cliente.taxa_entrega, Price::ZERO);
    }

    #[test]
    fn test_build_cliente_rechecks_gate() {
        let mut empresa = empresa();
        let closed = OrderGate::evaluate(&empresa, false);
        assert!(
            build_cliente(&empresa, &closed, &carrinho(TipoEntrega::Retirada), &[], &form("", "pix", ""))
                .is_err()
        );

        empresa.desativar_entrega = true;
        let err = build_cliente(
            &empresa,
            &open_gate(&empresa),
            &carrinho(TipoEntrega::Delivery),
            &[],
            &form("Centro", "pix", ""),
        )
        .unwrap_err();
        assert_eq!(err, "Delivery indisponível no momento");
    }

    #[test]
    fn test_build_cliente_rejects_unknown_payment() {
        let empresa = empresa();
        assert!(
            build_cliente(
                &empresa,
                &open_gate(&empresa),
                &carrinho(TipoEntrega::Retirada),
                &[],
                &form("", "cheque", ""),
            )
            .is_err()
        );
    }

    #[test]
    fn test_suggestion_view_formats_street_and_number() {
        let view = SugestaoView::from(AddressSuggestion {
            descricao: "Rua A, 10, Centro, São Paulo".to_string(),
            rua: Some("Rua A".to_string()),
            numero: Some("10".to_string()),
            bairro: Some("Centro".to_string()),
            cidade: Some("São Paulo".to_string()),
            lat: -23.5,
            lng: -46.6,
        });
        assert_eq!(view.endereco, "Rua A, 10");
        assert_eq!(view.bairro, "Centro");
    }
}
